use std::num::IntErrorKind;

use crate::compile::{ast::SourcePos, semantic::SemanticError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral {
    value: String,
    base: u32,
}

impl IntLiteral {
    pub fn new(value: String, base: u32) -> IntLiteral {
        IntLiteral { value, base }
    }

    pub fn parse(&self, span: &SourcePos) -> Result<i32, SemanticError> {
        i32::from_str_radix(&self.value, self.base).map_err(|err| match err.kind() {
            IntErrorKind::PosOverflow => SemanticError::IntLiteralOutOfBounds {
                literal: self.to_string(),
                span: span.clone(),
            },
            _ => unreachable!("Parser returned invalid number: {}", self.value),
        })
    }
}

impl std::fmt::Display for IntLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.base {
            16 => write!(f, "0x{}", self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}
