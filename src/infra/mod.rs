use std::process::Termination;

use thiserror::Error;

use crate::compile::{ast::SourcePos, ir::IrError, semantic::SemanticError};

pub mod report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(u8);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAIL_PARSING: ExitCode = ExitCode(42);
    pub const FAIL_SEMANTIC: ExitCode = ExitCode(7);
    pub const FAIL_INTERNAL: ExitCode = ExitCode(255);
}

impl Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.0)
    }
}

impl From<CflatError> for ExitCode {
    fn from(value: CflatError) -> Self {
        ExitCode::from(&value)
    }
}

impl From<&CflatError> for ExitCode {
    fn from(value: &CflatError) -> Self {
        match value {
            CflatError::LexerError(_) => ExitCode::FAIL_PARSING,
            CflatError::ParsingError(_) => ExitCode::FAIL_PARSING,
            CflatError::SemanticError(_) => ExitCode::FAIL_SEMANTIC,
            _ => ExitCode::FAIL_INTERNAL,
        }
    }
}

/// A message anchored in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: SourcePos,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: SourcePos) -> Self {
        Diagnostic {
            message: message.into(),
            span,
        }
    }
}

#[derive(Error, Debug)]
pub enum CflatError {
    #[error("Lexical Analysis failed.")]
    LexerError(Vec<Diagnostic>),

    #[error("Syntactic Analysis failed.")]
    ParsingError(Vec<Diagnostic>),

    #[error("Semantical Analysis failed: {0}")]
    SemanticError(#[from] SemanticError),

    #[error("IR emission failed: {0}")]
    IrError(#[from] IrError),

    #[error("There was an I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("There was an Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

impl CflatError {
    /// Source-anchored messages, empty for errors that have no location.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::LexerError(diagnostics) | Self::ParsingError(diagnostics) => diagnostics.clone(),
            Self::SemanticError(err) => vec![Diagnostic::new(err.to_string(), err.span())],
            _ => Vec::new(),
        }
    }
}
