use log::debug;
use thiserror::Error;

use crate::compile::ast::{Program, SourcePos, Type};

pub mod symbol_table;
pub mod typecheck;

use symbol_table::SymbolTable;
use typecheck::TypeChecker;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Integer literal `{literal}` out of bounds.")]
    IntLiteralOutOfBounds { literal: String, span: SourcePos },

    #[error("Float literal out of bounds.")]
    FloatLiteralOutOfBounds(SourcePos),

    #[error("Cannot find `{name}` in the current scope")]
    Undeclared { name: String, span: SourcePos },

    #[error("`{name}` is a function, not a variable")]
    NotAVariable { name: String, span: SourcePos },

    #[error("`{name}` is a variable, not a function")]
    NotAFunction { name: String, span: SourcePos },

    #[error("`{name}` is already declared")]
    Redeclared { name: String, span: SourcePos },

    #[error("Conflicting types for function `{name}`")]
    ConflictingDeclaration { name: String, span: SourcePos },

    #[error("Function `{name}` is already defined")]
    Redefined { name: String, span: SourcePos },

    #[error("Variable `{name}` declared void")]
    VoidVariable { name: String, span: SourcePos },

    #[error("Operator `{op}` cannot be applied to `{ty}`")]
    InvalidOperand {
        op: String,
        ty: Type,
        span: SourcePos,
    },

    #[error("Operator `{op}` cannot be applied to `{lhs}` and `{rhs}`")]
    InvalidOperands {
        op: String,
        lhs: Type,
        rhs: Type,
        span: SourcePos,
    },

    #[error("Expression has unexpected type. Expected was `{expected}`, but got `{got}`")]
    MismatchedTypes {
        expected: Type,
        got: Type,
        span: SourcePos,
    },

    #[error("Function `{name}` takes {expected} argument(s) but {got} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: SourcePos,
    },

    #[error("Condition has type `void`")]
    VoidCondition(SourcePos),

    #[error("Non-void function `{name}` must return a value")]
    MissingReturnValue { name: String, span: SourcePos },

    #[error("Void function `{name}` cannot return a value")]
    UnexpectedReturnValue { name: String, span: SourcePos },

    #[error("Function `{name}` does not return a value")]
    MissingReturn { name: String, span: SourcePos },

    #[error("Continue can only appear in loops")]
    InvalidContinue(SourcePos),

    #[error("Break can only appear in loops")]
    InvalidBreak(SourcePos),
}

impl SemanticError {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::IntLiteralOutOfBounds { span, .. }
            | Self::Undeclared { span, .. }
            | Self::NotAVariable { span, .. }
            | Self::NotAFunction { span, .. }
            | Self::Redeclared { span, .. }
            | Self::ConflictingDeclaration { span, .. }
            | Self::Redefined { span, .. }
            | Self::VoidVariable { span, .. }
            | Self::InvalidOperand { span, .. }
            | Self::InvalidOperands { span, .. }
            | Self::MismatchedTypes { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::MissingReturnValue { span, .. }
            | Self::UnexpectedReturnValue { span, .. }
            | Self::MissingReturn { span, .. }
            | Self::FloatLiteralOutOfBounds(span)
            | Self::VoidCondition(span)
            | Self::InvalidContinue(span)
            | Self::InvalidBreak(span) => span.clone(),
        }
    }
}

/// Checks and annotates the whole program. Stops at the first error.
///
/// `symbols` must be fresh (global frame only). On success the global frame
/// holds every global variable and function, ready for emission.
pub fn analyze(program: &mut Program, symbols: &mut SymbolTable) -> Result<(), SemanticError> {
    TypeChecker::new(symbols).check_program(program)?;
    debug!("semantic analysis passed ({} items)", program.items.len());

    Ok(())
}
