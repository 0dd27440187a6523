use thiserror::Error;

use crate::compile::{
    ast::{Program, SourcePos},
    semantic::symbol_table::SymbolTable,
};

pub mod builder;
pub mod emitter;
pub mod expr;
pub mod inst;

use emitter::IrEmitter;

/// Failures here mean the annotated tree and the symbol table disagree.
/// Checked programs never produce them.
#[derive(Error, Debug)]
pub enum IrError {
    #[error("No storage bound for variable `{0}`")]
    UnresolvedVariable(String),

    #[error("No function named `{0}`")]
    UnresolvedFunction(String),

    #[error("Storage for `{0}` was already bound")]
    StorageRebound(String),

    #[error("Node at {0:?} carries no resolved type")]
    Unannotated(SourcePos),

    #[error("Expression at {0:?} produces no value")]
    VoidValue(SourcePos),

    #[error("Integer literal `{0}` does not fit")]
    InvalidLiteral(String),

    #[error("`{0}` outside of a loop")]
    NoLoopTarget(&'static str),

    #[error("There was an Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

/// Lowers a checked program. `symbols` is the table the checker filled.
pub fn emit(program: &Program, symbols: &mut SymbolTable) -> Result<String, IrError> {
    let mut emitter = IrEmitter::new(symbols);
    emitter.emit_program(program)?;
    emitter.finish()
}
