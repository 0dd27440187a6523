use chumsky::{Parser, input::Input};
use log::debug;

use crate::{
    compile::ast::{Program, SourcePos},
    infra::{CflatError, Diagnostic},
};

pub mod lex;
pub mod nesting;
pub mod parse;

use lex::lexer;
use parse::program_parser;

pub type Spanned<T> = (T, SourcePos);

/// Lexes and parses a whole translation unit.
pub fn parse_program(src: &str) -> Result<Program, CflatError> {
    let tokens = lexer().parse(src).into_result().map_err(|errs| {
        CflatError::LexerError(
            errs.into_iter()
                .map(|err| Diagnostic::new(err.to_string(), (*err.span()).into()))
                .collect(),
        )
    })?;
    debug!("lexed {} tokens", tokens.len());

    nesting::check_tokens(&tokens).map_err(|diagnostic| CflatError::ParsingError(vec![diagnostic]))?;

    let token_stream = tokens.as_slice().map(src.len()..src.len(), |(t, s)| (t, s));

    let program = program_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            CflatError::ParsingError(
                errs.into_iter()
                    .map(|err| Diagnostic::new(err.reason().to_string(), err.span().clone()))
                    .collect(),
            )
        })?;
    nesting::check_program(&program).map_err(|diagnostic| CflatError::ParsingError(vec![diagnostic]))?;
    debug!("parsed {} items", program.items.len());

    Ok(program)
}
