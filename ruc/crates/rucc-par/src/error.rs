//! Parser error type.
//!
//! The parser does not attempt error recovery beyond point-of-first-error
//! (an explicit Non-goal outside basic lexical resynchronization): every
//! production returns `Result` and the first failure aborts the parse.

use rucc_util::{Span, Symbol};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected {expected}, found {found:?} at {span:?}")]
    Expected {
        expected: &'static str,
        found: String,
        span: Span,
    },

    #[error("undefined identifier `{0}`")]
    UndefinedIdentifier(Symbol),

    #[error(transparent)]
    Sem(#[from] rucc_sem::SemError),

    #[error(transparent)]
    Lex(#[from] rucc_lex::LexError),
}

pub type ParseResult<T> = Result<T, ParseError>;
