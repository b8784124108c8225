//! Error types for the lexer and preprocessor.

use rucc_util::Symbol;
use thiserror::Error;

/// Error kinds surfaced by the macro store and preprocessor (§4.8).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("`{0}` is already defined")]
    AlreadyDefined(Symbol),

    #[error("malformed macro definition for `{0}`")]
    BadMacroDefinition(Symbol),

    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: Symbol,
        expected: usize,
        got: usize,
    },

    #[error("unterminated macro argument list for `{0}`")]
    UnterminatedMacroArgument(Symbol),
}

/// Error kinds surfaced by the lexer itself (§4.9).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated character literal")]
    UnterminatedChar,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("invalid number literal: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    Macro(#[from] MacroError),
}

pub type LexResult<T> = Result<T, LexError>;
