//! Error types for the interning / scope / type layer.

use rucc_util::Symbol;
use thiserror::Error;

/// Error kinds surfaced by the name table, type engine, and symbol table.
///
/// These mirror the error tags of the design (`no-main`,
/// `predeclared-but-undefined`, `duplicate-definition`, `bad-scope-exit`,
/// `pool-exhausted`, `ill-formed-type`, `undefined-identifier`), exposed as
/// a typed `Result` at the crate boundary rather than the internal sentinel
/// values the individual pool operations still return.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemError {
    #[error("no entry point: `main` was never defined")]
    NoMain,

    #[error("`{0}` was predeclared but never defined")]
    PredeclaredButUndefined(Symbol),

    #[error("`{0}` is already defined in this scope")]
    DuplicateDefinition(Symbol),

    #[error("scope exit without matching entry")]
    BadScopeExit,

    #[error("interning pool exhausted")]
    PoolExhausted,

    #[error("ill-formed type descriptor")]
    IllFormedType,

    #[error("`{0}` is not defined")]
    UndefinedIdentifier(Symbol),

    #[error("goto target `{0}` is never labeled in this function")]
    UndefinedLabel(Symbol),
}

pub type SemResult<T> = Result<T, SemError>;
