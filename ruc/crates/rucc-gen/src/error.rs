//! Error type for the bytecode emitter.
//!
//! Follows the `thiserror`-enum-per-boundary pattern used throughout this
//! workspace (`rucc-sem::SemError`, `rucc-par::ParseError`). `PoolExhausted`
//! is the emitter's half of §7's `pool-exhausted` tag — fatal to the
//! current compilation unit, never to the process.

use rucc_util::Symbol;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("bytecode pool exhausted")]
    PoolExhausted,

    #[error("patch offset {offset} is not strictly below the current cursor ({size})")]
    PatchOutOfRange { offset: usize, size: usize },

    #[error("no entry point: `main` was never defined")]
    NoMain,

    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,

    #[error("`break` outside of a loop or switch")]
    BreakOutsideLoop,

    #[error("goto target `{0}` is never labeled in this function")]
    UndefinedLabel(Symbol),

    #[error("case label is not a compile-time constant")]
    NonConstantCaseLabel,

    #[error("assignment target is not an lvalue")]
    InvalidAssignmentTarget,

    #[error("indexing target must be a named array or pointer variable")]
    UnsupportedIndexTarget,

    #[error("member access target must be a named struct variable")]
    UnsupportedMemberTarget,

    #[error("call target must be a named function")]
    UnsupportedCallTarget,

    #[error("indexed value is neither an array nor a pointer")]
    NotIndexable,

    #[error("`.` applied to a non-struct value")]
    NotAStruct,

    #[error("struct has no field named `{0}`")]
    UnknownField(Symbol),

    #[error("reference to unbound identifier `{0}`")]
    UnresolvedIdentifier(Symbol),

    #[error("comma-expression lists are not a supported expression form")]
    UnsupportedExpressionList,
}

pub type GenResult<T> = Result<T, GenError>;
