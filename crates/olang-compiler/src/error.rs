//! Emission errors.

use thiserror::Error;

pub type EmitResult<T> = Result<T, EmitError>;

/// An error raised during code generation: a failed overload, constructor,
/// or field resolution, or a shape the front end should have rejected.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    #[error("Cannot resolve method `{name}` on `{class}`")]
    UnresolvedMethod { class: String, name: String },

    #[error("Cannot resolve a matching constructor for `{class}`")]
    UnresolvedConstructor { class: String },

    #[error("Cannot resolve field `{name}` on `{class}`")]
    UnresolvedField { class: String, name: String },

    #[error("Cannot resolve name `{name}`")]
    UnresolvedName { name: String },

    #[error("Unknown class `{name}`")]
    UnknownClass { name: String },

    #[error("Start class `{name}` is not declared in this program")]
    UnknownStartClass { name: String },

    #[error("Unsupported expression shape: {detail}")]
    UnsupportedShape { detail: String },

    #[error("Method `{name}` was declared forward but never defined")]
    MissingBody { name: String },

    #[error("Too many local variables in one method (max 65535)")]
    TooManyLocals,
}
