//! Semantic diagnostics: errors and warnings.

use crate::token::Span;
use thiserror::Error;

/// A semantic error. The analyzer fails fast: the first violation bubbles
/// to the driver.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("Duplicate class `{name}`")]
    DuplicateClass { name: String },

    #[error("Unknown base class `{base}` for class `{class}`")]
    UnknownBase { class: String, base: String },

    #[error("Base `{base}` of class `{class}` is not a class")]
    BaseNotClass { class: String, base: String },

    #[error("Cyclic inheritance involving class `{class}`")]
    CyclicInheritance { class: String },

    #[error("Duplicate field `{name}` in class `{class}`")]
    DuplicateField { class: String, name: String },

    #[error("Duplicate constructor with parameters ({params}) in class `{class}`")]
    DuplicateConstructor { class: String, params: String },

    #[error("Duplicate method `{name}` in class `{class}`")]
    DuplicateMethod { class: String, name: String },

    #[error("Duplicate member `{name}` in class `{class}`")]
    DuplicateMember { class: String, name: String },

    #[error("Duplicate definition of `{name}`")]
    Duplicate { name: String },

    #[error("Undeclared identifier `{name}`")]
    UndeclaredIdentifier { name: String },

    #[error("Unknown type `{name}`")]
    UnknownType { name: String },

    #[error("`this` used outside of a class body")]
    ThisOutsideClass,

    #[error("`return` used outside of a method or constructor")]
    ReturnOutsideMethod,

    #[error("Method `{method}` has a declared return type and must return a value")]
    MissingReturnValue { method: String },

    #[error("Cannot assign `{from}` to `{target}` of type `{to}`")]
    IncompatibleAssignment {
        target: String,
        from: String,
        to: String,
    },

    #[error("Condition must be `Boolean`, found `{found}`")]
    ConditionNotBoolean { found: String },

    #[error("Invalid assignment target `{name}`")]
    InvalidAssignTarget { name: String },

    #[error("Unknown method `{method}` on `{ty}`")]
    UnknownBuiltinMethod { ty: String, method: String },

    #[error("Method `{method}` on `{ty}` expects {expected} argument(s), found {found}")]
    BuiltinArity {
        ty: String,
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Index argument of `{method}` must be `Integer`")]
    IndexNotInteger { method: String },
}

/// A non-fatal diagnostic. Warnings never abort a compile.
#[derive(Debug, Clone)]
pub struct CheckWarning {
    pub message: String,
    pub span: Span,
}

impl CheckWarning {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for CheckWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.span.line > 0 {
            write!(f, "{} (line {})", self.message, self.span.line)
        } else {
            write!(f, "{}", self.message)
        }
    }
}
