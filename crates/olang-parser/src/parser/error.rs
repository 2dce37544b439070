//! Parse error type.

use crate::token::Span;
use thiserror::Error;

/// A syntax error: the position (token index) plus an expectation message.
///
/// The parser fails fast, so one compile produces at most one of these.
#[derive(Debug, Clone, Error)]
#[error("Syntax error at token {token_index}: {message}")]
pub struct ParseError {
    /// Expectation message, e.g. "expected `is`, found `end`"
    pub message: String,
    /// Index of the offending token in the stream
    pub token_index: usize,
    /// Source span of the offending token
    pub span: Span,
}
