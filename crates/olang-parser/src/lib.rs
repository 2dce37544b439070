//! Front end of the O compiler: lexer, parser, and semantic analyzer.
//!
//! The pipeline is one-shot and sequential:
//!
//! ```text
//! source -> tokens -> AST -> validated AST (+ ProgramInfo) -> optimised AST
//! ```
//!
//! [`parse_source`] covers the first half; [`checker::analyze`] and
//! [`checker::optimize`] the second. The emitter (in `olang-compiler`)
//! consumes the optimised AST together with the analysis output.

pub mod ast;
pub mod checker;
pub mod lexer;
pub mod parser;
pub mod token;

pub use checker::{analyze, optimize, Analysis, CheckError, CheckWarning, ProgramInfo, Rewrite};
pub use parser::{ParseError, Parser};
pub use token::{Span, Token};

use ast::Program;

/// Tokenize and parse a source text into a [`Program`].
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    Parser::new(source).parse()
}
