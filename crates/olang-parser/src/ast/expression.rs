//! Expression AST nodes.
//!
//! The O expression grammar has no infix operators; arithmetic, comparison,
//! and logic are all method calls, so the shape reduces to atoms, member
//! accesses, calls, and constructor invocations.

use super::*;
use crate::token::Span;

/// Expression (produces a value).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: 42
    IntLiteral(IntLiteral),

    /// Real literal: 3.14
    RealLiteral(RealLiteral),

    /// Boolean literal: true, false
    BoolLiteral(BoolLiteral),

    /// String literal: "hello"
    StringLiteral(StringLiteral),

    /// The receiver of the enclosing method
    This(Span),

    /// Identifier; generic suffixes are kept canonical in the name,
    /// e.g. `Array[Integer]`
    Identifier(Identifier),

    /// Member access without a call: `target.name`
    Member(MemberExpr),

    /// Call: `callee(args)`
    Call(CallExpr),

    /// Constructor invocation of a built-in type: `Integer(2)`,
    /// `Array[Integer](3)`. User-class instantiation stays a [`Call`] until
    /// emission resolves the callee.
    New(NewExpr),
}

impl Expression {
    pub fn span(&self) -> &Span {
        match self {
            Expression::IntLiteral(e) => &e.span,
            Expression::RealLiteral(e) => &e.span,
            Expression::BoolLiteral(e) => &e.span,
            Expression::StringLiteral(e) => &e.span,
            Expression::This(span) => span,
            Expression::Identifier(e) => &e.span,
            Expression::Member(e) => &e.span,
            Expression::Call(e) => &e.span,
            Expression::New(e) => &e.span,
        }
    }

    /// Check if this expression is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::IntLiteral(_)
                | Expression::RealLiteral(_)
                | Expression::BoolLiteral(_)
                | Expression::StringLiteral(_)
        )
    }
}

/// Integer literal: 42
#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub value: i64,
    pub span: Span,
}

/// Real literal: 3.14
#[derive(Debug, Clone, PartialEq)]
pub struct RealLiteral {
    pub value: f64,
    pub span: Span,
}

/// Boolean literal: true, false
#[derive(Debug, Clone, PartialEq)]
pub struct BoolLiteral {
    pub value: bool,
    pub span: Span,
}

/// String literal: "hello"
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub value: String,
    pub span: Span,
}

/// Member access: `target.member`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub target: Box<Expression>,
    pub member: Identifier,
    pub span: Span,
}

/// Call: `callee(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub span: Span,
}

/// Built-in constructor invocation: `Integer(2)`, `List[Integer]()`
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    pub class_name: TypeName,
    pub args: Vec<Expression>,
    pub span: Span,
}
