//! Type-name parsing.
//!
//! `TypeName := Identifier ('[' TypeName (',' TypeName)* ']')*`, kept in
//! canonical textual form: `Name[arg1,arg2]` with commas and no spaces.

use super::Parser;
use crate::ast::{Expression, TypeName};
use crate::parser::error::ParseError;
use crate::token::Token;

/// Parse a type name.
pub fn parse_type_name(p: &mut Parser) -> Result<TypeName, ParseError> {
    let start = p.current_span();
    let head = p.expect_identifier()?;
    let canonical = parse_generic_suffix(p, head.name)?;
    Ok(TypeName::new(canonical, p.span_from(start)))
}

/// Parse zero or more `[...]` type-argument suffixes onto `name`.
pub fn parse_generic_suffix(p: &mut Parser, mut name: String) -> Result<String, ParseError> {
    while p.check(&Token::LeftBracket) {
        p.advance();
        let mut args = vec![parse_type_name(p)?.name];
        while p.check(&Token::Comma) {
            p.advance();
            args.push(parse_type_name(p)?.name);
        }
        p.expect(Token::RightBracket)?;
        name = format!("{}[{}]", name, args.join(","));
    }
    Ok(name)
}

/// Reinterpret an already-parsed expression as a type name, when possible.
///
/// Used by variable declarations: in `var x : A := e` the expression parsed
/// after the colon is the declared type. Only identifier-shaped expressions
/// (including canonical generic suffixes) qualify.
pub fn type_name_of_expr(expr: &Expression) -> Option<TypeName> {
    match expr {
        Expression::Identifier(id) => Some(TypeName::new(id.name.clone(), id.span)),
        _ => None,
    }
}
