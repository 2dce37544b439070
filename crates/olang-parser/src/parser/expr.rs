//! Expression parsing.
//!
//! There are no infix operators; every operator is a method call, so the
//! grammar is `expr := atom ( '(' args ')' | '.' name ( '(' args ')' )? )*`.
//! A fixed termination set ends expression parsing in the absence of an
//! explicit statement separator.

use super::{types, Parser};
use crate::ast::*;
use crate::parser::error::ParseError;
use crate::token::Token;

/// The fixed set of tokens that terminates expression parsing, both at the
/// top level and after a completed call.
pub fn is_terminator(token: &Token) -> bool {
    matches!(
        token,
        Token::Loop
            | Token::Then
            | Token::End
            | Token::Else
            | Token::Class
            | Token::While
            | Token::If
            | Token::Return
            | Token::Var
            | Token::RightParen
            | Token::Comma
            | Token::RightBracket
    )
}

/// Parse an expression.
pub fn parse_expression(p: &mut Parser) -> Result<Expression, ParseError> {
    let start = p.current_span();
    let mut expression = parse_atom(p)?;

    loop {
        match p.current() {
            Token::LeftParen => {
                let args = parse_args(p)?;
                expression = finish_call(expression, args, p.span_from(start));
            }
            Token::Dot => {
                p.advance();
                let member = p.expect_name()?;
                expression = Expression::Member(MemberExpr {
                    target: Box::new(expression),
                    member,
                    span: p.span_from(start),
                });
            }
            _ => break,
        }
    }

    Ok(expression)
}

/// Parse a parenthesised argument list.
fn parse_args(p: &mut Parser) -> Result<Vec<Expression>, ParseError> {
    p.expect(Token::LeftParen)?;
    let mut args = Vec::new();

    if !p.check(&Token::RightParen) {
        loop {
            args.push(parse_expression(p)?);
            if p.check(&Token::Comma) {
                p.advance();
            } else {
                break;
            }
        }
    }

    p.expect(Token::RightParen)?;
    Ok(args)
}

/// Turn `callee(args)` into the right node.
///
/// A call on a built-in type name (`Integer`, `Real`, `Boolean`, `String`,
/// `Array[...]`, `List[...]`) is a constructor invocation. Everything else
/// stays a call; whether a bare-identifier call is an implicit `this` method
/// call or a user-class instantiation is resolved during emission.
fn finish_call(callee: Expression, args: Vec<Expression>, span: crate::token::Span) -> Expression {
    if let Expression::Identifier(id) = &callee {
        let head = generic_head(&id.name);
        if matches!(
            head,
            "Integer" | "Real" | "Boolean" | "String" | "Array" | "List"
        ) {
            return Expression::New(NewExpr {
                class_name: TypeName::new(id.name.clone(), id.span),
                args,
                span,
            });
        }
    }
    Expression::Call(CallExpr {
        callee: Box::new(callee),
        args,
        span,
    })
}

/// Parse an atom: a literal, `this`, a negated numeric literal, or an
/// identifier with an optional type-argument suffix.
fn parse_atom(p: &mut Parser) -> Result<Expression, ParseError> {
    let span = p.current_span();
    match p.current().clone() {
        Token::IntLiteral(value) => {
            p.advance();
            Ok(Expression::IntLiteral(IntLiteral { value, span }))
        }
        Token::RealLiteral(value) => {
            p.advance();
            Ok(Expression::RealLiteral(RealLiteral { value, span }))
        }
        Token::StringLiteral(value) => {
            p.advance();
            Ok(Expression::StringLiteral(StringLiteral { value, span }))
        }
        Token::True => {
            p.advance();
            Ok(Expression::BoolLiteral(BoolLiteral { value: true, span }))
        }
        Token::False => {
            p.advance();
            Ok(Expression::BoolLiteral(BoolLiteral { value: false, span }))
        }
        Token::This => {
            p.advance();
            Ok(Expression::This(span))
        }
        // The lexer has no `-` token; a negative number arrives as the
        // Unknown "-" prefix followed by a numeric literal.
        Token::Unknown(ref s) if s == "-" => {
            p.advance();
            let span = p.span_from(span);
            match p.current().clone() {
                Token::IntLiteral(value) => {
                    p.advance();
                    Ok(Expression::IntLiteral(IntLiteral {
                        value: -value,
                        span,
                    }))
                }
                Token::RealLiteral(value) => {
                    p.advance();
                    Ok(Expression::RealLiteral(RealLiteral {
                        value: -value,
                        span,
                    }))
                }
                _ => Err(p.unexpected("a numeric literal after `-`")),
            }
        }
        tok => match tok.as_identifier() {
            Some(name) => {
                let name = name.to_string();
                p.advance();
                let canonical = types::parse_generic_suffix(p, name)?;
                Ok(Expression::Identifier(Identifier {
                    name: canonical,
                    span: p.span_from(span),
                }))
            }
            None => Err(p.unexpected("an expression")),
        },
    }
}
