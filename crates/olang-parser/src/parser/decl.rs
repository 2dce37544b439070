//! Declaration parsing: classes, fields, constructors, methods.

use super::{expr, stmt, types, Parser};
use crate::ast::*;
use crate::parser::error::ParseError;
use crate::token::Token;

/// Parse a class declaration: `class Name extends Base is members end`.
pub fn parse_class(p: &mut Parser) -> Result<ClassDecl, ParseError> {
    let start = p.current_span();
    p.expect(Token::Class)?;
    let name = p.expect_identifier()?;

    let base = if p.check(&Token::Extends) {
        p.advance();
        Some(p.expect_identifier()?)
    } else {
        None
    };

    p.expect(Token::Is)?;

    let mut members = Vec::new();
    loop {
        while p.check(&Token::Semicolon) {
            p.advance();
        }
        match p.current() {
            Token::End => {
                p.advance();
                break;
            }
            // A `class` mid-class means the previous class is missing its
            // `end`; leave the token for the outer declaration loop.
            Token::Class | Token::Eof => break,
            Token::Var => members.push(Member::Field(parse_var_decl(p)?)),
            Token::This => members.push(Member::Constructor(parse_constructor(p)?)),
            Token::Method => members.push(Member::Method(parse_method(p)?)),
            _ => return Err(p.unexpected("a member declaration or `end`")),
        }
    }

    Ok(ClassDecl {
        name,
        base,
        members,
        span: p.span_from(start),
    })
}

/// Parse a variable declaration, used for class fields and block locals.
///
/// Three accepted shapes after the colon:
/// - `var x : Type := init` (declared type plus initialiser)
/// - `var x : Type` (declared type, default value)
/// - `var x : init` (initialiser only, type inferred)
pub fn parse_var_decl(p: &mut Parser) -> Result<VarDecl, ParseError> {
    let start = p.current_span();
    p.expect(Token::Var)?;
    let name = p.expect_name()?;
    p.expect(Token::Colon)?;

    let first = expr::parse_expression(p)?;
    let (declared_type, init) = if p.check(&Token::Assign) {
        let type_name = types::type_name_of_expr(&first)
            .ok_or_else(|| p.error("expected a type name before `:=`".to_string()))?;
        p.advance();
        let value = expr::parse_expression(p)?;
        (Some(type_name), Some(value))
    } else if let Some(type_name) = types::type_name_of_expr(&first) {
        (Some(type_name), None)
    } else {
        (None, Some(first))
    };

    Ok(VarDecl {
        name,
        declared_type,
        init,
        span: p.span_from(start),
    })
}

/// Parse a constructor declaration: `this(params) is body end`.
fn parse_constructor(p: &mut Parser) -> Result<ConstructorDecl, ParseError> {
    let start = p.current_span();
    p.expect(Token::This)?;
    let params = parse_params(p)?;
    p.expect(Token::Is)?;
    let body = stmt::parse_block(p)?;
    p.expect(Token::End)?;

    Ok(ConstructorDecl {
        params,
        body,
        span: p.span_from(start),
    })
}

/// Parse a method declaration with one of the three body forms:
/// `is body end` (block), `=> expr` (arrow), or nothing (forward).
fn parse_method(p: &mut Parser) -> Result<MethodDecl, ParseError> {
    let start = p.current_span();
    p.expect(Token::Method)?;
    let name = p.expect_identifier()?;
    let params = parse_params(p)?;

    let return_type = if p.check(&Token::Colon) {
        p.advance();
        Some(types::parse_type_name(p)?)
    } else {
        None
    };

    let body = if p.check(&Token::Is) {
        p.advance();
        let block = stmt::parse_block(p)?;
        p.expect(Token::End)?;
        MethodBody::Block(block)
    } else if p.check(&Token::Arrow) {
        p.advance();
        MethodBody::Arrow(expr::parse_expression(p)?)
    } else {
        MethodBody::Forward
    };

    Ok(MethodDecl {
        name,
        params,
        return_type,
        body,
        span: p.span_from(start),
    })
}

/// Parse a parenthesised parameter list. Parameter names accept keywords.
fn parse_params(p: &mut Parser) -> Result<Vec<Parameter>, ParseError> {
    p.expect(Token::LeftParen)?;
    let mut params = Vec::new();

    if !p.check(&Token::RightParen) {
        loop {
            let start = p.current_span();
            let name = p.expect_name()?;
            p.expect(Token::Colon)?;
            let type_name = types::parse_type_name(p)?;
            params.push(Parameter {
                name,
                type_name,
                span: p.span_from(start),
            });
            if p.check(&Token::Comma) {
                p.advance();
            } else {
                break;
            }
        }
    }

    p.expect(Token::RightParen)?;
    Ok(params)
}
