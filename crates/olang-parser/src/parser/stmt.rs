//! Statement and block parsing.

use super::{decl, expr, Parser};
use crate::ast::*;
use crate::parser::error::ParseError;
use crate::token::Token;

/// Parse a block body up to (but not consuming) `end` or `else`.
///
/// Local declarations and statements are kept interleaved in `body`;
/// [`Block::new`] derives the `locals` and `statements` projections.
pub fn parse_block(p: &mut Parser) -> Result<Block, ParseError> {
    let start = p.current_span();
    let mut items = Vec::new();

    loop {
        while p.check(&Token::Semicolon) {
            p.advance();
        }
        match p.current() {
            Token::End | Token::Else | Token::Eof => break,
            Token::Var => items.push(BlockItem::Var(decl::parse_var_decl(p)?)),
            _ => items.push(BlockItem::Stmt(parse_statement(p)?)),
        }
    }

    Ok(Block::new(items, p.span_from(start)))
}

/// Parse a single statement.
///
/// The assignment lookahead (`name :=` or `this . name :=`) is checked
/// before falling through to expression-statement parsing, since
/// identifier-only statements are otherwise valid expressions.
pub fn parse_statement(p: &mut Parser) -> Result<Statement, ParseError> {
    match p.current() {
        Token::While => parse_while(p),
        Token::If => parse_if(p),
        Token::Return => parse_return(p),
        Token::This
            if matches!(p.la(1), Token::Dot)
                && p.la(2).as_identifier().is_some()
                && matches!(p.la(3), Token::Assign) =>
        {
            parse_this_assign(p)
        }
        tok if tok.as_identifier().is_some() && matches!(p.la(1), Token::Assign) => {
            parse_name_assign(p)
        }
        _ => {
            let start = p.current_span();
            let expression = expr::parse_expression(p)?;
            Ok(Statement::Expression(ExpressionStatement {
                expression,
                span: p.span_from(start),
            }))
        }
    }
}

fn parse_while(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.current_span();
    p.expect(Token::While)?;
    let condition = expr::parse_expression(p)?;
    p.expect(Token::Loop)?;
    let body = parse_block(p)?;
    p.expect(Token::End)?;

    Ok(Statement::While(WhileStatement {
        condition,
        body,
        span: p.span_from(start),
    }))
}

fn parse_if(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.current_span();
    p.expect(Token::If)?;
    let condition = expr::parse_expression(p)?;
    p.expect(Token::Then)?;
    let then_block = parse_block(p)?;

    let else_block = if p.check(&Token::Else) {
        p.advance();
        Some(parse_block(p)?)
    } else {
        None
    };
    p.expect(Token::End)?;

    Ok(Statement::If(IfStatement {
        condition,
        then_block,
        else_block,
        span: p.span_from(start),
    }))
}

fn parse_return(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.current_span();
    p.expect(Token::Return)?;

    let value = if expr::is_terminator(p.current())
        || matches!(p.current(), Token::Semicolon | Token::Eof)
    {
        None
    } else {
        Some(expr::parse_expression(p)?)
    };

    Ok(Statement::Return(ReturnStatement {
        value,
        span: p.span_from(start),
    }))
}

fn parse_name_assign(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.current_span();
    let target = p.expect_name()?;
    p.expect(Token::Assign)?;
    let value = expr::parse_expression(p)?;

    Ok(Statement::Assign(AssignStatement {
        target: AssignTarget::Name(target),
        value,
        span: p.span_from(start),
    }))
}

fn parse_this_assign(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.current_span();
    p.expect(Token::This)?;
    p.expect(Token::Dot)?;
    let field = p.expect_name()?;
    p.expect(Token::Assign)?;
    let value = expr::parse_expression(p)?;

    Ok(Statement::Assign(AssignStatement {
        target: AssignTarget::ThisField(field),
        value,
        span: p.span_from(start),
    }))
}
