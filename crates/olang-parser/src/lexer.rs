//! Lexer for the O language.
//!
//! A single pass over the source using a logos-derived scanner. The internal
//! token enum is converted to the public [`Token`] after lexing. Lexing is
//! total: unrecognised bytes become [`Token::Unknown`] rather than an error,
//! and the returned stream always ends with exactly one [`Token::Eof`].

use crate::token::{Span, Token};
use logos::Logos;

/// Logos-based token enum for scanning.
///
/// Converted to the public `Token` enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // Keywords (must come before identifiers)
    #[token("class")]
    Class,

    #[token("extends")]
    Extends,

    #[token("is")]
    Is,

    #[token("end")]
    End,

    #[token("var")]
    Var,

    #[token("method")]
    Method,

    #[token("this")]
    This,

    #[token("return")]
    Return,

    #[token("while")]
    While,

    #[token("loop")]
    Loop,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("true")]
    True,

    #[token("false")]
    False,

    // Identifiers (must come after keywords)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Numbers; a `.` between digit runs upgrades an integer to a real
    #[regex(r"[0-9]+", parse_int)]
    IntLiteral(i64),

    #[regex(r"[0-9]+\.[0-9]+", parse_real)]
    RealLiteral(f64),

    // Strings
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    StringLiteral(String),

    // Two-character punctuation (before single-character)
    #[token(":=")]
    Assign,

    #[token("=>")]
    Arrow,

    // Single-character punctuation
    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,
}

fn parse_int(lex: &mut logos::Lexer<LogosToken>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn parse_real(lex: &mut logos::Lexer<LogosToken>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    Some(unescape_string(inner))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('0') => result.push('\0'),
                Some(c) => result.push(c),
                None => break,
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Tokenize an entire source text.
///
/// Pure and total: the same input always yields the same stream, and the
/// stream always carries a single trailing `Eof`.
pub fn tokenize(source: &str) -> Vec<(Token, Span)> {
    let mut tokens = Vec::new();
    let mut logos_lexer = LogosToken::lexer(source);
    let mut line = 1u32;
    let mut column = 1u32;
    let mut last_end = 0usize;

    while let Some(token_result) = logos_lexer.next() {
        let range = logos_lexer.span();

        // Update line and column over the skipped text
        for c in source[last_end..range.start].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        let span = Span::new(range.start, range.end, line, column);

        let token = match token_result {
            Ok(logos_token) => convert_token(logos_token),
            Err(_) => Token::Unknown(source[range.start..range.end].to_string()),
        };
        tokens.push((token, span));

        // Update column over the token itself
        for c in source[range.start..range.end].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        last_end = range.end;
    }

    let eof_span = Span::new(source.len(), source.len(), line, column);
    tokens.push((Token::Eof, eof_span));
    tokens
}

fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::Class => Token::Class,
        LogosToken::Extends => Token::Extends,
        LogosToken::Is => Token::Is,
        LogosToken::End => Token::End,
        LogosToken::Var => Token::Var,
        LogosToken::Method => Token::Method,
        LogosToken::This => Token::This,
        LogosToken::Return => Token::Return,
        LogosToken::While => Token::While,
        LogosToken::Loop => Token::Loop,
        LogosToken::If => Token::If,
        LogosToken::Then => Token::Then,
        LogosToken::Else => Token::Else,
        LogosToken::True => Token::True,
        LogosToken::False => Token::False,
        LogosToken::Identifier(s) => Token::Identifier(s),
        LogosToken::IntLiteral(v) => Token::IntLiteral(v),
        LogosToken::RealLiteral(v) => Token::RealLiteral(v),
        LogosToken::StringLiteral(s) => Token::StringLiteral(s),
        LogosToken::Assign => Token::Assign,
        LogosToken::Arrow => Token::Arrow,
        LogosToken::Colon => Token::Colon,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Comma => Token::Comma,
        LogosToken::Dot => Token::Dot,
        LogosToken::LeftParen => Token::LeftParen,
        LogosToken::RightParen => Token::RightParen,
        LogosToken::LeftBracket => Token::LeftBracket,
        LogosToken::RightBracket => Token::RightBracket,
        LogosToken::Whitespace | LogosToken::LineComment => {
            unreachable!("whitespace and comments are skipped")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|(tok, _)| tok).collect()
    }

    #[test]
    fn test_empty_input_has_single_eof() {
        assert_eq!(kinds(""), vec![Token::Eof]);
        assert_eq!(kinds("   \n\t  "), vec![Token::Eof]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("class Foo extends Bar is end"),
            vec![
                Token::Class,
                Token::Identifier("Foo".to_string()),
                Token::Extends,
                Token::Identifier("Bar".to_string()),
                Token::Is,
                Token::End,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_compound_punctuation() {
        assert_eq!(
            kinds("x := y => :"),
            vec![
                Token::Identifier("x".to_string()),
                Token::Assign,
                Token::Identifier("y".to_string()),
                Token::Arrow,
                Token::Colon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            kinds("42 3.14"),
            vec![
                Token::IntLiteral(42),
                Token::RealLiteral(3.14),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_then_method_call() {
        // `1.Plus` must lex as integer, dot, identifier -- not a real
        assert_eq!(
            kinds("1.Plus"),
            vec![
                Token::IntLiteral(1),
                Token::Dot,
                Token::Identifier("Plus".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![Token::StringLiteral("a\nb".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_unknown_characters() {
        assert_eq!(
            kinds("- #"),
            vec![
                Token::Unknown("-".to_string()),
                Token::Unknown("#".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_determinism() {
        let source = "class A is var x : Integer(1) end";
        assert_eq!(tokenize(source), tokenize(source));
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("class\n  var");
        assert_eq!(tokens[0].1.line, 1);
        assert_eq!(tokens[1].1.line, 2);
        assert_eq!(tokens[1].1.column, 3);
    }

    #[test]
    fn test_lexemes_are_subsequence_of_source() {
        let source = "class C is var x : Integer(2) end";
        let mut rest = source;
        for (token, _) in tokenize(source) {
            let lexeme = token.lexeme();
            if lexeme.is_empty() {
                continue;
            }
            let at = rest.find(&lexeme).expect("lexeme not found in source");
            rest = &rest[at + lexeme.len()..];
        }
    }
}
