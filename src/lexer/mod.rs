//! # Lexer Module
//!
//! This module implements the lexical analysis stage for the Sail language.
//! It transforms raw source text into a flat sequence of tokens (terminated
//! by a single [`TokenKind::EndOfFile`]) which is consumed by the parser.
//! Only line numbers are tracked; they drive every error message downstream.

mod token;

pub use token::*;

use std::{collections::HashMap, error::Error, fmt::Display};

use once_cell::sync::Lazy;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("and", TokenKind::And),
        ("class", TokenKind::Class),
        ("else", TokenKind::Else),
        ("false", TokenKind::False),
        ("fn", TokenKind::Fn),
        ("for", TokenKind::For),
        ("if", TokenKind::If),
        ("null", TokenKind::Null),
        ("or", TokenKind::Or),
        ("return", TokenKind::Return),
        ("super", TokenKind::Super),
        ("this", TokenKind::This),
        ("true", TokenKind::True),
        ("let", TokenKind::Let),
        ("while", TokenKind::While),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error at line {}: {}", self.line, self.message)
    }
}

impl Error for LexError {}

pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the whole input. Fails on the first unrecoverable character.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens
            .push(Token::new(TokenKind::EndOfFile, "", None, self.line));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> LexResult<()> {
        let c = self.advance();
        match c {
            b'(' => self.add_token(TokenKind::LeftParen),
            b')' => self.add_token(TokenKind::RightParen),
            b'{' => self.add_token(TokenKind::LeftBrace),
            b'}' => self.add_token(TokenKind::RightBrace),
            b',' => self.add_token(TokenKind::Comma),
            b'.' => self.add_token(TokenKind::Dot),
            b'-' => self.add_token(TokenKind::Minus),
            b'+' => self.add_token(TokenKind::Plus),
            b';' => self.add_token(TokenKind::Semicolon),
            b'*' => self.add_token(TokenKind::Star),
            b'!' => {
                let kind = if self.matches(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.matches(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.matches(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.matches(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            b'|' => {
                let kind = if self.matches(b'|') {
                    TokenKind::Or
                } else {
                    TokenKind::BitwiseOr
                };
                self.add_token(kind);
            }
            b'&' => {
                let kind = if self.matches(b'&') {
                    TokenKind::And
                } else {
                    TokenKind::BitwiseAnd
                };
                self.add_token(kind);
            }
            b'^' => self.add_token(TokenKind::BitwiseXor),
            b'~' => self.add_token(TokenKind::BitwiseNot),
            b'/' => {
                if self.matches(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            b' ' | b'\r' | b'\t' => {}
            b'\n' => self.line += 1,
            b'"' => self.string()?,
            _ => {
                if c.is_ascii_digit() {
                    self.number()?;
                } else if is_identifier_start(c) {
                    self.identifier();
                } else {
                    return Err(LexError {
                        line: self.line,
                        message: "Unexpected character".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn string(&mut self) -> LexResult<()> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexError {
                line: self.line,
                message: "Unterminated string".to_string(),
            });
        }

        // closing quote
        self.advance();

        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_literal_token(TokenKind::String, Literal::Str(value));
        Ok(())
    }

    fn number(&mut self) -> LexResult<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme = &self.source[self.start..self.current];
        let value = lexeme.parse::<f64>().map_err(|_| LexError {
            line: self.line,
            message: format!("Invalid number literal '{lexeme}'"),
        })?;
        self.add_literal_token(TokenKind::Number, Literal::Num(value));
        Ok(())
    }

    fn identifier(&mut self) {
        while is_identifier_part(self.peek()) {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        match KEYWORDS.get(text) {
            Some(kind) => self.add_token(*kind),
            None => self.add_token(TokenKind::Identifier),
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token::new(kind, lexeme, None, self.line));
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens
            .push(Token::new(kind, lexeme, Some(literal), self.line));
    }

    fn advance(&mut self) -> u8 {
        let c = self.source.as_bytes()[self.current];
        self.current += 1;
        c
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source.as_bytes()[self.current] != expected {
            return false;
        }

        self.current += 1;
        true
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            return b'\0';
        }
        self.source.as_bytes()[self.current]
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            return b'\0';
        }
        self.source.as_bytes()[self.current + 1]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_identifier_part(c: u8) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .lex()
            .expect("lexing should succeed")
            .iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_let_statement() {
        let tokens = Lexer::new("let foo = 42;").lex();

        assert_eq!(
            Ok(vec![
                Token::new(TokenKind::Let, "let", None, 1),
                Token::new(TokenKind::Identifier, "foo", None, 1),
                Token::new(TokenKind::Equal, "=", None, 1),
                Token::new(TokenKind::Number, "42", Some(Literal::Num(42.0)), 1),
                Token::new(TokenKind::Semicolon, ";", None, 1),
                Token::new(TokenKind::EndOfFile, "", None, 1),
            ]),
            tokens
        );
    }

    #[test]
    fn test_lex_function_keywords() {
        assert_eq!(
            kinds("fn () {}"),
            vec![
                TokenKind::Fn,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_lex_word_aliases_match_punctuators() {
        assert_eq!(kinds("a and b"), kinds("a && b"));
        assert_eq!(kinds("a or b"), kinds("a || b"));
    }

    #[test]
    fn test_lex_reserved_bitwise_tokens() {
        assert_eq!(
            kinds("| & ^ ~"),
            vec![
                TokenKind::BitwiseOr,
                TokenKind::BitwiseAnd,
                TokenKind::BitwiseXor,
                TokenKind::BitwiseNot,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_lex_two_character_punctuators() {
        assert_eq!(
            kinds("!= == <= >= ! = < >"),
            vec![
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_lex_number_literals() {
        let tokens = Lexer::new("1 2.5 1337").lex().expect("lexing should succeed");
        let literals = tokens
            .iter()
            .filter_map(|token| token.literal.clone())
            .collect::<Vec<_>>();

        assert_eq!(
            literals,
            vec![Literal::Num(1.0), Literal::Num(2.5), Literal::Num(1337.0)]
        );
    }

    #[test]
    fn test_lex_trailing_dot_is_not_part_of_number() {
        assert_eq!(
            kinds("1."),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_lex_string_spanning_lines() {
        let tokens = Lexer::new("\"one\ntwo\" x").lex().expect("lexing should succeed");

        assert_eq!(tokens[0].literal, Some(Literal::Str("one\ntwo".to_string())));
        // the identifier after the string sits on the second line
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_lex_string_has_no_escape_processing() {
        let tokens = Lexer::new(r#""a\nb""#).lex().expect("lexing should succeed");

        assert_eq!(tokens[0].literal, Some(Literal::Str("a\\nb".to_string())));
    }

    #[test]
    fn test_lex_unterminated_string() {
        let result = Lexer::new("\"oops").lex();

        assert_eq!(
            result,
            Err(LexError {
                line: 1,
                message: "Unterminated string".to_string()
            })
        );
    }

    #[test]
    fn test_lex_unexpected_character() {
        let result = Lexer::new("let a = @;").lex();

        assert_eq!(
            result,
            Err(LexError {
                line: 1,
                message: "Unexpected character".to_string()
            })
        );
    }

    #[test]
    fn test_lex_comments_are_skipped() {
        assert_eq!(
            kinds("// a comment\nfoo // trailing\n"),
            vec![TokenKind::Identifier, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_lex_line_tracking() {
        let tokens = Lexer::new("a\nb\n\nc").lex().expect("lexing should succeed");
        let lines = tokens.iter().map(|token| token.line).collect::<Vec<_>>();

        assert_eq!(lines, vec![1, 2, 4, 4]);
    }

    #[test]
    fn test_lex_keyword_table() {
        assert_eq!(kinds("null")[0], TokenKind::Null);
        assert_eq!(kinds("fn")[0], TokenKind::Fn);
        assert_eq!(kinds("nullx")[0], TokenKind::Identifier);
        assert_eq!(kinds("_fn")[0], TokenKind::Identifier);
    }
}
