use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Every kind of token the lexer can produce. The bitwise kinds are lexed but
/// currently rejected by the parser; they are reserved for future use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // single character
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // one or two characters
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,

    // literals
    Identifier,
    String,
    Number,

    // keywords
    Class,
    Else,
    False,
    Fn,
    For,
    If,
    Null,
    Return,
    Super,
    This,
    True,
    Let,
    While,

    EndOfFile,
}

/// Literal payload of a string or number token. This is the subset of runtime
/// values the lexer can produce on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(value) => f.write_str(value),
            Literal::Num(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// Populated only for string and number tokens.
    pub literal: Option<Literal>,
    /// 1-based source line this token starts on.
    pub line: usize,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        line: usize,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal,
            line,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind == TokenKind::EndOfFile {
            f.write_str("end")
        } else {
            f.write_str(&self.lexeme)
        }
    }
}
