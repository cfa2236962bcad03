//! Token definitions for alisp.

use alisp_common::Span;

/// A token with its kind and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Real(f64),
    String(String),

    /// Any atom that is not a number, e.g. `foo`, `:all`, `&rest`, `+`
    Symbol(String),

    // Delimiters
    LParen,
    RParen,

    // Reader macros
    /// `'`
    Quote,
    /// `` ` ``
    Backquote,
    /// `,`
    Comma,
    /// `,@`
    CommaAt,
    /// `#'`
    HashQuote,

    Eof,
    /// Malformed input; a diagnostic has been recorded.
    Error,
}

impl TokenKind {
    /// The symbol a reader macro token expands to.
    pub fn reader_macro(&self) -> Option<&'static str> {
        match self {
            TokenKind::Quote => Some("quote"),
            TokenKind::Backquote => Some("backquote"),
            TokenKind::Comma => Some("comma"),
            TokenKind::CommaAt => Some("comma-at"),
            TokenKind::HashQuote => Some("function"),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Int(_) => "integer",
            TokenKind::Real(_) => "real",
            TokenKind::String(_) => "string",
            TokenKind::Symbol(_) => "symbol",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Quote => "`'`",
            TokenKind::Backquote => "`` ` ``",
            TokenKind::Comma => "`,`",
            TokenKind::CommaAt => "`,@`",
            TokenKind::HashQuote => "`#'`",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "invalid token",
        }
    }
}
