//! The alisp parser.

use alisp_common::Span;
use alisp_diagnostic::{Diagnostic, DiagnosticKind, ErrorCode, Label};
use alisp_lexer::{Token, TokenKind};
use alisp_syntax::{Sexp, SexpKind, SourceFile};

/// The alisp parser.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
        }
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Parse a complete source file.
    pub fn parse_file(&mut self) -> SourceFile {
        let start = self.current_span();
        let mut forms = Vec::new();

        while !self.at_end() {
            if let Some(form) = self.parse_form() {
                forms.push(form);
            }
        }

        let end = self.current_span();
        SourceFile {
            forms,
            span: start.merge(end),
        }
    }

    /// Parse one form. Returns `None` after reporting or skipping bad input;
    /// at least one token is consumed unless the parser is at `)` or the end.
    fn parse_form(&mut self) -> Option<Sexp> {
        let span = self.current_span();
        let kind = self.current_kind().clone();

        match kind {
            TokenKind::Int(n) => {
                self.advance();
                Some(Sexp::new(SexpKind::Int(n), span))
            }
            TokenKind::Real(r) => {
                self.advance();
                Some(Sexp::new(SexpKind::Real(r), span))
            }
            TokenKind::String(s) => {
                self.advance();
                Some(Sexp::new(SexpKind::String(s), span))
            }
            TokenKind::Symbol(name) => {
                self.advance();
                Some(Sexp::new(SexpKind::Symbol(name), span))
            }
            TokenKind::LParen => Some(self.parse_list()),
            TokenKind::RParen => {
                self.diagnostics.push(
                    Diagnostic::error(DiagnosticKind::Parser, span, "unexpected `)`")
                        .with_code(ErrorCode::UnmatchedDelimiter)
                        .with_label(Label::new(span, "no matching `(`")),
                );
                self.advance();
                None
            }
            TokenKind::Quote
            | TokenKind::Backquote
            | TokenKind::Comma
            | TokenKind::CommaAt
            | TokenKind::HashQuote => {
                let head = kind.reader_macro().unwrap_or("quote");
                self.advance();
                if matches!(self.current_kind(), TokenKind::RParen | TokenKind::Eof) {
                    self.error_expected_expression(span, &kind);
                    return None;
                }
                let inner = self.parse_form()?;
                Some(Sexp::wrap(head, span, inner))
            }
            TokenKind::Error => {
                // Already reported by the lexer.
                self.advance();
                None
            }
            TokenKind::Eof => None,
        }
    }

    fn parse_list(&mut self) -> Sexp {
        let open = self.current_span();
        self.advance();
        let mut items = Vec::new();

        loop {
            match self.current_kind() {
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            DiagnosticKind::Parser,
                            self.current_span(),
                            "unclosed `(`",
                        )
                        .with_code(ErrorCode::UnclosedDelimiter)
                        .with_label(Label::new(open, "list opened here")),
                    );
                    break;
                }
                _ => {
                    if let Some(item) = self.parse_form() {
                        items.push(item);
                    }
                }
            }
        }

        Sexp::new(SexpKind::List(items), open.merge(self.previous_span()))
    }

    fn error_expected_expression(&mut self, macro_span: Span, kind: &TokenKind) {
        let span = self.current_span();
        self.diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::Parser,
                span,
                format!("expected an expression after {}", kind.describe()),
            )
            .with_code(ErrorCode::ExpectedExpression)
            .with_label(Label::new(macro_span, "reader macro here"))
            .with_label(Label::new(
                span,
                format!("found {}", self.current_kind().describe()),
            )),
        );
    }

    // ========== Token Navigation ==========

    fn current(&self) -> &Token {
        // `new` guarantees a trailing `Eof`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::DUMMY
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }
}
