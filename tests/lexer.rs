//! Integration tests for alisp-lexer crate.

use alisp_common::Span;
use alisp_diagnostic::ErrorCode;
use alisp_lexer::{Lexer, TokenKind};

fn lex(source: &str) -> Vec<TokenKind> {
    let lexer = Lexer::new(source);
    let (tokens, _) = lexer.tokenize();
    tokens.into_iter().map(|t| t.kind).collect()
}

fn lex_errors(source: &str) -> Vec<Option<ErrorCode>> {
    let (_, diagnostics) = Lexer::new(source).tokenize();
    diagnostics.into_iter().map(|d| d.code).collect()
}

fn sym(name: &str) -> TokenKind {
    TokenKind::Symbol(name.to_string())
}

// ============================================================================
// 基本 token
// ============================================================================

#[test]
fn test_simple_list() {
    assert_eq!(
        lex("(foo 42 3.5 \"hi\")"),
        vec![
            TokenKind::LParen,
            sym("foo"),
            TokenKind::Int(42),
            TokenKind::Real(3.5),
            TokenKind::String("hi".to_string()),
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_empty_source() {
    assert_eq!(lex(""), vec![TokenKind::Eof]);
    assert_eq!(lex("   \n\t"), vec![TokenKind::Eof]);
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(lex("; a comment\n1 ; trailing"), vec![TokenKind::Int(1), TokenKind::Eof]);
}

#[test]
fn test_token_spans() {
    let (tokens, _) = Lexer::new("(ab)").tokenize();
    let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
    assert_eq!(spans[0], Span::from_usize(0, 1));
    assert_eq!(spans[1], Span::from_usize(1, 3));
    assert_eq!(spans[2], Span::from_usize(3, 4));
}

// ============================================================================
// 读取宏
// ============================================================================

#[test]
fn test_reader_macro_tokens() {
    assert_eq!(
        lex("'a `(b ,c ,@d) #'f"),
        vec![
            TokenKind::Quote,
            sym("a"),
            TokenKind::Backquote,
            TokenKind::LParen,
            sym("b"),
            TokenKind::Comma,
            sym("c"),
            TokenKind::CommaAt,
            sym("d"),
            TokenKind::RParen,
            TokenKind::HashQuote,
            sym("f"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_reader_macro_names() {
    assert_eq!(TokenKind::Quote.reader_macro(), Some("quote"));
    assert_eq!(TokenKind::CommaAt.reader_macro(), Some("comma-at"));
    assert_eq!(TokenKind::HashQuote.reader_macro(), Some("function"));
    assert_eq!(TokenKind::LParen.reader_macro(), None);
}

// ============================================================================
// 数字与符号
// ============================================================================

#[test]
fn test_signed_numbers_and_operator_symbols() {
    assert_eq!(
        lex("-5 +3 - + 1+x"),
        vec![
            TokenKind::Int(-5),
            TokenKind::Int(3),
            sym("-"),
            sym("+"),
            TokenKind::Error,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_reals() {
    assert_eq!(
        lex("1e3 .5 -2.25"),
        vec![
            TokenKind::Real(1000.0),
            TokenKind::Real(0.5),
            TokenKind::Real(-2.25),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_keywords_and_markers_are_symbols() {
    assert_eq!(
        lex(":all &optional &rest a.b.c"),
        vec![sym(":all"), sym("&optional"), sym("&rest"), sym("a.b.c"), TokenKind::Eof]
    );
}

#[test]
fn test_digit_led_atom_is_invalid_number() {
    assert_eq!(lex("12ab"), vec![TokenKind::Error, TokenKind::Eof]);
    assert_eq!(lex_errors("12ab"), vec![Some(ErrorCode::InvalidNumber)]);
}

// ============================================================================
// 字符和字符串
// ============================================================================

#[test]
fn test_character_literals() {
    assert_eq!(
        lex("?a ?\\n"),
        vec![TokenKind::Int(97), TokenKind::Int(10), TokenKind::Eof]
    );
}

#[test]
fn test_lone_question_mark_is_symbol() {
    assert_eq!(lex("? x"), vec![sym("?"), sym("x"), TokenKind::Eof]);
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        lex(r#""a\tb\"c\\""#),
        vec![TokenKind::String("a\tb\"c\\".to_string()), TokenKind::Eof]
    );
}

#[test]
fn test_unterminated_string() {
    assert_eq!(lex("\"abc"), vec![TokenKind::Error, TokenKind::Eof]);
    assert_eq!(lex_errors("\"abc"), vec![Some(ErrorCode::UnterminatedString)]);
}

#[test]
fn test_invalid_escape() {
    assert_eq!(lex_errors(r#""\q""#), vec![Some(ErrorCode::InvalidEscape)]);
}

#[test]
fn test_stray_hash() {
    assert_eq!(lex("#x"), vec![TokenKind::Error, sym("x"), TokenKind::Eof]);
    assert_eq!(lex_errors("#x"), vec![Some(ErrorCode::UnexpectedCharacter)]);
}
