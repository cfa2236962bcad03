//! Parser for alisp.
//!
//! This crate provides a recursive descent parser that converts
//! tokens into a tree of s-expressions.
//!
//! ## Error Recovery
//!
//! A stray `)` is reported and skipped; an unclosed list is closed at the
//! end of input. Parsing always continues so that all errors in a file are
//! reported in one pass.

mod parser;

pub use parser::Parser;

use alisp_diagnostic::Diagnostic;
use alisp_lexer::Lexer;
use alisp_syntax::SourceFile;

/// Parse source code into an expression tree.
pub fn parse(source: &str) -> (SourceFile, Vec<Diagnostic>) {
    let lexer = Lexer::new(source);
    let (tokens, mut diagnostics) = lexer.tokenize();

    let mut parser = Parser::new(tokens);
    let file = parser.parse_file();

    diagnostics.extend(parser.diagnostics());
    (file, diagnostics)
}
