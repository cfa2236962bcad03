//! The alisp lexer.
//! alisp 词法分析器。

use crate::token::{Token, TokenKind};
use alisp_common::Span;
use alisp_diagnostic::{Diagnostic, DiagnosticKind, ErrorCode, Label};

/// The alisp lexer.
/// alisp 词法分析器。
///
/// Converts source code into a sequence of tokens.
/// 将源代码转换为 token 序列。
pub struct Lexer<'src> {
    /// Character iterator with position info
    /// 带位置信息的字符迭代器
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    /// Current position in source
    /// 当前在源码中的位置
    pos: usize,
    /// Collected diagnostics (errors/warnings)
    /// 收集的诊断信息（错误/警告）
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code.
    /// 为给定的源代码创建新的词法分析器。
    pub fn new(source: &'src str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the entire source and return tokens and diagnostics.
    /// 对整个源代码进行词法分析，返回 token 列表和诊断信息。
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        (tokens, self.diagnostics)
    }

    /// Get the next token.
    /// 获取下一个 token。
    fn next_token(&mut self) -> Token {
        // Skip whitespace and comments - 跳过空白和注释
        self.skip_trivia();

        let start = self.pos;

        // Check for end of file - 检查是否到达文件末尾
        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::from_usize(start, start));
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '\'' => TokenKind::Quote,
            '`' => TokenKind::Backquote,

            // Comma or splicing comma - 逗号或拼接逗号
            ',' => {
                if self.peek_char() == Some('@') {
                    self.advance();
                    TokenKind::CommaAt
                } else {
                    TokenKind::Comma
                }
            }

            // Function quote #' - 函数引用 #'
            '#' => {
                if self.peek_char() == Some('\'') {
                    self.advance();
                    TokenKind::HashQuote
                } else {
                    self.error_unexpected_char(ch, start);
                    TokenKind::Error
                }
            }

            '"' => self.string_literal(start),

            // Character literal ?a, unless `?` stands alone
            // 字符字面量 ?a，单独的 `?` 视为符号
            '?' if self.peek_char().is_some_and(|c| !is_delimiter(c)) => self.char_literal(start),

            _ => self.atom(ch, start),
        };

        Token::new(kind, Span::from_usize(start, self.pos))
    }

    /// Advance to the next character.
    /// 前进到下一个字符。
    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.pos = pos + ch.len_utf8();
        }
        result
    }

    /// Peek at the next character without consuming it.
    /// 查看下一个字符但不消耗它。
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    /// Skip whitespace and `;` line comments.
    /// 跳过空白字符和 `;` 行注释。
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                while let Some(ch) = self.peek_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Parse a string literal (double-quoted).
    /// 解析字符串字面量（双引号包围）。
    fn string_literal(&mut self, start: usize) -> TokenKind {
        let mut value = String::new();
        let mut valid = true;

        loop {
            match self.advance() {
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.escape_char() {
                    Some(escaped) => value.push(escaped),
                    None => valid = false,
                },
                Some((_, ch)) => value.push(ch),
                None => {
                    let span = Span::from_usize(start, self.pos);
                    self.diagnostics.push(
                        Diagnostic::error(DiagnosticKind::Lexer, span, "unterminated string")
                            .with_code(ErrorCode::UnterminatedString)
                            .with_label(Label::new(
                                Span::from_usize(start, start + 1),
                                "string starts here",
                            )),
                    );
                    return TokenKind::Error;
                }
            }
        }

        if valid {
            TokenKind::String(value)
        } else {
            TokenKind::Error
        }
    }

    /// Parse a character literal `?c`, yielding its code point.
    /// 解析字符字面量 `?c`，得到其码点。
    fn char_literal(&mut self, start: usize) -> TokenKind {
        let ch = match self.advance() {
            Some((_, '\\')) => self.escape_char(),
            Some((_, ch)) => Some(ch),
            None => None,
        };

        if self.peek_char().is_some_and(|c| !is_delimiter(c)) {
            // `?ab` is not a character; swallow the rest as one bad atom.
            while self.peek_char().is_some_and(|c| !is_delimiter(c)) {
                self.advance();
            }
            let span = Span::from_usize(start, self.pos);
            self.diagnostics.push(
                Diagnostic::error(DiagnosticKind::Lexer, span, "invalid character literal")
                    .with_code(ErrorCode::UnexpectedCharacter)
                    .with_label(Label::new(span, "expected a single character after `?`")),
            );
            return TokenKind::Error;
        }

        match ch {
            Some(c) => TokenKind::Int(c as i64),
            None => TokenKind::Error,
        }
    }

    /// Parse an escape character sequence.
    /// 解析转义字符序列。
    fn escape_char(&mut self) -> Option<char> {
        match self.advance() {
            Some((_, 'n')) => Some('\n'),   // newline - 换行
            Some((_, 'r')) => Some('\r'),   // carriage return - 回车
            Some((_, 't')) => Some('\t'),   // tab - 制表符
            Some((_, '0')) => Some('\0'),   // null - 空字符
            Some((_, '\\')) => Some('\\'),  // backslash - 反斜杠
            Some((_, '"')) => Some('"'),    // double quote - 双引号
            Some((_, '\'')) => Some('\''),  // single quote - 单引号
            Some((_, '(')) => Some('('),
            Some((_, ')')) => Some(')'),
            Some((_, ' ')) => Some(' '),
            Some((pos, ch)) => {
                let span = Span::from_usize(pos.saturating_sub(1), self.pos);
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::Lexer,
                        span,
                        format!("invalid escape sequence: \\{}", ch),
                    )
                    .with_code(ErrorCode::InvalidEscape),
                );
                None
            }
            None => None,
        }
    }

    /// Read an atom and classify it as a number or a symbol.
    /// 读取一个原子并判断它是数字还是符号。
    fn atom(&mut self, first: char, start: usize) -> TokenKind {
        let mut text = String::from(first);
        while let Some(ch) = self.peek_char() {
            if is_delimiter(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }

        if !looks_numeric(&text) {
            return TokenKind::Symbol(text);
        }

        let is_real = text.contains(['.', 'e', 'E']);
        let parsed = if is_real {
            text.parse::<f64>().ok().map(TokenKind::Real)
        } else {
            text.parse::<i64>().ok().map(TokenKind::Int)
        };

        parsed.unwrap_or_else(|| {
            let span = Span::from_usize(start, self.pos);
            self.diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::Lexer,
                    span,
                    format!("invalid number literal: {}", text),
                )
                .with_code(ErrorCode::InvalidNumber)
                .with_label(Label::new(span, "cannot be read as a number")),
            );
            TokenKind::Error
        })
    }

    /// Report an unexpected character error.
    /// 报告意外字符错误。
    fn error_unexpected_char(&mut self, ch: char, pos: usize) {
        let span = Span::from_usize(pos, self.pos);
        self.diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::Lexer,
                span,
                format!("unexpected character: '{}'", ch),
            )
            .with_code(ErrorCode::UnexpectedCharacter)
            .with_label(Label::new(span, "unexpected character here")),
        );
    }
}

/// Characters that end an atom.
/// 结束原子的字符。
fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '\'' | '`' | ',' | '"' | ';')
}

/// An atom is numeric when it has a digit, an optional leading sign, and
/// nothing but digits, `.` and exponent markers after it.
/// 原子在包含数字且只由符号、数字、`.` 和指数标记组成时视为数字。
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let Some(first) = body.chars().next() else {
        return false;
    };
    if !(first.is_ascii_digit() || (first == '.' && body.len() > 1)) {
        return false;
    }
    if !body.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if first.is_ascii_digit() {
        // Digit-led atoms are always numbers, so `12ab` is reported.
        return true;
    }
    body.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}
