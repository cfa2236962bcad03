//! S-expression tree.
//! S 表达式树。

use alisp_common::Span;
use std::fmt;

/// A complete source file.
/// 完整的源文件。
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub forms: Vec<Sexp>,
    pub span: Span,
}

/// A parsed expression with its location.
/// 带位置信息的表达式。
#[derive(Debug, Clone, PartialEq)]
pub struct Sexp {
    pub kind: SexpKind,
    pub span: Span,
}

/// Kind of expression.
/// 表达式的类型。
#[derive(Debug, Clone, PartialEq)]
pub enum SexpKind {
    /// `42`, `?a` / 整数
    Int(i64),
    /// `1.5` / 实数
    Real(f64),
    /// `"text"` / 字符串
    String(String),
    /// `foo`, `:all` / 符号
    Symbol(String),
    /// `(a b c)`; reader macros are already expanded here.
    /// `(a b c)`；读取宏在此已展开。
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn new(kind: SexpKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn symbol(name: impl Into<String>, span: Span) -> Self {
        Self::new(SexpKind::Symbol(name.into()), span)
    }

    /// Wrap `inner` as `(head inner)`, the shape of every reader macro.
    /// 将 `inner` 包装为 `(head inner)`，即读取宏的形式。
    pub fn wrap(head: &str, head_span: Span, inner: Sexp) -> Self {
        let span = head_span.merge(inner.span);
        Self::new(
            SexpKind::List(vec![Self::symbol(head, head_span), inner]),
            span,
        )
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            SexpKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match &self.kind {
            SexpKind::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SexpKind::Int(n) => write!(f, "{}", n),
            SexpKind::Real(r) => write!(f, "{:?}", r),
            SexpKind::String(s) => write!(f, "{:?}", s),
            SexpKind::Symbol(name) => write!(f, "{}", name),
            SexpKind::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}
