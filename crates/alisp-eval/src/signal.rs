//! Conditions and unwind signals.
//!
//! `Condition` is the error taxonomy visible to `condition-case`. `Unwind`
//! adds the non-error control transfers that travel the same `Err` path:
//! loop exits, early returns, process exit and interrupts.

use alisp_common::Span;
use alisp_diagnostic::{Diagnostic, DiagnosticKind, ErrorCode, Label};
use thiserror::Error;

use crate::value::Value;

/// Result of every evaluator operation.
pub type EvalResult<T = Value> = Result<T, Unwind>;

pub const ENVIRONMENT_SIGNAL: &str = "environment-signal";
pub const EVAL_SIGNAL: &str = "eval-signal";
pub const ARGUMENT_SIGNAL: &str = "argument-signal";
pub const PARSER_SIGNAL: &str = "parser-signal";
pub const MODULE_SIGNAL: &str = "module-signal";
pub const MODULE_REFERENCE_SIGNAL: &str = "module-reference-signal";
pub const INTERRUPT_SIGNAL: &str = "interrupt-signal";

/// A typed error condition.
#[derive(Debug, Clone, Error)]
pub enum Condition {
    #[error("{message}")]
    Environment {
        message: String,
        code: Option<ErrorCode>,
    },

    #[error("{message}")]
    Eval {
        message: String,
        code: Option<ErrorCode>,
    },

    #[error("{message}")]
    Argument {
        message: String,
        code: Option<ErrorCode>,
    },

    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: u32,
        column: u32,
        message: String,
        snippet: String,
        span: Span,
        code: Option<ErrorCode>,
    },

    #[error("{0}")]
    Module(String),

    #[error("{0}")]
    ModuleReference(String),

    /// Raised by `(signal 'name data)`.
    #[error("{name}: {data}")]
    Signal { name: String, data: Value },
}

impl Condition {
    pub fn environment(message: impl Into<String>) -> Self {
        Condition::Environment {
            message: message.into(),
            code: None,
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Condition::Eval {
            message: message.into(),
            code: None,
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Condition::Argument {
            message: message.into(),
            code: None,
        }
    }

    pub fn module(message: impl Into<String>) -> Self {
        Condition::Module(message.into())
    }

    pub fn module_reference(message: impl Into<String>) -> Self {
        Condition::ModuleReference(message.into())
    }

    /// Attach the diagnostic code reported for this condition.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        if let Condition::Environment { code: slot, .. }
        | Condition::Eval { code: slot, .. }
        | Condition::Argument { code: slot, .. } = &mut self
        {
            *slot = Some(code);
        }
        self
    }

    /// Name matched by `condition-case` handlers.
    pub fn name(&self) -> &str {
        match self {
            Condition::Environment { .. } => ENVIRONMENT_SIGNAL,
            Condition::Eval { .. } => EVAL_SIGNAL,
            Condition::Argument { .. } => ARGUMENT_SIGNAL,
            Condition::Parse { .. } => PARSER_SIGNAL,
            Condition::Module(_) => MODULE_SIGNAL,
            Condition::ModuleReference(_) => MODULE_REFERENCE_SIGNAL,
            Condition::Signal { name, .. } => name,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Condition::Parse { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            Condition::Environment { .. } => DiagnosticKind::Environment,
            Condition::Eval { .. } | Condition::Signal { .. } => DiagnosticKind::Eval,
            Condition::Argument { .. } => DiagnosticKind::Argument,
            Condition::Parse { .. } => DiagnosticKind::Parser,
            Condition::Module(_) | Condition::ModuleReference(_) => DiagnosticKind::Module,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Condition::Environment { code, .. }
            | Condition::Eval { code, .. }
            | Condition::Argument { code, .. }
            | Condition::Parse { code, .. } => *code,
            Condition::Module(_) => Some(ErrorCode::ModuleNotFound),
            Condition::ModuleReference(_) => Some(ErrorCode::ModuleReference),
            Condition::Signal { .. } => Some(ErrorCode::UncaughtSignal),
        }
    }

    /// Convert into a diagnostic pointing at `span` of the failing unit.
    pub fn to_diagnostic(&self, span: Span) -> Diagnostic {
        let span = match self {
            Condition::Parse { span, .. } => *span,
            _ => span,
        };
        let mut diagnostic = Diagnostic::error(self.diagnostic_kind(), span, self.message())
            .with_label(Label::new(span, format!("raised `{}`", self.name())));
        if let Some(code) = self.code() {
            diagnostic = diagnostic.with_code(code);
        }
        if let Condition::Parse { snippet, .. } = self {
            diagnostic = diagnostic.with_note(format!("in: {}", snippet.trim()));
        }
        diagnostic
    }
}

/// Everything that can leave `eval` through the `Err` path.
#[derive(Debug, Clone)]
pub enum Unwind {
    Error(Condition),
    Break,
    Continue,
    Return(Value),
    Exit(i32),
    Interrupt,
}

impl Unwind {
    /// Name visible to `condition-case`; `None` for signals it never sees.
    pub fn handler_name(&self) -> Option<&str> {
        match self {
            Unwind::Error(condition) => Some(condition.name()),
            Unwind::Interrupt => Some(INTERRUPT_SIGNAL),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Unwind::Error(_))
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Unwind::Error(condition) => Some(condition),
            _ => None,
        }
    }
}

impl From<Condition> for Unwind {
    fn from(condition: Condition) -> Self {
        Unwind::Error(condition)
    }
}

impl std::fmt::Display for Unwind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unwind::Error(condition) => write!(f, "{}", condition),
            Unwind::Break => write!(f, "`break` outside of a loop"),
            Unwind::Continue => write!(f, "`continue` outside of a loop"),
            Unwind::Return(_) => write!(f, "`return` outside of a function"),
            Unwind::Exit(code) => write!(f, "exit with status {}", code),
            Unwind::Interrupt => write!(f, "interrupted"),
        }
    }
}
