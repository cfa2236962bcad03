//! Call-stack tracing.
//!
//! With the `stack-trace` feature every list application pushes a
//! `TraceFrame`. The first frame an error unwinds through takes a snapshot
//! of the stack; a `condition-case` that handles the error discards it, so
//! only errors that reach the driver leave a backtrace behind.
//! Without the feature the tracer records nothing.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::eval::Evaluator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub name: String,
    pub line: Option<u32>,
    pub file: Option<String>,
    pub native: bool,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.native {
            write!(f, " [native]")?;
        }
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, " at {}:{}", file, line),
            (None, Some(line)) => write!(f, " at line {}", line),
            (Some(file), None) => write!(f, " in {}", file),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Tracer {
    #[cfg_attr(not(feature = "stack-trace"), allow(dead_code))]
    frames: Vec<TraceFrame>,
    snapshot: Option<Vec<TraceFrame>>,
}

#[cfg(feature = "stack-trace")]
impl Tracer {
    fn push(&mut self, frame: impl FnOnce() -> TraceFrame) {
        self.frames.push(frame());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Snapshot the stack unless an earlier (deeper) frame already did.
    pub(crate) fn record_failure(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.frames.iter().rev().cloned().collect());
        }
    }
}

#[cfg(not(feature = "stack-trace"))]
impl Tracer {
    #[inline]
    fn push(&mut self, _frame: impl FnOnce() -> TraceFrame) {}

    #[inline]
    fn pop(&mut self) {}

    #[inline]
    pub(crate) fn record_failure(&mut self) {}
}

impl Tracer {
    /// Drop a pending snapshot after its error was handled.
    pub(crate) fn discard(&mut self) {
        self.snapshot = None;
    }

    pub(crate) fn take(&mut self) -> Option<Vec<TraceFrame>> {
        self.snapshot.take()
    }
}

/// Keeps one `TraceFrame` on the stack for the guard's lifetime.
pub struct TraceGuard<'a> {
    evaluator: &'a mut Evaluator,
}

impl Drop for TraceGuard<'_> {
    fn drop(&mut self) {
        self.evaluator.tracer.pop();
    }
}

impl Deref for TraceGuard<'_> {
    type Target = Evaluator;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for TraceGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl Evaluator {
    pub(crate) fn traced(&mut self, frame: impl FnOnce() -> TraceFrame) -> TraceGuard<'_> {
        self.tracer.push(frame);
        TraceGuard { evaluator: self }
    }
}
