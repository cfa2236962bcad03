//! Recursion limits.

/// Default maximum number of nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Default maximum number of nested `eval` invocations.
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 100_000;

/// Bounds on recursion, checked on entry to a call and to `eval`.
///
/// Exceeding either raises an `eval-signal` for the current evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    pub max_eval_depth: usize,
}

impl Limits {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_eval_depth(mut self, depth: usize) -> Self {
        self.max_eval_depth = depth;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
        }
    }
}
