//! Completion queue shared between native callables and the driver.
//!
//! A native that starts background work registers a pending action; the
//! action, once run by the driver's spin loop, submits a completion
//! callback. `Evaluator::dispatch_callbacks` then invokes the callbacks
//! through the ordinary calling convention.

use std::collections::VecDeque;
use std::fmt;

use crate::value::Value;

/// Work registered by a native; it runs on the next spin.
pub type Action = Box<dyn FnOnce(&mut AsyncQueue)>;

/// A completion ready to be dispatched.
#[derive(Debug, Clone)]
pub struct PendingCallback {
    pub callable: Value,
    pub args: Vec<Value>,
}

#[derive(Default)]
pub struct AsyncQueue {
    actions: VecDeque<Action>,
    ready: VecDeque<PendingCallback>,
}

impl AsyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_action(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    pub fn submit_callback(&mut self, callable: Value, args: Vec<Value>) {
        self.ready.push_back(PendingCallback { callable, args });
    }

    /// Whether any action or completion is outstanding.
    pub fn has_pending(&self) -> bool {
        !self.actions.is_empty() || !self.ready.is_empty()
    }

    pub fn next_callback(&mut self) -> Option<PendingCallback> {
        self.ready.pop_front()
    }

    /// Run the actions queued so far. Actions they submit wait for the next spin.
    pub fn spin_once(&mut self) -> usize {
        let batch: Vec<Action> = self.actions.drain(..).collect();
        let count = batch.len();
        for action in batch {
            action(self);
        }
        count
    }
}

impl fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("actions", &self.actions.len())
            .field("ready", &self.ready)
            .finish()
    }
}
