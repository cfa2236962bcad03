//! RAII guards over the evaluator's stacks.
//!
//! Every push onto a scope, frame, module or depth counter is paired with a
//! guard whose `Drop` undoes it, so the undo runs exactly once on every exit
//! path: normal return, `?` propagation of an unwind signal, or a panic.
//! Guards hold `&mut Evaluator` and deref to it, so evaluation continues
//! through the guard.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;

use alisp_diagnostic::ErrorCode;

use crate::env::ModuleRef;
use crate::eval::Evaluator;
use crate::signal::{Condition, EvalResult, Unwind};

macro_rules! deref_to_evaluator {
    ($guard:ident) => {
        impl Deref for $guard<'_> {
            type Target = Evaluator;

            fn deref(&self) -> &Self::Target {
                self.evaluator
            }
        }

        impl DerefMut for $guard<'_> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                self.evaluator
            }
        }
    };
}

/// A lexical scope pushed onto the current frame.
pub struct ScopeGuard<'a> {
    evaluator: &'a mut Evaluator,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.evaluator.env.destroy_scope();
    }
}

deref_to_evaluator!(ScopeGuard);

/// A call frame, with the callee's module active.
pub struct FrameGuard<'a> {
    evaluator: &'a mut Evaluator,
    previous: Option<ModuleRef>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.evaluator.env.finish_function();
        if let Some(previous) = self.previous.take() {
            self.evaluator.env.activate_module(previous);
        }
    }
}

deref_to_evaluator!(FrameGuard);

/// A temporarily active module.
pub struct ModuleGuard<'a> {
    evaluator: &'a mut Evaluator,
    previous: Option<ModuleRef>,
}

impl Drop for ModuleGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.evaluator.env.activate_module(previous);
        }
    }
}

deref_to_evaluator!(ModuleGuard);

/// One level of `eval` recursion.
pub struct DepthGuard<'a> {
    evaluator: &'a mut Evaluator,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.evaluator.eval_depth -= 1;
    }
}

deref_to_evaluator!(DepthGuard);

/// Held around a top-level evaluation unit; callback dispatch is
/// suspended while any lock is held.
pub struct EvaluationLock<'a> {
    evaluator: &'a mut Evaluator,
}

impl Drop for EvaluationLock<'_> {
    fn drop(&mut self) {
        self.evaluator.lock_depth -= 1;
    }
}

deref_to_evaluator!(EvaluationLock);

impl Evaluator {
    /// Push a scope that is popped when the guard drops.
    pub fn scoped(&mut self) -> ScopeGuard<'_> {
        self.env.new_scope();
        ScopeGuard { evaluator: self }
    }

    /// Push a call frame and activate `module` for its duration.
    pub fn call_frame(&mut self, module: Option<ModuleRef>) -> Result<FrameGuard<'_>, Condition> {
        if self.env.call_depth() >= self.limits.max_call_depth {
            return Err(Condition::eval(format!(
                "maximum call depth of {} exceeded",
                self.limits.max_call_depth
            ))
            .with_code(ErrorCode::DepthExceeded));
        }
        self.env.call_function();
        let previous = module.map(|module| self.env.activate_module(module));
        Ok(FrameGuard {
            evaluator: self,
            previous,
        })
    }

    /// Activate `module` until the guard drops.
    pub fn in_module(&mut self, module: ModuleRef) -> ModuleGuard<'_> {
        let previous = Some(self.env.activate_module(module));
        ModuleGuard {
            evaluator: self,
            previous,
        }
    }

    /// Enter one level of `eval`. This is where interrupts are observed.
    pub(crate) fn enter_eval(&mut self) -> EvalResult<DepthGuard<'_>> {
        if self.interrupt.swap(false, Ordering::SeqCst) {
            return Err(Unwind::Interrupt);
        }
        if self.eval_depth >= self.limits.max_eval_depth {
            return Err(Condition::eval(format!(
                "maximum evaluation depth of {} exceeded",
                self.limits.max_eval_depth
            ))
            .with_code(ErrorCode::DepthExceeded)
            .into());
        }
        self.eval_depth += 1;
        Ok(DepthGuard { evaluator: self })
    }

    /// Hold the evaluation lock until the guard drops.
    pub fn lock(&mut self) -> EvaluationLock<'_> {
        if self.lock_depth == 0 {
            // A new top-level unit; forget any backtrace nobody collected.
            self.tracer.discard();
        }
        self.lock_depth += 1;
        EvaluationLock { evaluator: self }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    #[test]
    fn scope_popped_on_panic() {
        let mut evaluator = Evaluator::new();
        let before = evaluator.env.scope_depth();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut scoped = evaluator.scoped();
            scoped.env.put(Rc::from("x"), Value::int(1));
            panic!("unwinding through a scope");
        }));
        assert!(result.is_err());
        assert_eq!(evaluator.env.scope_depth(), before);
        assert!(evaluator.env.lookup("x").is_none());
    }

    #[test]
    fn frame_restores_module_on_error() {
        let mut evaluator = Evaluator::new();
        let other = evaluator.env.define_module("other");
        let result: Result<(), Condition> = (|| {
            let frame = evaluator.call_frame(Some(other.clone()))?;
            assert_eq!(frame.env.active_module_name(), "other");
            Err(Condition::eval("boom"))
        })();
        assert!(result.is_err());
        assert_eq!(evaluator.env.active_module_name(), crate::env::MAIN_MODULE);
        assert_eq!(evaluator.env.call_depth(), 0);
    }

    #[test]
    fn depth_guard_counts() {
        let mut evaluator = Evaluator::new();
        {
            let mut outer = evaluator.enter_eval().unwrap();
            assert_eq!(outer.eval_depth, 1);
            let inner = outer.enter_eval().unwrap();
            assert_eq!(inner.eval_depth, 2);
        }
        assert_eq!(evaluator.eval_depth, 0);
    }

    #[test]
    fn lock_nests() {
        let mut evaluator = Evaluator::new();
        {
            let mut outer = evaluator.lock();
            assert!(outer.is_locked());
            let inner = outer.lock();
            assert!(inner.is_locked());
        }
        assert!(!evaluator.is_locked());
    }
}
