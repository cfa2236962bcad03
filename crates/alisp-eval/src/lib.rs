//! Interpreter/evaluator for alisp.
//!
//! This crate implements a tree-walking interpreter over reader values:
//! a shared value model with property bags, frames of lexical scopes,
//! modules, typed conditions and unwind signals, and a callback queue
//! for natives that complete asynchronously.

mod bind;
mod builtin;
mod callbacks;
mod env;
mod eval;
mod forms;
mod guard;
mod limits;
mod loader;
mod reader;
mod signal;
mod stack;
mod trace;
pub mod value;

pub use bind::{ParamSpec, OPTIONAL_MARKER, REST_MARKER};
pub use builtin::natives;
pub use callbacks::{Action, AsyncQueue, PendingCallback};
pub use env::{Environment, Module, ModuleRef, Scope, MAIN_MODULE};
pub use eval::Evaluator;
pub use guard::{EvaluationLock, FrameGuard, ModuleGuard, ScopeGuard};
pub use limits::{Limits, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_EVAL_DEPTH};
pub use loader::{ImportRequest, NativeModule, MODPATHS_VAR, SOURCE_EXTENSION};
pub use signal::{
    Condition, EvalResult, Unwind, ARGUMENT_SIGNAL, ENVIRONMENT_SIGNAL, EVAL_SIGNAL,
    INTERRUPT_SIGNAL, MODULE_REFERENCE_SIGNAL, MODULE_SIGNAL, PARSER_SIGNAL,
};
pub use stack::ensure_sufficient_stack;
pub use trace::{TraceFrame, TraceGuard};
pub use value::{props, ArgType, Callable, Lambda, NativeFn, Signature, Value, ValueKind};
