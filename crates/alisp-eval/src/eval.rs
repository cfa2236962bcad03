//! The evaluator core: dispatch and the three calling conventions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use alisp_common::Span;
use alisp_diagnostic::ErrorCode;

use crate::callbacks::AsyncQueue;
use crate::env::{Environment, ModuleRef};
use crate::limits::Limits;
use crate::loader::NativeModule;
use crate::signal::{Condition, EvalResult, Unwind};
use crate::stack::ensure_sufficient_stack;
use crate::trace::{TraceFrame, Tracer};
use crate::value::{props, Callable, Lambda, NativeFn, Value, ValueKind};

/// A tree-walking evaluator with its own environment and symbol table.
pub struct Evaluator {
    pub(crate) env: Environment,
    symbols: HashMap<Rc<str>, Value>,
    pub(crate) limits: Limits,
    pub(crate) eval_depth: usize,
    pub(crate) lock_depth: usize,
    pub(crate) interrupt: Arc<AtomicBool>,
    pub(crate) callbacks: AsyncQueue,
    pub(crate) tracer: Tracer,
    pub(crate) module_paths: Vec<PathBuf>,
    pub(crate) native_modules: HashMap<String, NativeModule>,
    pub(crate) current_file: Option<PathBuf>,
    pub(crate) unit_span: Span,
}

impl Evaluator {
    /// Create an evaluator with the core natives installed.
    pub fn new() -> Self {
        let mut evaluator = Self {
            env: Environment::new(),
            symbols: HashMap::new(),
            limits: Limits::default(),
            eval_depth: 0,
            lock_depth: 0,
            interrupt: Arc::new(AtomicBool::new(false)),
            callbacks: AsyncQueue::new(),
            tracer: Tracer::default(),
            module_paths: Vec::new(),
            native_modules: HashMap::new(),
            current_file: None,
            unit_span: Span::DUMMY,
        };
        crate::builtin::install(&mut evaluator);
        evaluator
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Flag observed at the next `eval` entry; setting it raises an interrupt.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /// Register a native in the prime table.
    pub fn define_native(&mut self, native: NativeFn) {
        self.env.define_prime(native.name, Value::native(native));
    }

    /// The interned symbol for `name`.
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(symbol) = self.symbols.get(name) {
            return symbol.clone();
        }
        let symbol = Value::uninterned_symbol(name);
        self.symbols.insert(Rc::from(name), symbol.clone());
        symbol
    }

    /// Backtrace of the last error that reached the top level.
    pub fn take_backtrace(&mut self) -> Option<Vec<TraceFrame>> {
        self.tracer.take()
    }

    /// Span of the top-level form that was evaluated last.
    pub fn unit_span(&self) -> Span {
        self.unit_span
    }

    // ========== Dispatch ==========

    /// Evaluate one expression.
    pub fn eval(&mut self, expr: &Value) -> EvalResult {
        let mut guard = self.enter_eval()?;
        ensure_sufficient_stack(|| guard.dispatch(expr))
    }

    fn dispatch(&mut self, expr: &Value) -> EvalResult {
        match expr.kind() {
            ValueKind::Nil
            | ValueKind::True
            | ValueKind::Int(_)
            | ValueKind::Real(_)
            | ValueKind::String(_)
            | ValueKind::Callable(_) => Ok(expr.clone()),
            ValueKind::Symbol(name) => {
                if name.starts_with(':') {
                    Ok(expr.clone())
                } else {
                    Ok(self.env.find(name))
                }
            }
            ValueKind::List(items) => {
                let items = items.borrow().clone();
                match items.split_first() {
                    Some((head, args)) => self.apply_form(expr, head, args),
                    None => Ok(Value::nil()),
                }
            }
        }
    }

    /// Evaluate a sequence, keeping only the last value.
    pub fn eval_body(&mut self, forms: &[Value]) -> EvalResult {
        let mut result = Value::nil();
        for form in forms {
            result = self.eval(form)?;
        }
        Ok(result)
    }

    /// Evaluate each form left to right.
    pub fn eval_args(&mut self, forms: &[Value]) -> EvalResult<Vec<Value>> {
        forms.iter().map(|form| self.eval(form)).collect()
    }

    fn apply_form(&mut self, form: &Value, head: &Value, args: &[Value]) -> EvalResult {
        let callee = if head.as_callable().is_some() {
            head.clone()
        } else {
            self.eval(head)?
        };
        let Some(callable) = callee.as_callable() else {
            return Err(Condition::eval(format!(
                "`{}` is not callable (it is {})",
                head,
                callee.type_name()
            ))
            .with_code(ErrorCode::NotCallable)
            .into());
        };

        let file = self.current_file.clone();
        let mut traced = self.traced(|| TraceFrame {
            name: head
                .symbol_name()
                .map(str::to_string)
                .unwrap_or_else(|| callee.display_name()),
            line: form
                .prop(props::LINE)
                .and_then(|line| line.as_int())
                .map(|line| line as u32),
            file: file.map(|path| path.display().to_string()),
            native: matches!(callable, Callable::Native(_)),
        });

        let result = match callable {
            Callable::Native(native) => traced.call_native(native, args),
            Callable::Macro(lambda) => traced.expand_macro(&callee, lambda, args),
            Callable::Function(lambda) => {
                let values = traced.eval_args(args)?;
                traced.call_lambda(&callee, lambda, &values)
            }
        };

        if let Err(Unwind::Error(_)) = &result {
            traced.tracer.record_failure();
        }
        result
    }

    fn call_native(&mut self, native: &NativeFn, args: &[Value]) -> EvalResult {
        match &native.signature {
            Some(signature) => {
                let values = self.eval_args(args)?;
                signature.check(native.name, &values)?;
                (native.func)(self, &values)
            }
            None => (native.func)(self, args),
        }
    }

    fn expand_macro(&mut self, callee: &Value, lambda: &Lambda, args: &[Value]) -> EvalResult {
        let expansion = {
            let module = self.owning_module(callee);
            let mut scoped = self.scoped();
            lambda
                .params
                .bind(&mut scoped.env, &callee.display_name(), args)?;
            match module {
                Some(module) => scoped.in_module(module).eval_body(&lambda.body)?,
                None => scoped.eval_body(&lambda.body)?,
            }
        };
        self.eval(&expansion)
    }

    /// Call an interpreted function with already evaluated arguments.
    fn call_lambda(&mut self, callee: &Value, lambda: &Lambda, args: &[Value]) -> EvalResult {
        let name = callee.display_name();
        let module = self.owning_module(callee);
        let mut frame = self.call_frame(module)?;
        tracing::trace!(function = %name, depth = frame.env.call_depth(), "call");

        if let Some(captured) = callee.prop(props::CLOSURE) {
            for pair in captured.to_vec().unwrap_or_default() {
                let Some(pair) = pair.to_vec() else { continue };
                if let [symbol, value] = pair.as_slice()
                    && let Some(symbol) = symbol.symbol_name()
                {
                    frame.env.put(Rc::from(symbol), value.clone());
                }
            }
        }

        lambda.params.bind(&mut frame.env, &name, args)?;
        match frame.eval_body(&lambda.body) {
            Err(Unwind::Return(value)) => Ok(value),
            other => other,
        }
    }

    /// Apply a callable to evaluated arguments, as `funcall` does.
    pub fn apply(&mut self, function: &Value, args: Vec<Value>) -> EvalResult {
        let function = match function.symbol_name() {
            Some(name) => self.env.find(name),
            None => function.clone(),
        };
        match function.as_callable() {
            Some(Callable::Function(lambda)) => self.call_lambda(&function, lambda, &args),
            Some(Callable::Native(native)) => {
                let native = *native;
                match native.signature {
                    Some(signature) => {
                        signature.check(native.name, &args)?;
                        (native.func)(self, &args)
                    }
                    None => {
                        // Special forms read their arguments unevaluated.
                        let quote = self.intern("quote");
                        let quoted: Vec<Value> = args
                            .into_iter()
                            .map(|arg| Value::list(vec![quote.clone(), arg]))
                            .collect();
                        (native.func)(self, &quoted)
                    }
                }
            }
            Some(Callable::Macro(_)) => Err(Condition::argument(format!(
                "cannot apply macro `{}`",
                function.display_name()
            ))
            .with_code(ErrorCode::NotCallable)
            .into()),
            None => Err(Condition::eval(format!(
                "`{}` is not callable (it is {})",
                function,
                function.type_name()
            ))
            .with_code(ErrorCode::NotCallable)
            .into()),
        }
    }

    /// The module a callable was defined in.
    fn owning_module(&self, callee: &Value) -> Option<ModuleRef> {
        let owner = callee.prop(props::MODULE)?;
        self.env.module(owner.as_str()?)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
