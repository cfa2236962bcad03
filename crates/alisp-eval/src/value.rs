//! Runtime values.
//!
//! Every datum is a `Value`, a shared handle to an `Object` carrying the
//! variant payload and a property bag. Cloning a `Value` clones the handle,
//! so lists mutated through one binding are seen through every other one.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use alisp_diagnostic::ErrorCode;

use crate::bind::ParamSpec;
use crate::eval::Evaluator;
use crate::signal::{Condition, EvalResult};

/// Well-known property names.
pub mod props {
    /// Name of a callable or a module.
    pub const NAME: &str = "--name--";
    /// Name of the module a value was defined in.
    pub const MODULE: &str = "--module--";
    /// Bindings captured by a `lambda`, as a list of `(name value)` pairs.
    pub const CLOSURE: &str = "--closure--";
    /// Docstring.
    pub const DOC: &str = "--doc--";
    /// Source line of a list read from text.
    pub const LINE: &str = "--line--";
}

/// A runtime value: a shared, mutable-content handle.
#[derive(Clone)]
pub struct Value(Rc<Object>);

pub struct Object {
    kind: ValueKind,
    props: RefCell<HashMap<String, Value>>,
}

/// The closed set of value variants.
pub enum ValueKind {
    Nil,
    True,
    Int(i64),
    Real(f64),
    String(String),
    Symbol(Rc<str>),
    List(RefCell<Vec<Value>>),
    Callable(Callable),
}

/// Function, macro, or native implementation.
pub enum Callable {
    Function(Lambda),
    Macro(Lambda),
    Native(NativeFn),
}

/// An interpreted function or macro body.
pub struct Lambda {
    pub params: ParamSpec,
    pub body: Vec<Value>,
}

/// A callable implemented in Rust.
///
/// Without a signature, `func` receives the raw argument forms and decides
/// what to evaluate. With one, it receives evaluated, type-checked values.
#[derive(Clone, Copy)]
pub struct NativeFn {
    pub name: &'static str,
    pub signature: Option<Signature>,
    pub func: fn(&mut Evaluator, &[Value]) -> EvalResult,
}

/// Declared argument types of an eager native.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub params: &'static [ArgType],
    pub rest: Option<ArgType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Any,
    Int,
    Number,
    String,
    Symbol,
    List,
    Callable,
    /// A callable, or a symbol naming one.
    Function,
}

impl ArgType {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ArgType::Any => true,
            ArgType::Int => matches!(value.kind(), ValueKind::Int(_)),
            ArgType::Number => matches!(value.kind(), ValueKind::Int(_) | ValueKind::Real(_)),
            ArgType::String => matches!(value.kind(), ValueKind::String(_)),
            ArgType::Symbol => value.symbol_name().is_some(),
            ArgType::List => value.is_nil() || value.is_list(),
            ArgType::Callable => value.as_callable().is_some(),
            ArgType::Function => {
                value.as_callable().is_some()
                    || (value.symbol_name().is_some() && !value.is_keyword())
            }
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArgType::Any => "value",
            ArgType::Int => "integer",
            ArgType::Number => "number",
            ArgType::String => "string",
            ArgType::Symbol => "symbol",
            ArgType::List => "list",
            ArgType::Callable => "callable",
            ArgType::Function => "function",
        }
    }
}

impl Signature {
    pub const fn fixed(params: &'static [ArgType]) -> Self {
        Self { params, rest: None }
    }

    pub const fn variadic(params: &'static [ArgType], rest: ArgType) -> Self {
        Self {
            params,
            rest: Some(rest),
        }
    }

    /// Validate evaluated arguments against the declared types.
    pub fn check(&self, name: &str, args: &[Value]) -> Result<(), Condition> {
        let fixed = self.params.len();
        let count_ok = match self.rest {
            Some(_) => args.len() >= fixed,
            None => args.len() == fixed,
        };
        if !count_ok {
            let expected = match self.rest {
                Some(_) => format!("at least {}", fixed),
                None => fixed.to_string(),
            };
            return Err(Condition::argument(format!(
                "{}: expected {} arguments, got {}",
                name,
                expected,
                args.len()
            ))
            .with_code(ErrorCode::WrongArity));
        }

        for (i, arg) in args.iter().enumerate() {
            let ty = self.params.get(i).copied().or(self.rest).unwrap_or(ArgType::Any);
            if !ty.accepts(arg) {
                return Err(Condition::argument(format!(
                    "{}: argument {} must be a {}, got {} `{}`",
                    name,
                    i + 1,
                    ty.name(),
                    arg.type_name(),
                    arg
                ))
                .with_code(ErrorCode::ArgumentTypeMismatch));
            }
        }
        Ok(())
    }
}

thread_local! {
    static NIL: Value = Value::alloc(ValueKind::Nil);
    static TRUE: Value = Value::alloc(ValueKind::True);
}

impl Value {
    fn alloc(kind: ValueKind) -> Self {
        Value(Rc::new(Object {
            kind,
            props: RefCell::new(HashMap::new()),
        }))
    }

    pub fn nil() -> Self {
        NIL.with(Value::clone)
    }

    pub fn t() -> Self {
        TRUE.with(Value::clone)
    }

    pub fn bool(b: bool) -> Self {
        if b { Value::t() } else { Value::nil() }
    }

    pub fn int(n: i64) -> Self {
        Value::alloc(ValueKind::Int(n))
    }

    pub fn real(r: f64) -> Self {
        Value::alloc(ValueKind::Real(r))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::alloc(ValueKind::String(s.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::alloc(ValueKind::List(RefCell::new(items)))
    }

    /// A symbol that is not registered in any symbol table.
    /// Use `Evaluator::intern` for ordinary symbols.
    pub fn uninterned_symbol(name: &str) -> Self {
        Value::alloc(ValueKind::Symbol(Rc::from(name)))
    }

    pub fn callable(callable: Callable) -> Self {
        Value::alloc(ValueKind::Callable(callable))
    }

    pub fn native(native: NativeFn) -> Self {
        let value = Value::callable(Callable::Native(native));
        value.set_prop(props::NAME, Value::string(native.name));
        value
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0.kind
    }

    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind(), ValueKind::Nil)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind(), ValueKind::Nil | ValueKind::True)
    }

    /// `nil` and the empty list are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self.kind() {
            ValueKind::Nil => false,
            ValueKind::List(items) => !items.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind(), ValueKind::List(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind() {
            ValueKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self.kind() {
            ValueKind::Real(r) => Some(*r),
            ValueKind::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.kind() {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self.kind() {
            ValueKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.symbol_name().is_some_and(|name| name.starts_with(':'))
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self.kind() {
            ValueKind::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Borrow the element sequence of a list.
    pub fn items(&self) -> Option<Ref<'_, Vec<Value>>> {
        match self.kind() {
            ValueKind::List(items) => Some(items.borrow()),
            _ => None,
        }
    }

    /// Mutably borrow the element sequence; visible through every alias.
    pub fn items_mut(&self) -> Option<RefMut<'_, Vec<Value>>> {
        match self.kind() {
            ValueKind::List(items) => Some(items.borrow_mut()),
            _ => None,
        }
    }

    /// Snapshot of a list's elements; `nil` reads as the empty list.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        match self.kind() {
            ValueKind::Nil => Some(Vec::new()),
            ValueKind::List(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Nil => "nil",
            ValueKind::True => "t",
            ValueKind::Int(_) => "integer",
            ValueKind::Real(_) => "real",
            ValueKind::String(_) => "string",
            ValueKind::Symbol(_) => "symbol",
            ValueKind::List(_) => "list",
            ValueKind::Callable(Callable::Function(_)) => "function",
            ValueKind::Callable(Callable::Macro(_)) => "macro",
            ValueKind::Callable(Callable::Native(_)) => "native",
        }
    }

    // ========== Property bag ==========

    pub fn prop(&self, key: &str) -> Option<Value> {
        self.0.props.borrow().get(key).cloned()
    }

    pub fn set_prop(&self, key: impl Into<String>, value: Value) {
        self.0.props.borrow_mut().insert(key.into(), value);
    }

    pub fn has_prop(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    pub fn remove_prop(&self, key: &str) -> Option<Value> {
        self.0.props.borrow_mut().remove(key)
    }

    /// Property names in sorted order.
    pub fn prop_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.props.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Name recorded on a callable, falling back to its kind.
    pub fn display_name(&self) -> String {
        self.prop(props::NAME)
            .and_then(|name| name.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("<{}>", self.type_name()))
    }

    // ========== Equality ==========

    /// Identity, except that numbers and strings compare by value.
    pub fn eq(&self, other: &Value) -> bool {
        if Value::ptr_eq(self, other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (ValueKind::Nil, ValueKind::Nil) | (ValueKind::True, ValueKind::True) => true,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Real(a), ValueKind::Real(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            _ => false,
        }
    }

    /// Structural equality; symbols compare by name.
    pub fn equal(&self, other: &Value) -> bool {
        if self.eq(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (ValueKind::Symbol(a), ValueKind::Symbol(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            (ValueKind::Nil, ValueKind::List(items)) | (ValueKind::List(items), ValueKind::Nil) => {
                items.borrow().is_empty()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ValueKind::Nil => write!(f, "nil"),
            ValueKind::True => write!(f, "t"),
            ValueKind::Int(n) => write!(f, "{}", n),
            ValueKind::Real(r) => write!(f, "{:?}", r),
            ValueKind::String(s) => write!(f, "{:?}", s),
            ValueKind::Symbol(name) => write!(f, "{}", name),
            ValueKind::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            ValueKind::Callable(Callable::Native(native)) => write!(f, "#<native {}>", native.name),
            ValueKind::Callable(_) => write!(f, "#<{} {}>", self.type_name(), self.display_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
