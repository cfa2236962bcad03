//! Special forms: natives that receive their arguments unevaluated.

use std::rc::Rc;

use alisp_diagnostic::ErrorCode;

use crate::bind::ParamSpec;
use crate::eval::Evaluator;
use crate::loader::ImportRequest;
use crate::signal::{Condition, EvalResult, Unwind, INTERRUPT_SIGNAL};
use crate::value::{props, Callable, Lambda, Value};

pub(crate) fn expect_arity(
    name: &str,
    args: &[Value],
    min: usize,
    max: Option<usize>,
) -> Result<(), Condition> {
    if args.len() < min || max.is_some_and(|max| args.len() > max) {
        let expected = match max {
            None => format!("at least {}", min),
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
        };
        return Err(Condition::argument(format!(
            "{}: expected {} arguments, got {}",
            name,
            expected,
            args.len()
        ))
        .with_code(ErrorCode::WrongArity));
    }
    Ok(())
}

fn invalid_form(message: impl Into<String>) -> Condition {
    Condition::argument(message).with_code(ErrorCode::InvalidForm)
}

fn type_mismatch(message: impl Into<String>) -> Condition {
    Condition::argument(message).with_code(ErrorCode::ArgumentTypeMismatch)
}

fn symbol_arg<'a>(form: &str, value: &'a Value) -> Result<&'a str, Condition> {
    value.symbol_name().ok_or_else(|| {
        invalid_form(format!("{}: expected a symbol, got `{}`", form, value))
    })
}

fn list_arg(form: &str, value: &Value) -> Result<Vec<Value>, Condition> {
    value
        .to_vec()
        .ok_or_else(|| invalid_form(format!("{}: expected a list, got `{}`", form, value)))
}

// ========== Quoting ==========

pub(crate) fn quote(_ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("quote", args, 1, Some(1))?;
    Ok(args[0].clone())
}

pub(crate) fn function(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("function", args, 1, Some(1))?;
    match args[0].symbol_name() {
        Some(name) => Ok(ev.env.find(name)),
        None => ev.eval(&args[0]),
    }
}

pub(crate) fn backquote(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("backquote", args, 1, Some(1))?;
    quasiquote(ev, &args[0])
}

/// The operand of `(marker x)`.
fn unquoted<'a>(items: &'a [Value], marker: &str) -> Option<&'a Value> {
    match items {
        [head, inner] if head.symbol_name() == Some(marker) => Some(inner),
        _ => None,
    }
}

fn quasiquote(ev: &mut Evaluator, form: &Value) -> EvalResult {
    if !form.is_list() {
        return Ok(form.clone());
    }
    let items = form.to_vec().unwrap_or_default();
    if let Some(inner) = unquoted(&items, "comma") {
        return ev.eval(inner);
    }

    let mut expanded = Vec::with_capacity(items.len());
    for item in &items {
        let spliced = match item.to_vec() {
            Some(inner) if item.is_list() => unquoted(&inner, "comma-at").cloned(),
            _ => None,
        };
        match spliced {
            Some(target) => {
                let value = ev.eval(&target)?;
                let values = value.to_vec().ok_or_else(|| {
                    Condition::eval(format!("`,@` expects a list, got `{}`", value))
                        .with_code(ErrorCode::InvalidForm)
                })?;
                expanded.extend(values);
            }
            None => expanded.push(quasiquote(ev, item)?),
        }
    }

    let result = Value::list(expanded);
    if let Some(line) = form.prop(props::LINE) {
        result.set_prop(props::LINE, line);
    }
    Ok(result)
}

// ========== Conditionals ==========

pub(crate) fn if_form(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("if", args, 2, None)?;
    if ev.eval(&args[0])?.is_truthy() {
        ev.eval(&args[1])
    } else {
        ev.eval_body(&args[2..])
    }
}

pub(crate) fn when(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("when", args, 1, None)?;
    if ev.eval(&args[0])?.is_truthy() {
        ev.eval_body(&args[1..])
    } else {
        Ok(Value::nil())
    }
}

pub(crate) fn unless(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("unless", args, 1, None)?;
    if ev.eval(&args[0])?.is_truthy() {
        Ok(Value::nil())
    } else {
        ev.eval_body(&args[1..])
    }
}

pub(crate) fn cond(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    for clause in args {
        let items = list_arg("cond", clause)?;
        let Some((test, body)) = items.split_first() else {
            return Err(invalid_form("cond: empty clause").into());
        };
        let value = ev.eval(test)?;
        if value.is_truthy() {
            return if body.is_empty() {
                Ok(value)
            } else {
                ev.eval_body(body)
            };
        }
    }
    Ok(Value::nil())
}

pub(crate) fn and(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    let mut result = Value::t();
    for arg in args {
        result = ev.eval(arg)?;
        if !result.is_truthy() {
            return Ok(Value::nil());
        }
    }
    Ok(result)
}

pub(crate) fn or(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    for arg in args {
        let value = ev.eval(arg)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
    Ok(Value::nil())
}

pub(crate) fn progn(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    ev.eval_body(args)
}

// ========== Bindings ==========

/// `(name init)`, `(name)` or `name`.
fn let_bindings(form: &str, spec: &Value) -> Result<Vec<(Rc<str>, Option<Value>)>, Condition> {
    list_arg(form, spec)?
        .iter()
        .map(|binding| {
            if let Some(name) = binding.symbol_name() {
                return Ok((Rc::from(name), None));
            }
            match binding.to_vec().as_deref() {
                Some([name]) => Ok((Rc::from(symbol_arg(form, name)?), None)),
                Some([name, init]) => Ok((Rc::from(symbol_arg(form, name)?), Some(init.clone()))),
                _ => Err(invalid_form(format!(
                    "{}: malformed binding `{}`",
                    form, binding
                ))),
            }
        })
        .collect()
}

/// Parallel `let`: every init sees the outer scope.
pub(crate) fn let_form(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("let", args, 1, None)?;
    let mut values = Vec::new();
    for (name, init) in let_bindings("let", &args[0])? {
        let value = match init {
            Some(init) => ev.eval(&init)?,
            None => Value::nil(),
        };
        values.push((name, value));
    }
    let mut scoped = ev.scoped();
    for (name, value) in values {
        scoped.env.put(name, value);
    }
    scoped.eval_body(&args[1..])
}

/// Sequential `let*`: each init sees the bindings before it.
pub(crate) fn let_star(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("let*", args, 1, None)?;
    let bindings = let_bindings("let*", &args[0])?;
    let mut scoped = ev.scoped();
    for (name, init) in bindings {
        let value = match init {
            Some(init) => scoped.eval(&init)?,
            None => Value::nil(),
        };
        scoped.env.put(name, value);
    }
    scoped.eval_body(&args[1..])
}

pub(crate) fn setq(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    if args.len() % 2 != 0 {
        return Err(invalid_form("setq: expected symbol/value pairs").into());
    }
    let mut result = Value::nil();
    for pair in args.chunks(2) {
        let name = symbol_arg("setq", &pair[0])?;
        result = ev.eval(&pair[1])?;
        ev.env.update(name, result.clone())?;
    }
    Ok(result)
}

// ========== Definitions ==========

fn define_value(ev: &mut Evaluator, args: &[Value], form: &str, constant: bool) -> EvalResult {
    expect_arity(form, args, 1, Some(3))?;
    let name = symbol_arg(form, &args[0])?;
    let value = match args.get(1) {
        Some(init) => ev.eval(init)?,
        None => Value::nil(),
    };
    let doc = match args.get(2) {
        Some(doc) => Some(doc.as_str().ok_or_else(|| {
            invalid_form(format!("{}: docstring must be a string", form))
        })?),
        None => None,
    };
    if constant {
        ev.env.define_constant(name, value, doc);
    } else {
        ev.env.define_variable(name, value, doc);
    }
    Ok(ev.intern(name))
}

pub(crate) fn defvar(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    define_value(ev, args, "defvar", false)
}

pub(crate) fn defconst(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    define_value(ev, args, "defconst", true)
}

/// Split a leading docstring off a body that has more forms after it.
fn split_doc(body: &[Value]) -> (Option<&str>, &[Value]) {
    match body {
        [doc, rest @ ..] if !rest.is_empty() => match doc.as_str() {
            Some(doc) => (Some(doc), rest),
            None => (None, body),
        },
        _ => (None, body),
    }
}

fn define_callable(ev: &mut Evaluator, args: &[Value], form: &str, is_macro: bool) -> EvalResult {
    expect_arity(form, args, 2, None)?;
    let name = symbol_arg(form, &args[0])?;
    let params = ParamSpec::parse(&args[1])?;
    let (doc, body) = split_doc(&args[2..]);
    let lambda = Lambda {
        params,
        body: body.to_vec(),
    };
    if is_macro {
        let value = Value::callable(Callable::Macro(lambda));
        ev.env.define_macro(name, value, doc);
    } else {
        let value = Value::callable(Callable::Function(lambda));
        ev.env.define_function(name, value, doc);
    }
    Ok(ev.intern(name))
}

pub(crate) fn defun(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    define_callable(ev, args, "defun", false)
}

pub(crate) fn defmacro(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    define_callable(ev, args, "defmacro", true)
}

/// An anonymous function closing over the current frame's bindings.
pub(crate) fn lambda(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("lambda", args, 1, None)?;
    let params = ParamSpec::parse(&args[0])?;
    let (doc, body) = split_doc(&args[1..]);
    let value = Value::callable(Callable::Function(Lambda {
        params,
        body: body.to_vec(),
    }));
    value.set_prop(props::NAME, Value::string("lambda"));
    value.set_prop(props::MODULE, Value::string(ev.env.active_module_name()));
    if let Some(doc) = doc {
        value.set_prop(props::DOC, Value::string(doc));
    }

    let captured = ev.env.frame_bindings();
    if !captured.is_empty() {
        let pairs = captured
            .into_iter()
            .map(|(name, bound)| Value::list(vec![ev.intern(&name), bound]))
            .collect();
        value.set_prop(props::CLOSURE, Value::list(pairs));
    }
    Ok(value)
}

// ========== Loops and jumps ==========

/// Run one iteration; `Ok(false)` when the body breaks out.
fn run_iteration(ev: &mut Evaluator, body: &[Value]) -> EvalResult<bool> {
    match ev.eval_body(body) {
        Ok(_) | Err(Unwind::Continue) => Ok(true),
        Err(Unwind::Break) => Ok(false),
        Err(other) => Err(other),
    }
}

pub(crate) fn while_form(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("while", args, 1, None)?;
    while ev.eval(&args[0])?.is_truthy() {
        let mut scoped = ev.scoped();
        if !run_iteration(&mut scoped, &args[1..])? {
            break;
        }
    }
    Ok(Value::nil())
}

/// `(VAR SOURCE [RESULT])` head of `dolist` and `dotimes`.
fn loop_spec<'a>(form: &str, spec: &'a [Value]) -> Result<(Rc<str>, &'a Value, Option<&'a Value>), Condition> {
    match spec {
        [var, source] => Ok((Rc::from(symbol_arg(form, var)?), source, None)),
        [var, source, result] => Ok((Rc::from(symbol_arg(form, var)?), source, Some(result))),
        _ => Err(invalid_form(format!(
            "{}: expected (VAR SOURCE [RESULT])",
            form
        ))),
    }
}

pub(crate) fn dolist(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("dolist", args, 1, None)?;
    let spec = list_arg("dolist", &args[0])?;
    let (var, source, result) = loop_spec("dolist", &spec)?;
    let source = ev.eval(source)?;
    let items = list_arg("dolist", &source)?;

    let mut scoped = ev.scoped();
    for item in items {
        scoped.env.put(var.clone(), item);
        if !run_iteration(&mut scoped, &args[1..])? {
            break;
        }
    }
    match result {
        Some(result) => {
            scoped.env.put(var, Value::nil());
            scoped.eval(result)
        }
        None => Ok(Value::nil()),
    }
}

pub(crate) fn dotimes(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("dotimes", args, 1, None)?;
    let spec = list_arg("dotimes", &args[0])?;
    let (var, count, result) = loop_spec("dotimes", &spec)?;
    let count = ev.eval(count)?;
    let count = count.as_int().ok_or_else(|| {
        type_mismatch(format!("dotimes: count must be an integer, got `{}`", count))
    })?;

    let mut scoped = ev.scoped();
    for i in 0..count.max(0) {
        scoped.env.put(var.clone(), Value::int(i));
        if !run_iteration(&mut scoped, &args[1..])? {
            break;
        }
    }
    match result {
        Some(result) => {
            scoped.env.put(var, Value::int(count.max(0)));
            scoped.eval(result)
        }
        None => Ok(Value::nil()),
    }
}

pub(crate) fn return_form(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("return", args, 0, Some(1))?;
    let value = match args.first() {
        Some(value) => ev.eval(value)?,
        None => Value::nil(),
    };
    Err(Unwind::Return(value))
}

pub(crate) fn break_form(_ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("break", args, 0, Some(0))?;
    Err(Unwind::Break)
}

pub(crate) fn continue_form(_ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("continue", args, 0, Some(0))?;
    Err(Unwind::Continue)
}

pub(crate) fn exit(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("exit", args, 0, Some(1))?;
    let code = match args.first() {
        Some(code) => {
            let code = ev.eval(code)?;
            let status = code.as_int().ok_or_else(|| {
                type_mismatch(format!("exit: status must be an integer, got `{}`", code))
            })?;
            i32::try_from(status).map_err(|_| {
                type_mismatch(format!("exit: status {} is out of range", status))
            })?
        }
        None => 0,
    };
    Err(Unwind::Exit(code))
}

// ========== Conditions ==========

/// `(condition-case VAR BODY (NAME HANDLER...)...)`
pub(crate) fn condition_case(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("condition-case", args, 2, None)?;
    let var: Option<Rc<str>> = if args[0].is_nil() {
        None
    } else {
        Some(Rc::from(symbol_arg("condition-case", &args[0])?))
    };

    let unwind = match ev.eval(&args[1]) {
        Ok(value) => return Ok(value),
        Err(unwind) => unwind,
    };
    let Some(name) = unwind.handler_name().map(str::to_string) else {
        return Err(unwind);
    };

    for handler in &args[2..] {
        let items = list_arg("condition-case", handler)?;
        let Some((head, body)) = items.split_first() else {
            return Err(invalid_form("condition-case: empty handler").into());
        };
        if handler_matches(head, &name) {
            ev.tracer.discard();
            let data = condition_data(ev, &unwind);
            let mut scoped = ev.scoped();
            if let Some(var) = var {
                scoped.env.put(var, data);
            }
            return scoped.eval_body(body);
        }
    }
    Err(unwind)
}

/// A handler head is a symbol or a quoted symbol.
fn handler_matches(head: &Value, name: &str) -> bool {
    if let Some(symbol) = head.symbol_name() {
        return symbol == name;
    }
    match head.to_vec().as_deref() {
        Some([quote, inner]) if quote.symbol_name() == Some("quote") => {
            inner.symbol_name() == Some(name)
        }
        _ => false,
    }
}

/// User signals expose their data list; other conditions `(name message)`.
fn condition_data(ev: &mut Evaluator, unwind: &Unwind) -> Value {
    match unwind {
        Unwind::Error(Condition::Signal { data, .. }) => data.clone(),
        Unwind::Error(condition) => Value::list(vec![
            ev.intern(condition.name()),
            Value::string(condition.message()),
        ]),
        Unwind::Interrupt => Value::list(vec![
            ev.intern(INTERRUPT_SIGNAL),
            Value::string("interrupted"),
        ]),
        _ => Value::nil(),
    }
}

// ========== Modules ==========

/// A bare symbol names itself; anything else is evaluated to a symbol or string.
fn name_arg(ev: &mut Evaluator, form: &str, raw: &Value) -> EvalResult<String> {
    if let Some(name) = raw.symbol_name()
        && !raw.is_keyword()
    {
        return Ok(name.to_string());
    }
    let value = ev.eval(raw)?;
    match (value.symbol_name(), value.as_str()) {
        (Some(name), _) | (None, Some(name)) => Ok(name.to_string()),
        _ => Err(type_mismatch(format!(
            "{}: expected a module name, got `{}`",
            form, value
        ))
        .into()),
    }
}

/// `(import MODULE [:all] [:as ALIAS] [:file PATH])`
pub(crate) fn import(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("import", args, 1, None)?;
    let mut request = ImportRequest::new(name_arg(ev, "import", &args[0])?);

    let mut options = args[1..].iter();
    while let Some(option) = options.next() {
        match option.symbol_name() {
            Some(":all") => request.all = true,
            Some(":as") => {
                let alias = options
                    .next()
                    .ok_or_else(|| invalid_form("import: `:as` needs a name"))?;
                request.alias = Some(name_arg(ev, "import", alias)?);
            }
            Some(":file") => {
                let file = options
                    .next()
                    .ok_or_else(|| invalid_form("import: `:file` needs a path"))?;
                let file = ev.eval(file)?;
                let path = file.as_str().ok_or_else(|| {
                    type_mismatch(format!("import: `:file` must be a string, got `{}`", file))
                })?;
                request.file = Some(path.to_string());
            }
            _ => {
                return Err(invalid_form(format!(
                    "import: unknown option `{}`",
                    option
                ))
                .into());
            }
        }
    }

    ev.import(&request)?;
    Ok(Value::t())
}

/// `(modref ALIAS... SYMBOL)`: a symbol from an imported module.
pub(crate) fn modref(ev: &mut Evaluator, args: &[Value]) -> EvalResult {
    expect_arity("modref", args, 2, None)?;
    let names = args
        .iter()
        .map(|arg| symbol_arg("modref", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (symbol, path) = names.split_last().ok_or_else(|| invalid_form("modref: empty"))?;

    let module = ev
        .env
        .resolve_alias_path(path.iter().copied())
        .ok_or_else(|| {
            Condition::module_reference(format!("no module `{}` is imported", path.join(".")))
        })?;
    let value = module.borrow().root.get(*symbol).cloned();
    value
        .ok_or_else(|| {
            Condition::module_reference(format!(
                "module `{}` has no symbol `{}`",
                path.join("."),
                symbol
            ))
            .into()
        })
}
