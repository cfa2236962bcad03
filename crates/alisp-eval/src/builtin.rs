//! Built-in natives and the callback driver.

use std::cmp::Ordering;

use alisp_diagnostic::ErrorCode;

use crate::callbacks::AsyncQueue;
use crate::eval::Evaluator;
use crate::forms;
use crate::signal::{Condition, EvalResult};
use crate::value::{ArgType, NativeFn, Signature, Value, ValueKind};

use ArgType::{Any, Function, Int, List, Number, String as Str, Symbol};

/// Register every native in the prime table.
pub(crate) fn install(evaluator: &mut Evaluator) {
    for native in natives() {
        evaluator.define_native(native);
    }
}

/// A native receiving unevaluated argument forms.
const fn special(name: &'static str, func: fn(&mut Evaluator, &[Value]) -> EvalResult) -> NativeFn {
    NativeFn {
        name,
        signature: None,
        func,
    }
}

/// A native receiving evaluated, type-checked arguments.
const fn eager(
    name: &'static str,
    signature: Signature,
    func: fn(&mut Evaluator, &[Value]) -> EvalResult,
) -> NativeFn {
    NativeFn {
        name,
        signature: Some(signature),
        func,
    }
}

/// Get all built-in natives.
pub fn natives() -> Vec<NativeFn> {
    vec![
        // === Special forms ===
        special("quote", forms::quote),
        special("function", forms::function),
        special("backquote", forms::backquote),
        special("if", forms::if_form),
        special("when", forms::when),
        special("unless", forms::unless),
        special("cond", forms::cond),
        special("and", forms::and),
        special("or", forms::or),
        special("progn", forms::progn),
        special("let", forms::let_form),
        special("let*", forms::let_star),
        special("setq", forms::setq),
        special("defvar", forms::defvar),
        special("defconst", forms::defconst),
        special("defun", forms::defun),
        special("defmacro", forms::defmacro),
        special("lambda", forms::lambda),
        special("while", forms::while_form),
        special("dolist", forms::dolist),
        special("dotimes", forms::dotimes),
        special("return", forms::return_form),
        special("break", forms::break_form),
        special("continue", forms::continue_form),
        special("exit", forms::exit),
        special("condition-case", forms::condition_case),
        special("import", forms::import),
        special("modref", forms::modref),

        // === Evaluation ===
        eager("funcall", Signature::variadic(&[Any], Any), |ev, args| {
            ev.apply(&args[0], args[1..].to_vec())
        }),
        eager("apply", Signature::variadic(&[Any], Any), |ev, args| {
            let mut call_args = Vec::new();
            if let Some((last, init)) = args[1..].split_last() {
                call_args.extend_from_slice(init);
                let spread = last.to_vec().ok_or_else(|| {
                    Condition::argument(format!("apply: last argument must be a list, got `{}`", last))
                        .with_code(ErrorCode::ArgumentTypeMismatch)
                })?;
                call_args.extend(spread);
            }
            ev.apply(&args[0], call_args)
        }),
        eager("eval", Signature::fixed(&[Any]), |ev, args| ev.eval(&args[0])),
        eager("set", Signature::fixed(&[Symbol, Any]), |ev, args| {
            let name = args[0].symbol_name().unwrap_or_default();
            ev.env.update(name, args[1].clone())?;
            Ok(args[1].clone())
        }),
        eager("signal", Signature::fixed(&[Symbol, Any]), |_ev, args| {
            Err(Condition::Signal {
                name: args[0].symbol_name().unwrap_or_default().to_string(),
                data: args[1].clone(),
            }
            .into())
        }),

        // === Lists ===
        eager("list", Signature::variadic(&[], Any), |_ev, args| {
            Ok(Value::list(args.to_vec()))
        }),
        eager("length", Signature::fixed(&[Any]), |_ev, args| {
            let len = match args[0].kind() {
                ValueKind::Nil => 0,
                ValueKind::List(items) => items.borrow().len(),
                ValueKind::String(s) => s.chars().count(),
                _ => {
                    return Err(Condition::argument(format!(
                        "length: expected a list or string, got {}",
                        args[0].type_name()
                    ))
                    .with_code(ErrorCode::ArgumentTypeMismatch)
                    .into());
                }
            };
            Ok(Value::int(len as i64))
        }),
        eager("nth", Signature::fixed(&[Int, List]), |_ev, args| {
            let index = args[0].as_int().unwrap_or_default();
            let items = args[1].to_vec().unwrap_or_default();
            Ok(usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_else(Value::nil))
        }),
        eager("push", Signature::fixed(&[Any, List]), |_ev, args| {
            let Some(mut items) = args[1].items_mut() else {
                return Err(Condition::argument("push: cannot push onto nil")
                    .with_code(ErrorCode::ArgumentTypeMismatch)
                    .into());
            };
            items.push(args[0].clone());
            drop(items);
            Ok(args[1].clone())
        }),

        // === Predicates ===
        eager("null", Signature::fixed(&[Any]), |_ev, args| {
            Ok(Value::bool(!args[0].is_truthy()))
        }),
        eager("not", Signature::fixed(&[Any]), |_ev, args| {
            Ok(Value::bool(!args[0].is_truthy()))
        }),
        eager("eq", Signature::fixed(&[Any, Any]), |_ev, args| {
            Ok(Value::bool(args[0].eq(&args[1])))
        }),
        eager("equal", Signature::fixed(&[Any, Any]), |_ev, args| {
            Ok(Value::bool(args[0].equal(&args[1])))
        }),
        eager("type-of", Signature::fixed(&[Any]), |ev, args| {
            Ok(ev.intern(args[0].type_name()))
        }),

        // === Symbols ===
        eager("intern", Signature::fixed(&[Str]), |ev, args| {
            Ok(ev.intern(args[0].as_str().unwrap_or_default()))
        }),
        eager("make-symbol", Signature::fixed(&[Str]), |_ev, args| {
            Ok(Value::uninterned_symbol(args[0].as_str().unwrap_or_default()))
        }),
        eager("sym-list", Signature::fixed(&[]), |ev, _args| {
            let names = ev.env.root_symbols();
            Ok(Value::list(names.iter().map(|name| ev.intern(name)).collect()))
        }),

        // === Arithmetic ===
        eager("+", Signature::variadic(&[], Number), |_ev, args| {
            fold_numbers("+", args, Num::Int(0), false)
        }),
        eager("*", Signature::variadic(&[], Number), |_ev, args| {
            fold_numbers("*", args, Num::Int(1), false)
        }),
        eager("-", Signature::variadic(&[], Number), |_ev, args| {
            fold_numbers("-", args, Num::Int(0), true)
        }),
        eager("/", Signature::variadic(&[Number], Number), |_ev, args| {
            fold_numbers("/", args, Num::Int(1), true)
        }),

        // === Comparison ===
        eager("<", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_lt)
        }),
        eager("<=", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_le)
        }),
        eager(">", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_gt)
        }),
        eager(">=", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_ge)
        }),
        eager("==", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_eq)
        }),
        eager("!=", Signature::variadic(&[Number], Number), |_ev, args| {
            compare_chain(args, Ordering::is_ne)
        }),

        // === Properties ===
        eager("prop-set", Signature::fixed(&[Any, Str, Any]), |_ev, args| {
            if args[0].is_sentinel() {
                return Err(Condition::argument(format!(
                    "prop-set: `{}` cannot carry properties",
                    args[0]
                ))
                .with_code(ErrorCode::ArgumentTypeMismatch)
                .into());
            }
            args[0].set_prop(args[1].as_str().unwrap_or_default(), args[2].clone());
            Ok(args[2].clone())
        }),
        eager("prop-get", Signature::fixed(&[Any, Str]), |_ev, args| {
            Ok(args[0]
                .prop(args[1].as_str().unwrap_or_default())
                .unwrap_or_else(Value::nil))
        }),
        eager("prop-exists", Signature::fixed(&[Any, Str]), |_ev, args| {
            Ok(Value::bool(args[0].has_prop(args[1].as_str().unwrap_or_default())))
        }),
        eager("prop-list", Signature::fixed(&[Any]), |_ev, args| {
            Ok(Value::list(
                args[0].prop_names().into_iter().map(Value::string).collect(),
            ))
        }),
        eager("prop-remove", Signature::fixed(&[Any, Str]), |_ev, args| {
            Ok(args[0]
                .remove_prop(args[1].as_str().unwrap_or_default())
                .unwrap_or_else(Value::nil))
        }),

        // === I/O and async ===
        eager("println", Signature::variadic(&[], Any), |_ev, args| {
            let line = args
                .iter()
                .map(|arg| match arg.as_str() {
                    Some(s) => s.to_string(),
                    None => arg.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            println!("{}", line);
            Ok(Value::nil())
        }),
        eager("defer", Signature::variadic(&[Function], Any), |ev, args| {
            let callable = args[0].clone();
            let call_args = args[1..].to_vec();
            ev.callbacks
                .submit_action(Box::new(move |queue: &mut AsyncQueue| {
                    queue.submit_callback(callable, call_args);
                }));
            Ok(Value::t())
        }),
    ]
}

// ========== Numbers ==========

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Real(f64),
}

impl Num {
    fn of(value: &Value) -> Num {
        match value.kind() {
            ValueKind::Int(n) => Num::Int(*n),
            ValueKind::Real(r) => Num::Real(*r),
            _ => Num::Int(0),
        }
    }

    fn to_real(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Real(r) => r,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::int(n),
            Num::Real(r) => Value::real(r),
        }
    }
}

/// Fold `args` with `op`. `from_first` starts from the first argument when
/// there are several, and from `identity` for a single one (negation, inverse).
fn fold_numbers(op: &str, args: &[Value], identity: Num, from_first: bool) -> EvalResult {
    let (mut acc, rest) = match args.split_first() {
        Some((first, rest)) if from_first && !rest.is_empty() => (Num::of(first), rest),
        _ => (identity, args),
    };
    for arg in rest {
        acc = arith(op, acc, Num::of(arg))?;
    }
    Ok(acc.into_value())
}

fn division_by_zero() -> Condition {
    Condition::eval("division by zero").with_code(ErrorCode::DivisionByZero)
}

fn arith(op: &str, a: Num, b: Num) -> Result<Num, Condition> {
    let overflow = || Condition::eval(format!("integer overflow in `{}`", op));
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => {
            let result = match op {
                "+" => a.checked_add(b),
                "-" => a.checked_sub(b),
                "*" => a.checked_mul(b),
                _ if b == 0 => return Err(division_by_zero()),
                _ => a.checked_div(b),
            };
            result.map(Num::Int).ok_or_else(overflow)
        }
        (a, b) => {
            let (a, b) = (a.to_real(), b.to_real());
            Ok(Num::Real(match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                _ if b == 0.0 => return Err(division_by_zero()),
                _ => a / b,
            }))
        }
    }
}

fn compare(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_real().partial_cmp(&b.to_real()),
    }
}

/// True when every adjacent pair satisfies `holds`.
fn compare_chain(args: &[Value], holds: fn(Ordering) -> bool) -> EvalResult {
    let ok = args
        .windows(2)
        .all(|pair| compare(Num::of(&pair[0]), Num::of(&pair[1])).is_some_and(holds));
    Ok(Value::bool(ok))
}

// ========== Callback driver ==========

impl Evaluator {
    /// Invoke every ready completion callback.
    ///
    /// Does nothing while an evaluation unit holds the lock; each callback
    /// runs as its own locked unit. Returns the number of callbacks run.
    pub fn dispatch_callbacks(&mut self) -> EvalResult<usize> {
        if self.is_locked() {
            return Ok(0);
        }
        let mut count = 0;
        while let Some(pending) = self.callbacks.next_callback() {
            let mut locked = self.lock();
            locked.apply(&pending.callable, pending.args)?;
            count += 1;
        }
        Ok(count)
    }

    /// Spin the queue and dispatch until nothing is pending.
    ///
    /// Returns 0 without spinning while the lock is held, since no callback
    /// could be dispatched until the current unit finishes.
    pub fn run_until_idle(&mut self) -> EvalResult<usize> {
        if self.is_locked() {
            return Ok(0);
        }
        let mut total = 0;
        while self.callbacks.has_pending() {
            self.callbacks.spin_once();
            total += self.dispatch_callbacks()?;
        }
        Ok(total)
    }

    pub fn callbacks(&self) -> &AsyncQueue {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut AsyncQueue {
        &mut self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integral() {
        let sum = fold_numbers("+", &[Value::int(2), Value::int(3)], Num::Int(0), false).unwrap();
        assert_eq!(sum.as_int(), Some(5));
        let quotient = fold_numbers("/", &[Value::int(7), Value::int(2)], Num::Int(1), true).unwrap();
        assert_eq!(quotient.as_int(), Some(3));
    }

    #[test]
    fn reals_are_contagious() {
        let sum = fold_numbers("+", &[Value::int(1), Value::real(0.5)], Num::Int(0), false).unwrap();
        assert_eq!(sum.as_real(), Some(1.5));
    }

    #[test]
    fn unary_minus_negates() {
        let neg = fold_numbers("-", &[Value::int(4)], Num::Int(0), true).unwrap();
        assert_eq!(neg.as_int(), Some(-4));
    }

    #[test]
    fn overflow_is_reported() {
        let err = arith("*", Num::Int(i64::MAX), Num::Int(2)).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn every_native_has_a_unique_name() {
        let mut names: Vec<_> = natives().iter().map(|n| n.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
