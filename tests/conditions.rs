//! Integration tests for conditions, handlers and limits.

use std::sync::atomic::Ordering;

use alisp_diagnostic::ErrorCode;
use alisp_eval::{
    Condition, Evaluator, Limits, NativeFn, Signature, Unwind, Value, INTERRUPT_SIGNAL,
    PARSER_SIGNAL,
};

fn eval(source: &str) -> Result<Value, Unwind> {
    Evaluator::new().eval_source(source, "<test>")
}

fn show(source: &str) -> String {
    eval(source).map(|v| v.to_string()).unwrap_or_else(|e| panic!("{}", e))
}

fn error_code(source: &str) -> Option<ErrorCode> {
    match eval(source) {
        Err(unwind) => unwind.condition().and_then(Condition::code),
        Ok(value) => panic!("`{}` evaluated to {}", source, value),
    }
}

/// A native that raises the interrupt flag, as a signal handler would.
fn with_interrupt_native() -> Evaluator {
    let mut evaluator = Evaluator::new();
    evaluator.define_native(NativeFn {
        name: "raise-interrupt",
        signature: Some(Signature::fixed(&[])),
        func: |ev, _args| {
            ev.interrupt_handle().store(true, Ordering::SeqCst);
            Ok(Value::nil())
        },
    });
    evaluator
}

// ============================================================================
// 用户信号
// ============================================================================

#[test]
fn test_handler_receives_signal_data() {
    assert_eq!(show("(condition-case err (signal 'boom '(1 2)) (boom err))"), "(1 2)");
}

#[test]
fn test_quoted_handler_name() {
    assert_eq!(show("(condition-case e (signal 'boom 1) ('boom e))"), "1");
}

#[test]
fn test_first_matching_handler_wins() {
    assert_eq!(
        show("(condition-case e (signal 'b nil) (a 'first) (b 'second) (b 'third))"),
        "second"
    );
}

#[test]
fn test_unmatched_signal_propagates() {
    match eval("(condition-case e (signal 'boom 1) (other 2))") {
        Err(Unwind::Error(Condition::Signal { name, data })) => {
            assert_eq!(name, "boom");
            assert_eq!(data.as_int(), Some(1));
        }
        other => panic!("expected boom, got {:?}", other),
    }
}

#[test]
fn test_body_value_when_nothing_raised() {
    assert_eq!(show("(condition-case e (+ 1 2) (boom 0))"), "3");
}

#[test]
fn test_nil_variable_binds_nothing() {
    assert_eq!(show("(condition-case nil (signal 'x 1) (x 'ok))"), "ok");
}

#[test]
fn test_failing_handler_raises_new_condition() {
    match eval("(condition-case e (signal 'a 1) (a (signal 'b 2)))") {
        Err(Unwind::Error(Condition::Signal { name, .. })) => assert_eq!(name, "b"),
        other => panic!("expected b, got {:?}", other),
    }
}

#[test]
fn test_handler_scope_is_popped() {
    assert_eq!(show("(condition-case e (signal 'a 1) (a e)) e"), "nil");
}

// ============================================================================
// 内置条件
// ============================================================================

#[test]
fn test_internal_condition_data() {
    assert_eq!(
        show("(condition-case e (/ 1 0) (eval-signal e))"),
        "(eval-signal \"division by zero\")"
    );
}

#[test]
fn test_catching_argument_errors() {
    assert_eq!(show("(condition-case e (nth \"x\" '(1)) (argument-signal 'caught))"), "caught");
}

#[test]
fn test_catching_environment_errors() {
    assert_eq!(show("(condition-case e (setq nope 1) (environment-signal 'caught))"), "caught");
}

#[test]
fn test_catching_module_errors() {
    assert_eq!(show("(condition-case e (import 'missing-module) (module-signal 'caught))"), "caught");
}

#[test]
fn test_condition_names() {
    assert_eq!(Condition::eval("x").name(), "eval-signal");
    assert_eq!(Condition::argument("x").name(), "argument-signal");
    assert_eq!(Condition::environment("x").name(), "environment-signal");
    assert_eq!(Condition::module("x").name(), "module-signal");
    assert_eq!(Condition::module_reference("x").name(), "module-reference-signal");
}

#[test]
fn test_condition_diagnostic_codes() {
    let diagnostic = Condition::environment("unbound")
        .with_code(ErrorCode::UnboundSymbol)
        .to_diagnostic(Default::default());
    assert_eq!(diagnostic.code, Some(ErrorCode::UnboundSymbol));
    assert_eq!(diagnostic.message, "unbound");
    assert!(Condition::eval("plain").to_diagnostic(Default::default()).code.is_none());
}

#[test]
fn test_raised_conditions_carry_codes() {
    assert_eq!(error_code("(/ 1 0)"), Some(ErrorCode::DivisionByZero));
    assert_eq!(error_code("(/ 1.0 0)"), Some(ErrorCode::DivisionByZero));
    assert_eq!(error_code("(defconst k 1) (setq k 2)"), Some(ErrorCode::ConstantBinding));
    assert_eq!(error_code("(setq ghost 1)"), Some(ErrorCode::UnboundSymbol));
    assert_eq!(error_code("(1 2)"), Some(ErrorCode::NotCallable));
    assert_eq!(error_code("(defun f (x) x) (f)"), Some(ErrorCode::WrongArity));
    assert_eq!(error_code("(length)"), Some(ErrorCode::WrongArity));
    assert_eq!(error_code("(defun f (&rest) 1)"), Some(ErrorCode::MalformedParameterList));
    assert_eq!(error_code("(nth \"x\" '(1))"), Some(ErrorCode::ArgumentTypeMismatch));
    assert_eq!(error_code("(cond ())"), Some(ErrorCode::InvalidForm));
    assert_eq!(error_code("(import 'nowhere)"), Some(ErrorCode::ModuleNotFound));
    assert_eq!(error_code("(signal 'custom nil)"), Some(ErrorCode::UncaughtSignal));
}

// ============================================================================
// 不可捕获的信号
// ============================================================================

#[test]
fn test_exit_is_not_caught() {
    assert!(matches!(
        eval("(condition-case e (exit 2) (eval-signal 1))"),
        Err(Unwind::Exit(2))
    ));
}

#[test]
fn test_loop_signals_pass_through_handlers() {
    assert_eq!(
        show("(defvar n 0) (while t (setq n (+ n 1)) (condition-case e (break) (eval-signal 1))) n"),
        "1"
    );
}

#[test]
fn test_interrupt_unwinds_evaluation() {
    let mut evaluator = with_interrupt_native();
    let result = evaluator.eval_source("(progn (raise-interrupt) 1)", "<test>");
    assert!(matches!(result, Err(Unwind::Interrupt)));
    // The flag is consumed.
    assert_eq!(evaluator.eval_source("2", "<test>").unwrap().as_int(), Some(2));
}

#[test]
fn test_interrupt_needs_explicit_handler() {
    let mut evaluator = with_interrupt_native();
    let caught = evaluator
        .eval_source(
            "(condition-case e (progn (raise-interrupt) 1) (interrupt-signal (nth 0 e)))",
            "<test>",
        )
        .unwrap();
    assert_eq!(caught.symbol_name(), Some(INTERRUPT_SIGNAL));

    let uncaught = evaluator.eval_source(
        "(condition-case e (progn (raise-interrupt) 1) (eval-signal 'no))",
        "<test>",
    );
    assert!(matches!(uncaught, Err(Unwind::Interrupt)));
}

#[test]
fn test_interrupt_flag_from_other_thread() {
    let mut evaluator = Evaluator::new();
    let handle = evaluator.interrupt_handle();
    std::thread::spawn(move || handle.store(true, Ordering::SeqCst))
        .join()
        .unwrap();
    assert!(matches!(evaluator.eval_source("1", "<test>"), Err(Unwind::Interrupt)));
}

// ============================================================================
// 解析错误
// ============================================================================

#[test]
fn test_parse_error_condition() {
    match eval("(+ 1\n  (oops") {
        Err(Unwind::Error(Condition::Parse { file, line, code, .. })) => {
            assert_eq!(file, "<test>");
            assert_eq!(line, 2);
            assert_eq!(code, Some(ErrorCode::UnclosedDelimiter));
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_parse_error_handler_name() {
    let err = eval("(a))").unwrap_err();
    assert_eq!(err.handler_name(), Some(PARSER_SIGNAL));
}

#[test]
fn test_eval_of_bad_source_is_catchable() {
    let mut evaluator = Evaluator::new();
    evaluator.define_native(NativeFn {
        name: "eval-string",
        signature: Some(Signature::fixed(&[alisp_eval::ArgType::String])),
        func: |ev, args| {
            let source = args[0].as_str().unwrap_or_default().to_string();
            ev.eval_source(&source, "<string>")
        },
    });
    let value = evaluator
        .eval_source("(condition-case e (eval-string \"(1\") (parser-signal 'bad-syntax))", "<test>")
        .unwrap();
    assert_eq!(value.to_string(), "bad-syntax");
}

// ============================================================================
// 深度限制
// ============================================================================

#[test]
fn test_call_depth_limit() {
    let mut evaluator = Evaluator::new().with_limits(Limits::default().with_max_call_depth(50));
    let err = evaluator
        .eval_source("(defun r (n) (r (+ n 1))) (r 0)", "<test>")
        .unwrap_err();
    assert!(err.to_string().contains("call depth"));
    assert_eq!(err.condition().and_then(Condition::code), Some(ErrorCode::DepthExceeded));
    assert_eq!(evaluator.env().call_depth(), 0);
    assert_eq!(evaluator.eval_source("(+ 1 2)", "<test>").unwrap().as_int(), Some(3));
}

#[test]
fn test_eval_depth_limit() {
    let mut evaluator = Evaluator::new().with_limits(Limits::default().with_max_eval_depth(20));
    let mut source = String::from("1");
    for _ in 0..30 {
        source = format!("(+ 1 {})", source);
    }
    let err = evaluator.eval_source(&source, "<test>").unwrap_err();
    assert!(err.to_string().contains("evaluation depth"));
    assert_eq!(evaluator.eval_source("(+ 1 2)", "<test>").unwrap().as_int(), Some(3));
}

#[test]
fn test_depth_errors_are_catchable() {
    let mut evaluator = Evaluator::new().with_limits(Limits::default().with_max_call_depth(30));
    let value = evaluator
        .eval_source(
            "(defun r () (r)) (condition-case e (r) (eval-signal 'too-deep))",
            "<test>",
        )
        .unwrap();
    assert_eq!(value.to_string(), "too-deep");
}

#[test]
fn test_deep_recursion_within_default_limits() {
    assert_eq!(
        show("(defun count (n) (if (== n 0) 0 (+ 1 (count (- n 1))))) (count 3000)"),
        "3000"
    );
}
