//! Integration tests for the callback queue and the evaluation lock.

use std::cell::Cell;
use std::rc::Rc;

use alisp_eval::{AsyncQueue, Evaluator, Unwind, Value};

fn eval(evaluator: &mut Evaluator, source: &str) -> Value {
    evaluator
        .eval_source(source, "<test>")
        .unwrap_or_else(|e| panic!("{}", e))
}

// ============================================================================
// 回调分发
// ============================================================================

#[test]
fn test_deferred_callback_runs_after_evaluation() {
    let mut evaluator = Evaluator::new();
    let during = eval(&mut evaluator, "(defvar n 0) (defer (lambda (v) (setq n v)) 42) n");
    assert_eq!(during.as_int(), Some(0));

    assert_eq!(evaluator.run_until_idle().unwrap(), 1);
    assert_eq!(eval(&mut evaluator, "n").as_int(), Some(42));
    assert!(!evaluator.callbacks().has_pending());
}

#[test]
fn test_dispatch_is_suspended_while_locked() {
    let mut evaluator = Evaluator::new();
    let callback = eval(&mut evaluator, "(defvar log (list)) (lambda (x) (push x log))");
    evaluator
        .callbacks_mut()
        .submit_callback(callback, vec![Value::int(1)]);

    {
        let mut locked = evaluator.lock();
        assert_eq!(locked.dispatch_callbacks().unwrap(), 0);
    }
    assert!(evaluator.callbacks().has_pending());

    assert_eq!(evaluator.dispatch_callbacks().unwrap(), 1);
    assert_eq!(eval(&mut evaluator, "log").to_string(), "(1)");
}

#[test]
fn test_run_until_idle_returns_while_locked() {
    let mut evaluator = Evaluator::new();
    eval(&mut evaluator, "(defvar n 0) (defer (lambda () (setq n 1)))");

    {
        let mut locked = evaluator.lock();
        assert_eq!(locked.run_until_idle().unwrap(), 0);
    }
    assert!(evaluator.callbacks().has_pending());
    assert_eq!(eval(&mut evaluator, "n").as_int(), Some(0));

    assert_eq!(evaluator.run_until_idle().unwrap(), 1);
    assert_eq!(eval(&mut evaluator, "n").as_int(), Some(1));
}

#[test]
fn test_defer_accepts_function_symbol() {
    let mut evaluator = Evaluator::new();
    eval(&mut evaluator, "(defvar got nil) (defun cb (x) (setq got x)) (defer 'cb 7)");
    assert_eq!(evaluator.run_until_idle().unwrap(), 1);
    assert_eq!(eval(&mut evaluator, "got").as_int(), Some(7));
}

#[test]
fn test_callbacks_run_in_submission_order() {
    let mut evaluator = Evaluator::new();
    eval(
        &mut evaluator,
        "(defvar log (list))
         (defun record (x) (push x log))
         (defer #'record 1)
         (defer #'record 2)
         (defer #'record 3)",
    );
    assert_eq!(evaluator.run_until_idle().unwrap(), 3);
    assert_eq!(eval(&mut evaluator, "log").to_string(), "(1 2 3)");
}

#[test]
fn test_callback_may_defer_more_work() {
    let mut evaluator = Evaluator::new();
    eval(
        &mut evaluator,
        "(defvar hops 0)
         (defun hop () (setq hops (+ hops 1)) (when (< hops 3) (defer #'hop)))
         (defer #'hop)",
    );
    assert_eq!(evaluator.run_until_idle().unwrap(), 3);
    assert_eq!(eval(&mut evaluator, "hops").as_int(), Some(3));
}

#[test]
fn test_callback_error_propagates() {
    let mut evaluator = Evaluator::new();
    eval(&mut evaluator, "(defer (lambda () (signal 'async-failure nil)))");
    let err = evaluator.run_until_idle().unwrap_err();
    assert_eq!(err.handler_name(), Some("async-failure"));
    assert!(!evaluator.is_locked());
}

#[test]
fn test_callback_exit_reaches_driver() {
    let mut evaluator = Evaluator::new();
    eval(&mut evaluator, "(defer (lambda () (exit 4)))");
    assert!(matches!(evaluator.run_until_idle(), Err(Unwind::Exit(4))));
}

#[test]
fn test_defer_requires_callable() {
    let mut evaluator = Evaluator::new();
    let err = evaluator.eval_source("(defer 1)", "<test>").unwrap_err();
    assert_eq!(err.handler_name(), Some("argument-signal"));
    let err = evaluator.eval_source("(defer :key)", "<test>").unwrap_err();
    assert_eq!(err.handler_name(), Some("argument-signal"));
}

// ============================================================================
// 异步队列
// ============================================================================

#[test]
fn test_queue_actions_submitted_during_spin_wait() {
    let mut queue = AsyncQueue::new();
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    queue.submit_action(Box::new(move |queue: &mut AsyncQueue| {
        counter.set(counter.get() + 1);
        let counter = counter.clone();
        queue.submit_action(Box::new(move |_: &mut AsyncQueue| counter.set(counter.get() + 1)));
    }));

    assert_eq!(queue.spin_once(), 1);
    assert_eq!(runs.get(), 1);
    assert!(queue.has_pending());
    assert_eq!(queue.spin_once(), 1);
    assert_eq!(runs.get(), 2);
    assert!(!queue.has_pending());
}

#[test]
fn test_queue_callbacks_fifo() {
    let mut queue = AsyncQueue::new();
    queue.submit_callback(Value::nil(), vec![Value::int(1)]);
    queue.submit_callback(Value::nil(), vec![Value::int(2)]);
    let first = queue.next_callback().unwrap();
    assert_eq!(first.args[0].as_int(), Some(1));
    assert_eq!(queue.next_callback().unwrap().args[0].as_int(), Some(2));
    assert!(queue.next_callback().is_none());
}
