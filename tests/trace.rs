//! Integration tests for call-stack tracing.

use std::fs;

use alisp_eval::Evaluator;

const NESTED: &str = "(defun inner ()
  (signal 'boom nil))
(defun outer ()
  (inner))
(outer)";

#[test]
fn test_backtrace_of_uncaught_error() {
    let mut evaluator = Evaluator::new();
    assert!(evaluator.eval_source(NESTED, "<test>").is_err());

    let frames = evaluator.take_backtrace().expect("a backtrace");
    let names: Vec<&str> = frames.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["signal", "inner", "outer"]);
    let lines: Vec<Option<u32>> = frames.iter().map(|f| f.line).collect();
    assert_eq!(lines, vec![Some(2), Some(4), Some(5)]);
    assert!(frames[0].native);
    assert!(!frames[1].native);

    // Taking it clears it.
    assert!(evaluator.take_backtrace().is_none());
}

#[test]
fn test_handled_error_leaves_no_backtrace() {
    let mut evaluator = Evaluator::new();
    let source = format!("{}\n(condition-case e (outer) (boom 'handled))", NESTED.trim_end_matches("(outer)"));
    let value = evaluator.eval_source(&source, "<test>").unwrap();
    assert_eq!(value.to_string(), "handled");
    assert!(evaluator.take_backtrace().is_none());
}

#[test]
fn test_error_after_handled_error_is_traced() {
    let mut evaluator = Evaluator::new();
    let source = "(defun fail () (signal 'late nil))
                  (condition-case e (fail) (late nil))
                  (fail)";
    assert!(evaluator.eval_source(source, "<test>").is_err());
    let frames = evaluator.take_backtrace().expect("a backtrace");
    assert_eq!(frames[1].name, "fail");
}

#[test]
fn test_frames_record_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.al");
    fs::write(&path, "(defun f () (/ 1 0))\n(f)\n").unwrap();

    let mut evaluator = Evaluator::new();
    assert!(evaluator.eval_file(&path).is_err());
    let frames = evaluator.take_backtrace().expect("a backtrace");
    let file = frames[0].file.clone().unwrap_or_default();
    assert!(file.ends_with("main.al"));
    assert_eq!(frames[0].to_string(), format!("/ [native] at {}:1", file));
}

#[test]
fn test_tracing_does_not_change_results() {
    let mut evaluator = Evaluator::new();
    let value = evaluator
        .eval_source("(defun f (x) (* x 2)) (f (f 3))", "<test>")
        .unwrap();
    assert_eq!(value.as_int(), Some(12));
    assert!(evaluator.take_backtrace().is_none());
}
