//! Integration tests for parameter lists and argument binding.

use alisp_eval::{Environment, Evaluator, ParamSpec, Unwind, Value};

fn eval(source: &str) -> Result<Value, Unwind> {
    Evaluator::new().eval_source(source, "<test>")
}

fn show(source: &str) -> String {
    eval(source).map(|v| v.to_string()).unwrap_or_else(|e| panic!("{}", e))
}

fn is_argument_error(source: &str) -> bool {
    matches!(eval(source), Err(ref e) if e.handler_name() == Some("argument-signal"))
}

/// Build a parameter list value from symbol names.
fn params(names: &[&str]) -> Value {
    let mut evaluator = Evaluator::new();
    Value::list(names.iter().map(|name| evaluator.intern(name)).collect())
}

const SIGNATURE: &str = "(defun f (a b &optional c &rest d) (list a b c d))";

// ============================================================================
// 参数绑定
// ============================================================================

#[test]
fn test_required_and_optional_defaults() {
    assert_eq!(show(&format!("{} (f 1 2)", SIGNATURE)), "(1 2 nil ())");
}

#[test]
fn test_rest_collects_trailing_arguments() {
    assert_eq!(show(&format!("{} (f 1 2 3 4 5)", SIGNATURE)), "(1 2 3 (4 5))");
    assert_eq!(show(&format!("{} (f 1 2 3)", SIGNATURE)), "(1 2 3 ())");
}

#[test]
fn test_too_few_arguments() {
    assert!(is_argument_error(&format!("{} (f 1)", SIGNATURE)));
}

#[test]
fn test_too_many_arguments_without_rest() {
    assert!(is_argument_error("(defun g (a &optional b) (list a b)) (g 1 2 3)"));
    assert_eq!(show("(defun g (a &optional b) (list a b)) (g 1)"), "(1 nil)");
}

#[test]
fn test_empty_parameter_list() {
    assert_eq!(show("(defun k () 7) (k)"), "7");
    assert!(is_argument_error("(defun k () 7) (k 1)"));
    assert_eq!(show("(defun k nil 8) (k)"), "8");
}

#[test]
fn test_rest_list_is_fresh() {
    assert_eq!(
        show("(defvar xs (list 1 2)) (defun r (&rest args) args) (eq (apply 'r xs) xs)"),
        "nil"
    );
}

#[test]
fn test_arity_message_names_function() {
    let err = eval("(defun named (a) a) (named)").unwrap_err();
    assert!(err.to_string().contains("named"));
}

// ============================================================================
// 参数列表校验
// ============================================================================

#[test]
fn test_malformed_lists_rejected_at_definition() {
    assert!(is_argument_error("(defun h (a &optional) a)"));
    assert!(is_argument_error("(defun h (a &rest) a)"));
    assert!(is_argument_error("(defun h (&rest a b) a)"));
    assert!(is_argument_error("(defun h (&rest a &optional b) a)"));
    assert!(is_argument_error("(defun h (&optional &rest a) a)"));
    assert!(is_argument_error("(defun h (&optional a &optional b) a)"));
    assert!(is_argument_error("(defun h (a 1) a)"));
    assert!(is_argument_error("(defun h x x)"));
    assert!(is_argument_error("(lambda (&rest) 1)"));
}

#[test]
fn test_param_spec_parse() {
    let spec = ParamSpec::parse(&params(&["a", "&optional", "b", "c", "&rest", "d"])).unwrap();
    assert_eq!(spec.required.len(), 1);
    assert_eq!(spec.optional.len(), 2);
    assert_eq!(spec.rest.as_deref(), Some("d"));
    assert_eq!(spec.arity(), (1, None));
    assert_eq!(spec.to_string(), "(a &optional b c &rest d)");
}

#[test]
fn test_param_spec_arity_bounds() {
    let spec = ParamSpec::parse(&params(&["a", "&optional", "b"])).unwrap();
    assert_eq!(spec.arity(), (1, Some(2)));
    assert_eq!(ParamSpec::parse(&Value::nil()).unwrap().arity(), (0, Some(0)));
}

#[test]
fn test_param_spec_bind_into_scope() {
    let spec = ParamSpec::parse(&params(&["a", "&rest", "more"])).unwrap();
    let mut env = Environment::new();
    spec.bind(&mut env, "f", &[Value::int(1), Value::int(2), Value::int(3)])
        .unwrap();
    assert_eq!(env.lookup("a").and_then(|v| v.as_int()), Some(1));
    assert_eq!(env.lookup("more").map(|v| v.to_string()).as_deref(), Some("(2 3)"));
}
