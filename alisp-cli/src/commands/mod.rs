//! CLI command implementations.

pub mod eval;
pub mod repl;
pub mod run;

use std::path::PathBuf;

use alisp_diagnostic::{emit, Diagnostic, DiagnosticKind, ErrorCode};
use alisp_eval::{Condition, Evaluator, Limits, Unwind};
use signal_hook::consts::signal::SIGINT;

use crate::output;

/// Colon-separated module directories searched after `-I`.
pub const PATH_VAR: &str = "ALISP_PATH";

/// Exit status for an evaluation interrupted by the user.
const INTERRUPTED_STATUS: i32 = 130;

/// Settings shared by every command.
pub struct Options {
    pub quiet: bool,
    pub include: Vec<PathBuf>,
    pub max_call_depth: Option<usize>,
    pub max_eval_depth: Option<usize>,
}

/// Build an evaluator configured from the command line and environment.
pub fn evaluator(options: &Options) -> Evaluator {
    let mut limits = Limits::default();
    if let Some(depth) = options.max_call_depth {
        limits = limits.with_max_call_depth(depth);
    }
    if let Some(depth) = options.max_eval_depth {
        limits = limits.with_max_eval_depth(depth);
    }

    let mut evaluator = Evaluator::new().with_limits(limits);
    for dir in &options.include {
        evaluator.add_module_path(dir);
    }
    if let Some(paths) = std::env::var_os(PATH_VAR) {
        for dir in std::env::split_paths(&paths) {
            evaluator.add_module_path(dir);
        }
    }
    tracing::debug!(paths = ?evaluator.module_paths(), "module search path");

    // Ctrl-C raises `interrupt-signal` at the next evaluation step.
    if let Err(err) = signal_hook::flag::register(SIGINT, evaluator.interrupt_handle()) {
        tracing::warn!(error = %err, "failed to register the SIGINT handler");
    }
    evaluator
}

/// Report an unwind that escaped to the top level; returns the exit status.
pub fn report(evaluator: &mut Evaluator, unwind: Unwind, source: &str, name: &str, quiet: bool) -> i32 {
    let backtrace = evaluator.take_backtrace();
    let status = match &unwind {
        Unwind::Exit(code) => return *code,
        Unwind::Interrupt => INTERRUPTED_STATUS,
        _ => 1,
    };
    if quiet {
        return status;
    }

    let rendered = match &unwind {
        Unwind::Error(Condition::Parse { file, .. }) if file != name => {
            output::error(&unwind.to_string());
            Ok(())
        }
        Unwind::Error(condition) => emit(source, name, &condition.to_diagnostic(evaluator.unit_span())),
        Unwind::Interrupt => {
            output::error("interrupted");
            Ok(())
        }
        other => {
            let diagnostic = Diagnostic::error(DiagnosticKind::Eval, evaluator.unit_span(), other.to_string())
                .with_code(ErrorCode::StrayControlFlow);
            emit(source, name, &diagnostic)
        }
    };
    if rendered.is_err() {
        output::error(&unwind.to_string());
    }

    for frame in backtrace.unwrap_or_default() {
        output::trace_line(&frame.to_string());
    }
    status
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn sigint_interrupts_evaluation() {
        let options = Options {
            quiet: true,
            include: Vec::new(),
            max_call_depth: None,
            max_eval_depth: None,
        };
        let mut evaluator = evaluator(&options);

        signal_hook::low_level::raise(SIGINT).unwrap();
        let result = evaluator.eval_source("(+ 1 2)", "<test>");
        assert!(matches!(result, Err(Unwind::Interrupt)));

        let status = report(&mut evaluator, Unwind::Interrupt, "", "<test>", true);
        assert_eq!(status, INTERRUPTED_STATUS);
        // The flag is consumed.
        assert!(evaluator.eval_source("(+ 1 2)", "<test>").is_ok());
    }
}
