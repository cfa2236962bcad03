//! The `alisp eval` command.

use alisp_eval::Value;

use super::{evaluator, report, Options};
use crate::output;

const SOURCE_NAME: &str = "<eval>";

pub fn run(expr: &str, options: &Options) -> Result<i32, String> {
    let mut evaluator = evaluator(options);
    let outcome = evaluator
        .eval_source(expr, SOURCE_NAME)
        .and_then(|value| evaluator.run_until_idle().map(|_| value));

    match outcome {
        Ok(value) => {
            if !options.quiet {
                print_value(&value);
            }
            Ok(0)
        }
        Err(unwind) => Ok(report(&mut evaluator, unwind, expr, SOURCE_NAME, options.quiet)),
    }
}

/// Values print in their read syntax.
pub(crate) fn print_value(value: &Value) {
    output::success(&value.to_string());
}
