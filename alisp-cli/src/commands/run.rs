//! The `alisp run` command.

use std::fs;
use std::path::Path;

use super::{evaluator, report, Options};

pub fn run(file: &Path, options: &Options) -> Result<i32, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("cannot read file '{}': {}", file.display(), e))?;
    let name = file.display().to_string();

    let mut evaluator = evaluator(options);
    let outcome = evaluator
        .eval_file(file)
        .and_then(|_| evaluator.run_until_idle().map(|_| ()));

    match outcome {
        Ok(()) => Ok(0),
        Err(unwind) => Ok(report(&mut evaluator, unwind, &source, &name, options.quiet)),
    }
}
