//! The `alisp repl` command.

use alisp_diagnostic::ErrorCode;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::eval::print_value;
use super::{evaluator, report, Options};

const SOURCE_NAME: &str = "<repl>";

pub fn run(options: &Options) -> Result<i32, String> {
    println!("alisp REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type :help for help, :quit to exit");
    println!();

    let mut rl = DefaultEditor::new().map_err(|e| e.to_string())?;
    // One evaluator for the whole session so definitions persist.
    let mut evaluator = evaluator(options);
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "alisp> " } else { "  ...> " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() && trimmed.is_empty() {
                    continue;
                }

                if buffer.is_empty() && trimmed.starts_with(':') {
                    let _ = rl.add_history_entry(trimmed);
                    match trimmed {
                        ":quit" | ":q" => break,
                        ":help" | ":h" => {
                            println!("Commands:");
                            println!("  :help, :h    Show this help");
                            println!("  :quit, :q    Exit the REPL");
                            println!("  :env         Show module bindings");
                        }
                        ":env" => {
                            for name in evaluator.env().root_symbols() {
                                println!("  {}", name);
                            }
                        }
                        _ => println!("Unknown command: {}", trimmed),
                    }
                    continue;
                }

                buffer.push_str(&line);
                buffer.push('\n');
                if needs_more_input(&buffer) {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                let _ = rl.add_history_entry(source.trim());
                let outcome = evaluator
                    .eval_source(&source, SOURCE_NAME)
                    .and_then(|value| evaluator.run_until_idle().map(|_| value));
                match outcome {
                    Ok(value) => print_value(&value),
                    Err(alisp_eval::Unwind::Exit(code)) => return Ok(code),
                    Err(unwind) => {
                        report(&mut evaluator, unwind, &source, SOURCE_NAME, false);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(0)
}

/// Whether the buffered input only fails because a list is still open.
fn needs_more_input(source: &str) -> bool {
    let (_, diagnostics) = alisp_parser::parse(source);
    diagnostics
        .iter()
        .any(|d| d.code == Some(ErrorCode::UnclosedDelimiter))
}
