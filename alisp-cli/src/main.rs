//! alisp CLI - The alisp interpreter command line interface.
//! alisp CLI - alisp 解释器的命令行界面。

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Main CLI structure.
/// 主 CLI 结构体。
#[derive(Parser)]
#[command(name = "alisp")]
#[command(author, version, about = "alisp - An embeddable Lisp interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output. / 启用详细输出。
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output. / 抑制输出。
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Add a directory to the module search path. / 添加模块搜索路径。
    #[arg(short = 'I', long = "include", global = true, value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Maximum nested function calls. / 最大函数调用嵌套深度。
    #[arg(long, global = true, value_name = "N")]
    max_call_depth: Option<usize>,

    /// Maximum nested evaluations. / 最大求值嵌套深度。
    #[arg(long, global = true, value_name = "N")]
    max_eval_depth: Option<usize>,
}

/// Available CLI commands.
/// 可用的 CLI 命令。
#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression. / 求值表达式。
    Eval {
        /// The expression to evaluate. / 要求值的表达式。
        expr: String,
    },

    /// Run an alisp file. / 运行 alisp 文件。
    Run {
        /// The file to run. / 要运行的文件。
        file: PathBuf,
    },

    /// Start an interactive REPL. / 启动交互式 REPL。
    Repl,
}

/// Install the log subscriber. `RUST_LOG` overrides the flag-derived level.
/// 安装日志订阅器。`RUST_LOG` 优先于命令行参数。
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default = if verbose { "alisp_eval=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

/// Main entry point.
/// 主入口点。
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = commands::Options {
        quiet: cli.quiet,
        include: cli.include,
        max_call_depth: cli.max_call_depth,
        max_eval_depth: cli.max_eval_depth,
    };

    let result = match cli.command {
        Commands::Eval { expr } => commands::eval::run(&expr, &options),
        Commands::Run { file } => commands::run::run(&file, &options),
        Commands::Repl => commands::repl::run(&options),
    };

    match result {
        Ok(0) => {}
        Ok(status) => std::process::exit(status),
        Err(e) => {
            if !cli.quiet {
                output::error(&e);
            }
            std::process::exit(1);
        }
    }
}
