//! Output formatting utilities.
//! 输出格式化工具。
//!
//! These functions provide colored terminal output for the CLI.
//! 这些函数为 CLI 提供彩色终端输出。

/// Print a result value in green.
/// 以绿色打印结果值。
pub fn success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

/// Print an error message in red.
/// 以红色打印错误消息。
pub fn error(msg: &str) {
    eprintln!("\x1b[31merror:\x1b[0m {msg}");
}

/// Print one backtrace line, dimmed.
/// 以暗色打印一行回溯信息。
pub fn trace_line(msg: &str) {
    eprintln!("\x1b[2m  at {msg}\x1b[0m");
}
