//! Diagnostic and error reporting for alisp.
//! alisp 的诊断和错误报告。
//!
//! This crate renders diagnostics using ariadne.
//! 本 crate 使用 ariadne 库渲染诊断信息。

mod codes;
mod diagnostic;

pub use codes::ErrorCode;
pub use diagnostic::{Diagnostic, DiagnosticKind, Label, Severity};

use ariadne::{ColorGenerator, Label as AriadneLabel, Report, ReportKind, Source};

/// Render a diagnostic to stderr.
/// 将诊断信息渲染到标准错误输出。
pub fn emit(source: &str, filename: &str, diagnostic: &Diagnostic) -> std::io::Result<()> {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Note => ReportKind::Advice,
    };

    // Spans past the end of the text (e.g. from an earlier unit) are clamped.
    // 超出文本末尾的范围会被截断。
    let clamp = |pos: usize| pos.min(source.len());

    let mut colors = ColorGenerator::new();
    let mut report = Report::build(kind, filename, clamp(diagnostic.span.start.0 as usize))
        .with_message(&diagnostic.message);

    if let Some(code) = &diagnostic.code {
        report = report.with_code(code.as_str());
    }

    for label in &diagnostic.labels {
        let color = colors.next();
        let range = clamp(label.span.start.0 as usize)..clamp(label.span.end.0 as usize);
        let ariadne_label = AriadneLabel::new((filename, range))
            .with_message(&label.message)
            .with_color(color);
        report = report.with_label(ariadne_label);
    }

    for note in &diagnostic.notes {
        report = report.with_note(note);
    }

    if let Some(help) = &diagnostic.help {
        report = report.with_help(help);
    }

    report.finish().eprint((filename, Source::from(source)))
}
