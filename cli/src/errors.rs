//! Pretty-prints compile and runtime errors to the terminal.
//!
//! Grounded in the teacher crate's `error_renderer.rs`: a span-annotated
//! `ariadne` report per diagnostic, built from the byte offset the
//! diagnostic's line/column resolves to against the original source text.
//! Runtime errors carry a stack trace rather than a source span, so those
//! are rendered as the plain frame-by-frame trace the core crate's
//! `Display` impl already produces (see `wisp_core::diagnostics`).

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use wisp_core::{CompileError, RuntimeErrorReport};

const SOURCE_ID: &str = "<script>";

/// Byte offset of `(line, column)` within `source`, both 1-based the way
/// `wisp_core::scanner::Token` reports them.
fn offset_of(source: &str, line: u32, column: u32) -> usize {
    let mut offset = 0usize;
    for (i, text) in source.split('\n').enumerate() {
        if i as u32 + 1 == line {
            return offset + (column.saturating_sub(1) as usize).min(text.len());
        }
        offset += text.len() + 1;
    }
    source.len()
}

/// Renders every compile error accumulated for one source file to stderr,
/// with the offending token (if any) underlined in its source context.
pub fn render_compile_errors(source: &str, errors: &[CompileError]) {
    for error in errors {
        let start = offset_of(source, error.line, error.column);
        let len = error.at.as_ref().map(|a| a.trim_matches('\'').len().max(1)).unwrap_or(1);
        let end = (start + len).min(source.len()).max(start);

        let mut colors = ColorGenerator::new();
        let color = colors.next();

        let report = Report::build(ReportKind::Error, (SOURCE_ID, start..end))
            .with_message(&error.message)
            .with_label(Label::new((SOURCE_ID, start..end)).with_message(&error.message).with_color(color))
            .finish();
        report.eprint((SOURCE_ID, Source::from(source))).ok();
    }
}

/// Renders a runtime error and its call-frame trace to stderr, exactly in
/// the `<message>\n[line L] in <name>()\n` form the spec's diagnostics
/// section mandates — the core crate's `Display` impl already produces it.
pub fn render_runtime_error(report: &RuntimeErrorReport) {
    eprint!("{report}");
}
