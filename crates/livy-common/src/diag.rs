//! Diagnostic rendering for compiler errors.
//!
//! Every phase error converts into a [`Diagnostic`] -- a machine name, a
//! human message, an optional source span, and optional notes. The CLI
//! renders diagnostics in one of three formats: `json` for tools, `short`
//! for one-line alerts, and `long` for an ariadne report quoting the
//! offending source line.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use crate::span::{LineIndex, Span};

/// A renderable compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable machine-readable error name, e.g. `"illegal_char"`.
    pub name: &'static str,
    /// One-sentence human description of what went wrong.
    pub message: String,
    /// Where in the source the error points, if anywhere.
    pub span: Option<Span>,
    /// Extra explanation lines shown only in the `long` format.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(name: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            name,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The catch-all diagnostic for conditions outside the error taxonomy.
    pub fn fatal_internal() -> Self {
        Diagnostic::new(
            "fatal_internal",
            "the compiler ran into an unrecoverable internal error",
        )
    }
}

/// How a diagnostic should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Long,
    Short,
}

/// Render a diagnostic against the source it came from.
pub fn render(diag: &Diagnostic, format: ReportFormat, source: &str, path: &str) -> String {
    match format {
        ReportFormat::Json => render_json(diag, source, path),
        ReportFormat::Short => render_short(diag, source),
        ReportFormat::Long => render_long(diag, source, path),
    }
}

fn render_json(diag: &Diagnostic, source: &str, path: &str) -> String {
    let position = diag.span.map(|span| {
        let index = LineIndex::new(source);
        let (line, column) = index.line_col(span.start.min(source.len() as u32));
        serde_json::json!({
            "start": span.start,
            "end": span.end,
            "line": line,
            "column": column,
        })
    });
    let value = serde_json::json!({
        "source_path": path,
        "error_name": diag.name,
        "message": diag.message,
        "span": position,
    });
    value.to_string()
}

fn render_short(diag: &Diagnostic, source: &str) -> String {
    match diag.span {
        Some(span) => {
            let index = LineIndex::new(source);
            let (_, column) = index.line_col(span.start.min(source.len() as u32));
            format!("{column} | {}", diag.message)
        }
        None => diag.message.clone(),
    }
}

fn render_long(diag: &Diagnostic, source: &str, path: &str) -> String {
    let span = match diag.span {
        // Spans can point at the end-of-input position; pull them back
        // onto the last byte so the label stays inside the source.
        Some(span) if !source.is_empty() => span,
        _ => {
            let mut out = format!("error: {}", diag.message);
            for note in &diag.notes {
                out.push_str(&format!("\nnote: {note}"));
            }
            out.push('\n');
            return out;
        }
    };

    let start = (span.start as usize).min(source.len() - 1);
    let end = (span.end as usize).clamp(start + 1, source.len());
    let mut builder = Report::<Range<usize>>::build(ReportKind::Error, start..end)
        .with_config(Config::default().with_color(false))
        .with_message(&diag.message)
        .with_label(Label::new(start..end).with_message(&diag.message));
    for note in &diag.notes {
        builder = builder.with_note(note);
    }

    let mut buffer = Vec::new();
    let _ = builder.finish().write(Source::from(source), &mut buffer);
    let report = String::from_utf8_lossy(&buffer).into_owned();
    format!("{path}:\n{report}")
}
