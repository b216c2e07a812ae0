//! Diagnostic output for CLI commands.
//!
//! Pretty output goes through `codespan-reporting`; JSON output is one
//! array of diagnostics. Respects `NO_COLOR` and `--no-color`.

use std::io::Write;

use clap::ValueEnum;
use codespan_reporting::files::SimpleFiles;
use qmlaot_scope::diagnostic::{create_files, Diagnostic, ErrorCode, JsonDiagnostic};
use qmlaot_scope::{LoggedDiagnostic, Severity, Span};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// How diagnostics are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Rendered with source snippets
    #[default]
    Pretty,
    /// JSON array
    Json,
}

/// Resolve `ColorChoice` from the `--no-color` flag and environment.
pub fn resolve_color_choice(no_color: bool) -> ColorChoice {
    if no_color || std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Diagnostics of one document together with its source.
pub struct Report {
    path: String,
    source: Option<String>,
    diagnostics: Vec<LoggedDiagnostic>,
}

impl Report {
    /// A report for the document at `path`. Without `source` the
    /// diagnostics are printed without snippets.
    pub fn new(path: impl Into<String>, source: Option<String>, diagnostics: Vec<LoggedDiagnostic>) -> Self {
        Self {
            path: path.into(),
            source,
            diagnostics,
        }
    }

    /// Number of diagnostics of `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    fn files(&self) -> SimpleFiles<String, String> {
        create_files(&self.path, self.source.clone().unwrap_or_default())
    }

    fn rendered(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .iter()
            .filter_map(|logged| {
                if self.source.is_some() {
                    return Diagnostic::from_logged(logged, 0);
                }
                let diag = match logged.severity {
                    Severity::Off => return None,
                    Severity::Info => Diagnostic::note(&logged.message),
                    Severity::Warning => Diagnostic::warning(&logged.message),
                    Severity::Error => Diagnostic::error(&logged.message),
                };
                Some(diag.with_code(ErrorCode(logged.category.code)).with_note(format!(
                    "at {}:{}:{} [{}]",
                    self.path, logged.span.line, logged.span.column, logged.category.id
                )))
            })
            .collect()
    }

    /// Print rendered diagnostics.
    pub fn emit_pretty(&self, writer: &mut dyn WriteColor) -> anyhow::Result<()> {
        let files = self.files();
        for diag in self.rendered() {
            diag.emit_to(writer, &files)?;
        }
        Ok(())
    }

    /// The diagnostics in their JSON form.
    pub fn to_json(&self) -> Vec<JsonDiagnostic> {
        let files = self.files();
        self.rendered()
            .iter()
            .map(|diag| JsonDiagnostic::from_diagnostic(diag, &files))
            .collect()
    }
}

/// Print `report` in `format`. Pretty output goes to stderr, JSON to
/// `json_out`.
pub fn emit(report: &Report, format: OutputFormat, color: ColorChoice, json_out: &mut dyn Write) -> anyhow::Result<()> {
    match format {
        OutputFormat::Pretty => {
            let mut stderr = StandardStream::stderr(color);
            report.emit_pretty(&mut stderr)?;
            print_summary(&mut stderr, report)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *json_out, &report.to_json())?;
            writeln!(json_out)?;
        }
    }
    Ok(())
}

fn print_summary(out: &mut dyn WriteColor, report: &Report) -> std::io::Result<()> {
    let errors = report.count(Severity::Error);
    let warnings = report.count(Severity::Warning);
    write!(out, "{}: ", report.path)?;
    if errors == 0 && warnings == 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(out, "no issues found")?;
        out.reset()?;
        return writeln!(out, ".");
    }
    if errors > 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{} error{}", errors, if errors == 1 { "" } else { "s" })?;
        out.reset()?;
    }
    if errors > 0 && warnings > 0 {
        write!(out, ", ")?;
    }
    if warnings > 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        write!(out, "{} warning{}", warnings, if warnings == 1 { "" } else { "s" })?;
        out.reset()?;
    }
    writeln!(out, ".")
}

/// Span of the whole of 1-based `line` in `source`.
pub fn line_span(source: &str, line: u32) -> Span {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line as usize {
            let end = start + text.trim_end_matches(['\r', '\n']).len();
            return Span::new(start, end, line, 1);
        }
        start += text.len();
    }
    Span::new(source.len(), source.len(), line, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::logger::{REQUIRED, UNUSED_IMPORTS};
    use termcolor::NoColor;

    fn logged(category: &'static qmlaot_scope::LogCategory, severity: Severity, message: &str) -> LoggedDiagnostic {
        LoggedDiagnostic {
            category,
            severity,
            message: message.to_string(),
            span: Span::new(0, 4, 1, 1),
            related: Vec::new(),
        }
    }

    #[test]
    fn test_line_span() {
        let source = "Item {\r\n  width: 3\n}";
        assert_eq!(line_span(source, 1), Span::new(0, 6, 1, 1));
        assert_eq!(line_span(source, 2), Span::new(8, 18, 2, 1));
        assert_eq!(line_span(source, 9), Span::new(source.len(), source.len(), 9, 1));
    }

    #[test]
    fn test_pretty_with_source() {
        let report = Report::new(
            "Main.qml",
            Some("Item {}\n".to_string()),
            vec![logged(&REQUIRED, Severity::Error, "Component is missing required property model")],
        );
        let mut out = NoColor::new(Vec::new());
        report.emit_pretty(&mut out).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("error[Q1012]: Component is missing required property model"));
        assert!(text.contains("Main.qml:1:1"));
    }

    #[test]
    fn test_json_without_source() {
        let report = Report::new(
            "Main.qml",
            None,
            vec![
                logged(&UNUSED_IMPORTS, Severity::Info, "Unused import"),
                logged(&REQUIRED, Severity::Off, "dropped"),
            ],
        );
        let json = report.to_json();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0].code.as_deref(), Some("Q1004"));
        assert_eq!(json[0].severity, "info");
        assert!(json[0].labels.is_empty());
        assert_eq!(json[0].notes, vec!["at Main.qml:1:1 [unused-imports]".to_string()]);
        assert_eq!(report.count(Severity::Info), 1);
    }
}
