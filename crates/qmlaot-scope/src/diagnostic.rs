//! Rendering of logged diagnostics
//!
//! Bridges [`LoggedDiagnostic`]s to `codespan-reporting` for terminal output
//! and to a JSON form for tooling.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle, Severity as CsSeverity};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use termcolor::WriteColor;

use crate::logger::{LoggedDiagnostic, Severity};
use crate::span::Span;

/// Code of a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

impl ErrorCode {
    /// The code as text
    pub fn as_str(&self) -> &str {
        self.0
    }
}

/// A diagnostic message with source code context
pub struct Diagnostic {
    /// The underlying codespan diagnostic
    inner: CsDiagnostic<usize>,
    /// Diagnostic code (e.g., "Q1006")
    code: Option<ErrorCode>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: CsSeverity, message: impl Into<String>) -> Self {
        Diagnostic {
            inner: CsDiagnostic::new(severity).with_message(message),
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(CsSeverity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(CsSeverity::Warning, message)
    }

    /// Create a note diagnostic
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(CsSeverity::Note, message)
    }

    /// Set the code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner = self.inner.with_code(code.0);
        self.code = Some(code);
        self
    }

    /// Add a primary label (main location)
    pub fn with_primary_label(mut self, file_id: usize, span: Span, message: impl Into<String>) -> Self {
        self.inner
            .labels
            .push(Label::primary(file_id, span.start..span.end).with_message(message));
        self
    }

    /// Add a secondary label (related location)
    pub fn with_secondary_label(mut self, file_id: usize, span: Span, message: impl Into<String>) -> Self {
        self.inner
            .labels
            .push(Label::secondary(file_id, span.start..span.end).with_message(message));
        self
    }

    /// Add a note (additional context)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.inner.notes.push(note.into());
        self
    }

    /// Build the rendered form of a logged diagnostic. Returns `None` for
    /// suppressed diagnostics.
    pub fn from_logged(logged: &LoggedDiagnostic, file_id: usize) -> Option<Self> {
        let diag = match logged.severity {
            Severity::Off => return None,
            Severity::Info => Diagnostic::note(&logged.message),
            Severity::Warning => Diagnostic::warning(&logged.message),
            Severity::Error => Diagnostic::error(&logged.message),
        };
        let mut diag = diag
            .with_code(ErrorCode(logged.category.code))
            .with_primary_label(file_id, logged.span, logged.category.id);
        for related in &logged.related {
            diag = diag.with_secondary_label(file_id, related.span, &related.message);
        }
        Some(diag)
    }

    /// Emit the diagnostic to any color-capable writer
    pub fn emit_to(
        &self,
        writer: &mut dyn WriteColor,
        files: &SimpleFiles<String, String>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let config = term::Config::default();
        term::emit(writer, &config, files, &self.inner)
    }

    /// Get the underlying codespan diagnostic (for testing/custom rendering)
    pub fn inner(&self) -> &CsDiagnostic<usize> {
        &self.inner
    }

    /// Convert to JSON representation for IDE integration
    pub fn to_json(&self, files: &SimpleFiles<String, String>) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonDiagnostic::from_diagnostic(self, files))
    }
}

/// JSON representation of a diagnostic for IDE integration
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDiagnostic {
    /// Diagnostic code (e.g., "Q1006")
    pub code: Option<String>,
    /// Severity level
    pub severity: String,
    /// Main message
    pub message: String,
    /// Source locations with labels
    pub labels: Vec<JsonLabel>,
    /// Additional notes and help
    pub notes: Vec<String>,
}

/// JSON representation of a diagnostic label
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLabel {
    /// File path
    pub file: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Label message
    pub message: Option<String>,
    /// Label style (primary or secondary)
    pub style: String,
}

impl JsonDiagnostic {
    /// Convert a Diagnostic to JSON representation
    pub fn from_diagnostic(diag: &Diagnostic, files: &SimpleFiles<String, String>) -> Self {
        let severity = match diag.inner.severity {
            CsSeverity::Error => "error",
            CsSeverity::Warning => "warning",
            CsSeverity::Note => "info",
            CsSeverity::Help => "help",
            CsSeverity::Bug => "bug",
        };

        let labels = diag
            .inner
            .labels
            .iter()
            .filter_map(|label| {
                let file = files.get(label.file_id).ok()?;
                let start = file.location((), label.range.start).ok()?;
                let end = file.location((), label.range.end).ok()?;
                Some(JsonLabel {
                    file: file.name().to_string(),
                    start_line: start.line_number,
                    start_column: start.column_number,
                    end_line: end.line_number,
                    end_column: end.column_number,
                    message: Some(label.message.clone()),
                    style: match label.style {
                        LabelStyle::Primary => "primary",
                        LabelStyle::Secondary => "secondary",
                    }
                    .to_string(),
                })
            })
            .collect();

        JsonDiagnostic {
            code: diag.code.as_ref().map(|c| c.0.to_string()),
            severity: severity.to_string(),
            message: diag.inner.message.clone(),
            labels,
            notes: diag.inner.notes.clone(),
        }
    }
}

/// Helper to create a SimpleFiles instance from source code
pub fn create_files(path: impl Into<PathBuf>, source: impl Into<String>) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    files.add(path.into().display().to_string(), source.into());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{RelatedLocation, DUPLICATED_NAME, UNUSED_IMPORTS};
    use termcolor::NoColor;

    fn logged(severity: Severity) -> LoggedDiagnostic {
        LoggedDiagnostic {
            category: &DUPLICATED_NAME,
            severity,
            message: "Found a duplicated id. id foo was first declared at 1:5".to_string(),
            span: Span::new(20, 23, 2, 5),
            related: vec![RelatedLocation {
                span: Span::new(4, 7, 1, 5),
                message: "first declaration".to_string(),
            }],
        }
    }

    #[test]
    fn test_from_logged_carries_code_and_labels() {
        let diag = Diagnostic::from_logged(&logged(Severity::Error), 0).expect("not suppressed");
        assert_eq!(diag.code, Some(ErrorCode("Q1005")));
        assert_eq!(diag.inner().labels.len(), 2);
        assert_eq!(diag.inner().labels[1].style, LabelStyle::Secondary);
    }

    #[test]
    fn test_off_is_not_rendered() {
        assert!(Diagnostic::from_logged(&logged(Severity::Off), 0).is_none());
    }

    #[test]
    fn test_json_output_has_positions() {
        let source = "Item {\n    id: foo\n}\n";
        let files = create_files("main.qml", source);
        let logged = LoggedDiagnostic {
            category: &UNUSED_IMPORTS,
            severity: Severity::Info,
            message: "Unused import".to_string(),
            span: Span::new(11, 13, 2, 5),
            related: Vec::new(),
        };
        let diag = Diagnostic::from_logged(&logged, 0).expect("not suppressed");
        let json: JsonDiagnostic = serde_json::from_str(&diag.to_json(&files).expect("json")).expect("parse");
        assert_eq!(json.severity, "info");
        assert_eq!(json.code.as_deref(), Some("Q1004"));
        assert_eq!(json.labels[0].start_line, 2);
        assert_eq!(json.labels[0].start_column, 5);
    }

    #[test]
    fn test_emit_to_plain_writer() {
        let source = "Item { id: foo }\nItem { id: foo }\n";
        let files = create_files("dup.qml", source);
        let logged = LoggedDiagnostic {
            span: Span::new(28, 31, 2, 12),
            related: vec![RelatedLocation {
                span: Span::new(11, 14, 1, 12),
                message: "first declaration".to_string(),
            }],
            ..logged(Severity::Error)
        };
        let diag = Diagnostic::from_logged(&logged, 0).expect("not suppressed");
        let mut out = NoColor::new(Vec::new());
        diag.emit_to(&mut out, &files).expect("emit");
        let text = String::from_utf8(out.into_inner()).expect("utf8");
        assert!(text.contains("error[Q1005]"));
        assert!(text.contains("dup.qml"));
    }
}
