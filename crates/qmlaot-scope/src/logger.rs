//! Diagnostic collection for the visitor and the code generator.
//!
//! Every diagnostic belongs to a [`LogCategory`] with a stable id (used in
//! `qmlaot.toml` overrides) and a code (shown in rendered output). The
//! effective severity comes from the [`LoggerConfig`], falling back to the
//! category default.

use serde::{Deserialize, Serialize};

use crate::config::LoggerConfig;
use crate::span::Span;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suppressed
    Off,
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

impl Severity {
    /// Parse a severity as written in a manifest.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "off" => Some(Severity::Off),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A class of diagnostics.
#[derive(Debug, PartialEq, Eq)]
pub struct LogCategory {
    /// Stable id, e.g. `alias-cycle`
    pub id: &'static str,
    /// Code shown in rendered output, e.g. `Q1006`
    pub code: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Severity when no override is configured
    pub default_severity: Severity,
}

macro_rules! categories {
    ($($name:ident = $id:literal, $code:literal, $severity:ident, $description:literal;)*) => {
        $(
            #[doc = $description]
            pub static $name: LogCategory = LogCategory {
                id: $id,
                code: $code,
                description: $description,
                default_severity: Severity::$severity,
            };
        )*

        /// Every category, in code order.
        pub static ALL_CATEGORIES: &[&LogCategory] = &[$(&$name),*];
    };
}

categories! {
    SYNTAX = "syntax", "Q1001", Error, "Malformed document constructs";
    IMPORT = "import", "Q1002", Warning, "Types whose import failed";
    UNRESOLVED_TYPE = "unresolved-type", "Q1003", Warning, "Type names that do not resolve";
    UNUSED_IMPORTS = "unused-imports", "Q1004", Info, "Imports no type was used from";
    DUPLICATED_NAME = "duplicated-name", "Q1005", Error, "Duplicate ids and member names";
    ALIAS_CYCLE = "alias-cycle", "Q1006", Error, "Aliases that refer to each other";
    UNRESOLVED_ALIAS = "unresolved-alias", "Q1007", Error, "Aliases whose target cannot be found";
    INHERITANCE_CYCLE = "inheritance-cycle", "Q1008", Error, "Types that inherit from themselves";
    MISSING_PROPERTY = "missing-property", "Q1009", Error, "Bindings to properties that do not exist";
    NON_LIST_PROPERTY = "non-list-property", "Q1010", Error, "Several objects assigned to a non-list property";
    INCOMPATIBLE_TYPE = "incompatible-type", "Q1011", Warning, "Objects assigned to properties of another type";
    REQUIRED = "required", "Q1012", Error, "Required properties left unbound";
    SIGNAL = "signal", "Q1013", Error, "Handlers for unknown signals and uncompilable signatures";
    SIGNAL_HANDLER_PARAMETERS = "signal-handler-parameters", "Q1014", Warning, "Handler parameters that do not match the signal";
    COMPILER = "compiler", "Q2001", Warning, "Functions that cannot be compiled ahead of time";
}

/// Look a category up by its id.
pub fn category_by_id(id: &str) -> Option<&'static LogCategory> {
    ALL_CATEGORIES.iter().copied().find(|category| category.id == id)
}

/// A secondary location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedLocation {
    /// Location
    pub span: Span,
    /// What the location shows
    pub message: String,
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedDiagnostic {
    /// Category of the diagnostic
    pub category: &'static LogCategory,
    /// Effective severity
    pub severity: Severity,
    /// Message
    pub message: String,
    /// Primary location
    pub span: Span,
    /// Secondary locations
    pub related: Vec<RelatedLocation>,
}

/// Collects diagnostics for one document.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    config: LoggerConfig,
    diagnostics: Vec<LoggedDiagnostic>,
}

impl Logger {
    /// Logger with default severities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger with severity overrides.
    pub fn with_config(config: LoggerConfig) -> Self {
        Self {
            config,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic. Categories configured `off` are dropped.
    pub fn log(&mut self, category: &'static LogCategory, message: impl Into<String>, span: Span) {
        self.log_with_related(category, message, span, Vec::new());
    }

    /// Record a diagnostic with secondary locations.
    pub fn log_with_related(
        &mut self,
        category: &'static LogCategory,
        message: impl Into<String>,
        span: Span,
        related: Vec<RelatedLocation>,
    ) {
        let severity = self
            .config
            .effective_severity(category.id, category.default_severity);
        if severity == Severity::Off {
            return;
        }
        let message = message.into();
        tracing::trace!(category = category.id, %span, "{}", message);
        self.diagnostics.push(LoggedDiagnostic {
            category,
            severity,
            message,
            span,
            related,
        });
    }

    /// All recorded diagnostics in order.
    pub fn diagnostics(&self) -> &[LoggedDiagnostic] {
        &self.diagnostics
    }

    /// Consume the logger.
    pub fn into_diagnostics(self) -> Vec<LoggedDiagnostic> {
        self.diagnostics
    }

    /// Whether any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Whether any warning-severity diagnostic was recorded.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics of one category.
    pub fn of_category<'a>(
        &'a self,
        category: &'static LogCategory,
    ) -> impl Iterator<Item = &'a LoggedDiagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| std::ptr::eq(d.category, category))
    }
}
