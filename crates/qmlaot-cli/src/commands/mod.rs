//! Command implementations.

pub mod check;
pub mod compile;

use std::path::{Path, PathBuf};

use anyhow::Context;
use qmlaot_scope::{builtins, BuiltinTypes, ContextualTypes, Document, ImportVisitor, LoggerConfig, ScopeArena, TypeDescription, VisitResult};
use termcolor::ColorChoice;

use crate::config::{self, Manifest};
use crate::output::OutputFormat;

/// Options shared by all commands.
pub struct GlobalOptions {
    /// Diagnostic format
    pub format: OutputFormat,
    /// Terminal colors
    pub color: ColorChoice,
}

/// A document visited against its type descriptions.
pub struct Session {
    /// Scopes of the descriptions and the document
    pub arena: ScopeArena,
    /// Known type names
    pub types: ContextualTypes,
    /// Builtin types
    pub builtins: BuiltinTypes,
    /// The document
    pub document: Document,
    /// QML source of the document, if it could be read
    pub source: Option<String>,
    /// The governing manifest
    pub manifest: Manifest,
}

impl Session {
    /// Load the type descriptions and the document.
    pub fn load(document_path: &Path, type_paths: &[PathBuf]) -> anyhow::Result<Self> {
        let start = match document_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().context("Failed to determine the working directory")?,
        };
        let manifest = config::load(&start)?;

        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = builtins::install(&mut arena, &mut types);
        for path in type_paths {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read type description {}", path.display()))?;
            let description = TypeDescription::from_json(&text)
                .with_context(|| format!("Failed to parse type description {}", path.display()))?;
            let created = description
                .load_into(&mut arena, &mut types, &builtins, None)
                .with_context(|| format!("Failed to load type description {}", path.display()))?;
            tracing::debug!(path = %path.display(), components = created.len(), "loaded type description");
        }

        let text = std::fs::read_to_string(document_path)
            .with_context(|| format!("Failed to read document {}", document_path.display()))?;
        let document = Document::from_json(&text)
            .with_context(|| format!("Failed to parse document {}", document_path.display()))?;
        let source = read_source(document_path, &document.file_path);

        Ok(Self {
            arena,
            types,
            builtins,
            document,
            source,
            manifest,
        })
    }

    /// Run the import visitor over the document.
    pub fn visit(&mut self, config: LoggerConfig) -> VisitResult {
        ImportVisitor::new(&mut self.arena, &self.types, &self.builtins, config).visit(&self.document)
    }
}

/// The QML source a document was parsed from: its `file_path`, relative to
/// the document file unless absolute.
fn read_source(document_path: &Path, file_path: &str) -> Option<String> {
    let path = Path::new(file_path);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        document_path.parent().unwrap_or(Path::new("")).join(path)
    };
    match std::fs::read_to_string(&path) {
        Ok(source) => Some(source),
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "source not available");
            None
        }
    }
}
