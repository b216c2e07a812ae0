//! Errors reading `qmlaot.toml`

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur loading the manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read the manifest file
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// `[diagnostics]` entries naming an unknown category or severity
    #[error("Invalid [diagnostics] entries: {}", entries.join(", "))]
    InvalidDiagnostics {
        /// The offending `id = "severity"` entries
        entries: Vec<String>,
    },
}
