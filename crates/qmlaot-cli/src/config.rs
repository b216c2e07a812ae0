//! `qmlaot.toml` loading.
//!
//! ```toml
//! [diagnostics]
//! unused-imports = "off"
//! required = "warning"
//!
//! [compiler]
//! trace-comments = true
//! eliminate-dead-stores = false
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use qmlaot_codegen::GeneratorOptions;
use qmlaot_scope::LoggerConfig;
use serde::Deserialize;

use crate::error::ManifestError;

/// File name of the manifest.
pub const MANIFEST_NAME: &str = "qmlaot.toml";

/// Parsed `qmlaot.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Category id → severity overrides
    pub diagnostics: BTreeMap<String, String>,
    /// Code generator options
    pub compiler: GeneratorOptions,
}

impl Manifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest text read from `path`
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.logger_config()?;
        Ok(manifest)
    }

    /// Severity overrides for the diagnostics logger.
    pub fn logger_config(&self) -> Result<LoggerConfig, ManifestError> {
        let (config, rejected) = LoggerConfig::from_entries(
            self.diagnostics
                .iter()
                .map(|(id, severity)| (id.as_str(), severity.as_str())),
        );
        if rejected.is_empty() {
            Ok(config)
        } else {
            Err(ManifestError::InvalidDiagnostics { entries: rejected })
        }
    }
}

/// Walk up from `start` to find `qmlaot.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load the manifest governing `start`, or the defaults if there is none.
pub fn load(start: &Path) -> Result<Manifest, ManifestError> {
    match find_manifest(start) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading manifest");
            Manifest::from_file(&path)
        }
        None => Ok(Manifest::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_sections() {
        let manifest = Manifest::parse(
            "[diagnostics]\nunused-imports = \"off\"\n\n[compiler]\ntrace-comments = true\n",
            Path::new(MANIFEST_NAME),
        )
        .unwrap();
        assert_eq!(manifest.diagnostics.get("unused-imports").map(String::as_str), Some("off"));
        assert!(manifest.compiler.trace_comments);
        assert!(manifest.compiler.source_comments);
        assert!(manifest.compiler.eliminate_dead_stores);
        assert!(manifest.logger_config().unwrap().is_disabled("unused-imports"));
    }

    #[test]
    fn test_empty_manifest_is_default() {
        let manifest = Manifest::parse("", Path::new(MANIFEST_NAME)).unwrap();
        assert_eq!(manifest, Manifest::default());
        assert_eq!(manifest.compiler, GeneratorOptions::default());
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let error = Manifest::parse("[diagnostics]\nrequired = \"loud\"\n", Path::new(MANIFEST_NAME)).unwrap_err();
        assert!(matches!(error, ManifestError::InvalidDiagnostics { ref entries } if entries.len() == 1));
        assert_eq!(error.to_string(), "Invalid [diagnostics] entries: required = \"loud\"");

        let error = Manifest::parse("[linting]\n", Path::new(MANIFEST_NAME)).unwrap_err();
        assert!(matches!(error, ManifestError::Parse { .. }));

        let error = Manifest::parse("[compiler]\ntrace-comments = \"yes\"\n", Path::new(MANIFEST_NAME)).unwrap_err();
        assert!(matches!(error, ManifestError::Parse { .. }));
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("src").join("qml");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(MANIFEST_NAME), "[compiler]\nsource-comments = false\n").unwrap();

        assert_eq!(find_manifest(&nested), Some(temp.path().join(MANIFEST_NAME)));
        let manifest = load(&nested).unwrap();
        assert!(!manifest.compiler.source_comments);
    }

    #[test]
    fn test_load_without_manifest() {
        let temp = tempfile::tempdir().unwrap();
        // A manifest further up (e.g. in the system temp dir) would be found too.
        if find_manifest(temp.path()).is_none() {
            assert_eq!(load(temp.path()).unwrap(), Manifest::default());
        }
    }
}
