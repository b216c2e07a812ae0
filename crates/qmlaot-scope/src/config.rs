//! Logger configuration: per-category severity overrides.

use rustc_hash::FxHashMap;

use crate::logger::{category_by_id, Severity};

/// Severity overrides, loaded from `[diagnostics]` in `qmlaot.toml`.
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Key = category id (e.g. "alias-cycle").
    overrides: FxHashMap<String, Severity>,
}

impl LoggerConfig {
    /// Create a new empty config (all categories use their default severity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `category id → severity string` pairs.
    ///
    /// Returns the entries that name an unknown category or severity.
    pub fn from_entries<'a, I>(entries: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::new();
        let mut rejected = Vec::new();
        for (id, severity) in entries {
            match (category_by_id(id), Severity::parse(severity)) {
                (Some(_), Some(severity)) => config.set_severity(id, severity),
                _ => rejected.push(format!("{} = \"{}\"", id, severity)),
            }
        }
        (config, rejected)
    }

    /// Set the severity for a specific category.
    pub fn set_severity(&mut self, category_id: &str, severity: Severity) {
        self.overrides.insert(category_id.to_string(), severity);
    }

    /// Get the effective severity for a category, falling back to its default.
    pub fn effective_severity(&self, category_id: &str, default: Severity) -> Severity {
        self.overrides.get(category_id).copied().unwrap_or(default)
    }

    /// Check if a category is explicitly disabled.
    pub fn is_disabled(&self, category_id: &str) -> bool {
        self.overrides.get(category_id) == Some(&Severity::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::new();
        assert_eq!(config.effective_severity("alias-cycle", Severity::Error), Severity::Error);
        assert!(!config.is_disabled("alias-cycle"));
    }

    #[test]
    fn test_from_entries_rejects_unknown() {
        let (config, rejected) = LoggerConfig::from_entries([
            ("unused-imports", "off"),
            ("no-such-category", "error"),
            ("required", "loud"),
        ]);
        assert!(config.is_disabled("unused-imports"));
        assert_eq!(rejected.len(), 2);
    }
}
