//! Error types for loading visitor inputs
//!
//! The visitor itself never fails; everything it finds is logged. Only the
//! deserialization of type descriptions and documents can fail outright.

use thiserror::Error;

/// Errors that can occur while loading a type description or a document
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The input is not valid JSON for the expected shape
    #[error("Invalid {what}: {source}")]
    Json {
        /// What was being read ("type description", "document")
        what: &'static str,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Two components export the same QML name from one module
    #[error("Type '{name}' is exported twice by module '{module}'")]
    DuplicateExport {
        /// Exported name
        name: String,
        /// Module exporting it
        module: String,
    },

    /// A component has no name
    #[error("Component #{index} in module '{module}' has no name")]
    UnnamedComponent {
        /// Position of the component in the description
        index: usize,
        /// Module containing it
        module: String,
    },
}
