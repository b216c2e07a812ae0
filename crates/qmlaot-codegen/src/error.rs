//! Error types for code generation.

use thiserror::Error;

/// Why a function cannot be compiled ahead of time.
///
/// A rejection aborts the whole function; it keeps running in the
/// interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A construct without a native lowering
    #[error("Cannot generate efficient code for {what}")]
    Unsupported {
        /// The construct, e.g. `LoadName`
        what: String,
    },

    /// The input cannot be lowered as given
    #[error("{message}")]
    Invalid {
        /// Full message
        message: String,
    },
}

impl Rejection {
    /// Reject an unsupported construct.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Rejection::Unsupported { what: what.into() }
    }

    /// Reject invalid input.
    pub fn invalid(message: impl Into<String>) -> Self {
        Rejection::Invalid {
            message: message.into(),
        }
    }
}

/// A rejection together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{rejection}")]
pub struct RejectedFunction {
    /// Name of the function
    pub function: String,
    /// Bytecode offset of the offending instruction
    pub offset: usize,
    /// Source line of the offending instruction, if known
    pub line: Option<u32>,
    /// The rejection
    #[source]
    pub rejection: Rejection,
}

/// Errors turning raw (JSON) annotations into register contents.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// The input is not valid JSON for the expected shape
    #[error("Invalid {what}: {source}")]
    Json {
        /// What was being parsed
        what: &'static str,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A type name did not resolve
    #[error("Unknown type '{name}' in annotation at offset {offset}")]
    UnknownType {
        /// The name
        name: String,
        /// Instruction offset of the annotation
        offset: usize,
    },

    /// A member was not found on its owner
    #[error("Type '{owner}' has no {kind} '{name}' (annotation at offset {offset})")]
    UnknownMember {
        /// Owner type name
        owner: String,
        /// `property`, `method` or `enum`
        kind: &'static str,
        /// Member name
        name: String,
        /// Instruction offset of the annotation
        offset: usize,
    },

    /// A register key is not a register number
    #[error("Invalid register '{key}' in annotation at offset {offset}")]
    InvalidRegister {
        /// The key
        key: String,
        /// Instruction offset of the annotation
        offset: usize,
    },
}
