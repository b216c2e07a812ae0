//! QML scope model and import visitor
//!
//! Builds the compile-time scope graph of one QML document and resolves it
//! against a table of known types.
//!
//! This crate provides:
//! - The scope arena with properties, methods, enums and bindings
//! - Contextual type tables and the builtin types
//! - A loader for JSON type descriptions
//! - The import visitor (ids, aliases, default and required properties,
//!   signal handlers, inheritance cycles, unused imports)
//! - A categorized diagnostics logger with codespan rendering
//!
//! # Usage
//!
//! ```ignore
//! use qmlaot_scope::{builtins, Document, ImportVisitor, LoggerConfig, ScopeArena, ContextualTypes};
//!
//! let mut arena = ScopeArena::new();
//! let mut types = ContextualTypes::new();
//! let builtins = builtins::install(&mut arena, &mut types);
//! TypeDescription::from_json(&json)?.load_into(&mut arena, &mut types, &builtins, None)?;
//!
//! let document = Document::from_json(&source)?;
//! let result = ImportVisitor::new(&mut arena, &types, &builtins, LoggerConfig::new()).visit(&document);
//! for diagnostic in result.logger.diagnostics() {
//!     println!("{}: {}", diagnostic.span, diagnostic.message);
//! }
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod builtins;
pub mod config;
pub mod description;
pub mod diagnostic;
pub mod document;
pub mod error;
pub mod logger;
pub mod meta;
pub mod scope;
pub mod span;
pub mod types;
pub mod visitor;

// Re-export main types
pub use binding::{BindingContent, PropertyBinding, ScriptBindingKind};
pub use builtins::BuiltinTypes;
pub use config::LoggerConfig;
pub use description::TypeDescription;
pub use diagnostic::{Diagnostic, ErrorCode, JsonDiagnostic};
pub use document::Document;
pub use error::DescriptionError;
pub use logger::{LogCategory, LoggedDiagnostic, Logger, Severity};
pub use meta::{Enumeration, Method, MethodKind, Parameter, Property};
pub use scope::{AccessSemantics, Scope, ScopeArena, ScopeId, ScopeKind, TypeRef};
pub use span::Span;
pub use types::{ContextualTypes, TypeLookup};
pub use visitor::{ImportVisitor, VisitResult};
