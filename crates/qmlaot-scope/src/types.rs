//! The contextual type table: what each type name means in a document.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::scope::ScopeId;

/// `major.minor` revision a type name was exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TypeVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
}

impl TypeVersion {
    /// Create a version.
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parse `"2.15"` or `"6"`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(2, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(Self { major, minor })
    }
}

impl fmt::Display for TypeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// One entry of the contextual type table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedType {
    /// The type. `None` marks a name whose import failed.
    pub scope: Option<ScopeId>,
    /// Revision the name was exported with
    pub revision: Option<TypeVersion>,
    /// Import that provided the name
    pub module: Option<String>,
}

/// Result of looking a name up in [`ContextualTypes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeLookup {
    /// The name resolved
    Found(ScopeId),
    /// The name is known but its import failed
    FailedImport,
    /// The name is unknown
    NotFound,
}

/// Name → type mapping visible to one document.
///
/// Qualified imports register their names with the qualifier prefix
/// (`QQ.Item`).
#[derive(Debug, Clone, Default)]
pub struct ContextualTypes {
    types: FxHashMap<String, ImportedType>,
    array_type: Option<ScopeId>,
}

impl ContextualTypes {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`.
    pub fn insert(&mut self, name: impl Into<String>, imported: ImportedType) {
        self.types.insert(name.into(), imported);
    }

    /// Register `name` as provided by `module`.
    pub fn insert_type(&mut self, name: impl Into<String>, scope: ScopeId, module: Option<&str>) {
        self.insert(
            name,
            ImportedType {
                scope: Some(scope),
                revision: None,
                module: module.map(str::to_string),
            },
        );
    }

    /// Register `name` as coming from a failed import.
    pub fn insert_failed(&mut self, name: impl Into<String>, module: Option<&str>) {
        self.insert(
            name,
            ImportedType {
                scope: None,
                revision: None,
                module: module.map(str::to_string),
            },
        );
    }

    /// Raw entry for `name`.
    pub fn get(&self, name: &str) -> Option<&ImportedType> {
        self.types.get(name)
    }

    /// Look `name` up.
    pub fn lookup(&self, name: &str) -> TypeLookup {
        match self.types.get(name) {
            Some(ImportedType { scope: Some(id), .. }) => TypeLookup::Found(*id),
            Some(ImportedType { scope: None, .. }) => TypeLookup::FailedImport,
            None => TypeLookup::NotFound,
        }
    }

    /// Resolve a type name as written in a signature: `QQuickItem *`,
    /// `const QString &`. Returns the type and whether it was a pointer.
    pub fn resolve_signature_type(&self, name: &str) -> (Option<ScopeId>, bool) {
        let mut trimmed = name.trim();
        trimmed = trimmed.strip_prefix("const ").unwrap_or(trimmed).trim();
        trimmed = trimmed.strip_suffix('&').unwrap_or(trimmed).trim();
        let (base, is_pointer) = match trimmed.strip_suffix('*') {
            Some(base) => (base.trim(), true),
            None => (trimmed, false),
        };
        match self.lookup(base) {
            TypeLookup::Found(id) => (Some(id), is_pointer),
            _ => (None, is_pointer),
        }
    }

    /// Whether `name` is in the table (resolved or not).
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// The distinguished list type.
    pub fn array_type(&self) -> Option<ScopeId> {
        self.array_type
    }

    /// Set the distinguished list type.
    pub fn set_array_type(&mut self, id: ScopeId) {
        self.array_type = Some(id);
    }

    /// First name that maps to `id`, preferring unqualified names.
    pub fn name_of(&self, id: ScopeId) -> Option<&str> {
        let mut names: Vec<&str> = self
            .types
            .iter()
            .filter(|(_, t)| t.scope == Some(id))
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_by_key(|name| (name.contains('.'), name.len(), *name));
        names.first().copied()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImportedType)> {
        self.types.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
