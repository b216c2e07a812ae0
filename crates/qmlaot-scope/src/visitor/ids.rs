//! The document-wide id table.

use rustc_hash::FxHashMap;

use super::ImportVisitor;
use crate::document::BindingValue;
use crate::logger::{RelatedLocation, DUPLICATED_NAME, SYNTAX};
use crate::scope::{ScopeId, ScopeKind};
use crate::span::Span;

/// An `id:` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdEntry {
    /// Scope that declared the id
    pub scope: ScopeId,
    /// Location of the declaration
    pub location: Span,
}

/// Map from id to the object that declared it.
#[derive(Debug, Clone, Default)]
pub struct IdTable {
    entries: FxHashMap<String, IdEntry>,
    order: Vec<String>,
}

impl IdTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`. Returns the existing entry if the id was taken, in
    /// which case the table is left unchanged.
    pub fn insert(&mut self, name: &str, scope: ScopeId, location: Span) -> Result<(), IdEntry> {
        if let Some(existing) = self.entries.get(name) {
            return Err(*existing);
        }
        self.entries.insert(name.to_string(), IdEntry { scope, location });
        self.order.push(name.to_string());
        Ok(())
    }

    /// Scope declaring `name`.
    pub fn get(&self, name: &str) -> Option<ScopeId> {
        self.entries.get(name).map(|entry| entry.scope)
    }

    /// Entry for `name`.
    pub fn entry(&self, name: &str) -> Option<&IdEntry> {
        self.entries.get(name)
    }

    /// Id of `scope`, if it has one.
    pub fn id_of(&self, scope: ScopeId) -> Option<&str> {
        self.order
            .iter()
            .find(|name| self.entries.get(name.as_str()).map(|e| e.scope) == Some(scope))
            .map(String::as_str)
    }

    /// Ids in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IdEntry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|entry| (name.as_str(), entry)))
    }

    /// Number of ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no id was declared.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn is_valid_id(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl ImportVisitor<'_> {
    pub(super) fn visit_id_binding(&mut self, scope: ScopeId, value: &BindingValue, location: Span) {
        let name = match value {
            BindingValue::Identifier { name } => name,
            _ => {
                self.logger
                    .log(&SYNTAX, "Failed to parse id: expected an identifier", location);
                return;
            }
        };
        if self.arena[scope].kind != ScopeKind::QmlObject {
            self.logger.log(
                &SYNTAX,
                format!("id {} can only be declared on an object", name),
                location,
            );
            return;
        }
        if !is_valid_id(name) {
            self.logger.log(
                &SYNTAX,
                format!("Id {} must start with a lower case letter or an '_'", name),
                location,
            );
            return;
        }
        if let Err(first) = self.ids.insert(name, scope, location) {
            self.logger.log_with_related(
                &DUPLICATED_NAME,
                format!(
                    "Found a duplicated id. id {} was first declared at {}:{}",
                    name, first.location.line, first.location.column
                ),
                location,
                vec![RelatedLocation {
                    span: first.location,
                    message: "first declaration".to_string(),
                }],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeArena;

    #[test]
    fn test_first_declaration_wins() {
        let mut arena = ScopeArena::new();
        let a = arena.create(ScopeKind::QmlObject, None);
        let b = arena.create(ScopeKind::QmlObject, Some(a));
        let mut ids = IdTable::new();
        assert!(ids.insert("foo", a, Span::new(0, 3, 1, 1)).is_ok());
        let first = ids.insert("foo", b, Span::new(10, 13, 2, 1)).expect_err("duplicate");
        assert_eq!(first.scope, a);
        assert_eq!(ids.get("foo"), Some(a));
        assert_eq!(ids.id_of(a), Some("foo"));
        assert_eq!(ids.id_of(b), None);
    }

    #[test]
    fn test_id_validity() {
        assert!(is_valid_id("root"));
        assert!(is_valid_id("_private1"));
        assert!(!is_valid_id("Root"));
        assert!(!is_valid_id("a-b"));
        assert!(!is_valid_id(""));
    }
}
