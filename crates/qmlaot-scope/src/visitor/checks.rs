//! Checks that run once the scope tree is fully resolved.

use rustc_hash::FxHashSet;

use super::ImportVisitor;
use crate::binding::BindingContent;
use crate::logger::{MISSING_PROPERTY, REQUIRED};
use crate::scope::{ScopeId, ScopeKind};

impl ImportVisitor<'_> {
    /// Bindings to properties the type chain does not declare.
    pub(super) fn check_property_bindings(&mut self) {
        let scopes = self.document_scopes.clone();
        for scope in scopes {
            let kind = self.arena[scope].kind;
            if !matches!(kind, ScopeKind::QmlObject | ScopeKind::GroupedProperty | ScopeKind::AttachedProperty) {
                continue;
            }
            if !self.arena.is_fully_resolved(scope) || self.arena[scope].base.is_none() {
                continue;
            }

            let missing: Vec<_> = self.arena[scope]
                .bindings
                .iter()
                .filter(|binding| binding.is_property_binding())
                .filter(|binding| !matches!(binding.content, BindingContent::AttachedProperty(_)))
                .filter(|binding| !self.arena.has_property(scope, &binding.property_name))
                .map(|binding| (binding.property_name.clone(), binding.location))
                .collect();
            for (name, location) in missing {
                self.logger.log(
                    &MISSING_PROPERTY,
                    format!("Could not find property \"{}\".", name),
                    location,
                );
            }
        }
    }

    /// Required properties left unbound by an instantiation.
    pub(super) fn check_required_properties(&mut self, root: ScopeId) {
        let scopes = self.document_scopes.clone();
        for scope in scopes {
            let s = &self.arena[scope];
            if scope == root
                || s.kind != ScopeKind::QmlObject
                || s.is_inline_component
                || self.implicit_components.contains(&scope)
            {
                continue;
            }

            let chain = self.arena.base_chain(scope);
            let mut reported = FxHashSet::default();
            let mut missing = Vec::new();
            for (level, owner) in chain.iter().enumerate() {
                for property in self.arena[*owner].properties.iter().filter(|p| p.is_required) {
                    if reported.contains(&property.name) {
                        continue;
                    }
                    let bound = chain[..=level]
                        .iter()
                        .any(|scope| self.arena[*scope].has_own_binding(&property.name));
                    if bound || self.aliased_from_root(root, scope, &property.name) {
                        continue;
                    }
                    reported.insert(property.name.clone());
                    let owner_name = if *owner == scope {
                        "here".to_string()
                    } else {
                        self.arena[*owner].name().to_string()
                    };
                    missing.push(format!(
                        "Component is missing required property {} from {}",
                        property.name, owner_name
                    ));
                }
            }

            let location = self.arena[scope].location.unwrap_or_default();
            for message in missing {
                self.logger.log(&REQUIRED, message, location);
            }
        }
    }

    /// A root alias targeting `scope.name` lets the user of the document
    /// bind the required property.
    fn aliased_from_root(&self, root: ScopeId, scope: ScopeId, name: &str) -> bool {
        self.arena[root].properties.iter().any(|property| {
            property.is_alias
                && property.alias_target_scope == Some(scope)
                && property.alias_target_name.as_deref() == Some(name)
        })
    }
}
