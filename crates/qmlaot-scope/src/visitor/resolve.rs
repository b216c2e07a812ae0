//! Type-name resolution, inheritance cycles, `required` declarations and
//! import usage.

use rustc_hash::FxHashSet;

use super::ImportVisitor;
use crate::logger::{IMPORT, INHERITANCE_CYCLE, MISSING_PROPERTY, UNRESOLVED_TYPE, UNUSED_IMPORTS};
use crate::scope::{AccessSemantics, ScopeId, ScopeKind, TypeRef};
use crate::span::Span;
use crate::types::TypeLookup;

impl ImportVisitor<'_> {
    /// Resolve `name` against the inline components of the document, then
    /// the contextual types. Usage is recorded for the unused-import check.
    pub(super) fn find_type(&mut self, name: &str) -> TypeLookup {
        let local = name
            .split_once('.')
            .filter(|(prefix, _)| *prefix == self.component_name)
            .map_or(name, |(_, rest)| rest);
        if let Some(&component) = self.inline_components.get(local) {
            return TypeLookup::Found(component);
        }
        let lookup = self.types.lookup(name);
        if lookup != TypeLookup::NotFound {
            self.used_type_names.push(name.to_string());
        }
        lookup
    }

    fn report_unresolved(&mut self, name: &str, lookup: TypeLookup, location: Span) {
        match lookup {
            TypeLookup::FailedImport => self.logger.log(
                &IMPORT,
                format!("{} was not loaded because its import failed", name),
                location,
            ),
            TypeLookup::NotFound => self.logger.log(
                &UNRESOLVED_TYPE,
                format!("{} was not found. Did you add all import paths?", name),
                location,
            ),
            TypeLookup::Found(_) => {}
        }
    }

    /// Resolve a type name used in a declaration; logs when it does not
    /// resolve.
    fn resolve_declared_type(&mut self, name: &str, location: Span) -> Option<ScopeId> {
        match self.find_type(name) {
            TypeLookup::Found(id) => Some(id),
            other => {
                self.report_unresolved(name, other, location);
                None
            }
        }
    }

    pub(super) fn resolve_types(&mut self) {
        let scopes = self.document_scopes.clone();
        for scope in scopes {
            let location = self.arena[scope].location.unwrap_or_default();
            match self.arena[scope].kind {
                ScopeKind::QmlObject => self.resolve_object_base(scope, location),
                ScopeKind::GroupedProperty => self.resolve_grouped_base(scope),
                ScopeKind::AttachedProperty => self.resolve_attached_base(scope, location),
                ScopeKind::JsFunction | ScopeKind::JsLexical | ScopeKind::Enum => continue,
            }
            self.resolve_member_types(scope, location);
        }
    }

    fn resolve_object_base(&mut self, scope: ScopeId, location: Span) {
        let Some(TypeRef::Unresolved(name)) = self.arena[scope].base.clone() else {
            return;
        };
        if let TypeLookup::Found(id) = self.find_type_reporting(&name, location) {
            self.arena[scope].base = Some(TypeRef::Resolved { name, id });
        }
    }

    fn find_type_reporting(&mut self, name: &str, location: Span) -> TypeLookup {
        let lookup = self.find_type(name);
        self.report_unresolved(name, lookup, location);
        lookup
    }

    /// A grouped scope is based on the type of the property it groups.
    fn resolve_grouped_base(&mut self, scope: ScopeId) {
        let Some(parent) = self.arena[scope].parent else {
            return;
        };
        let name = self.arena[scope].internal_name.clone();
        let target = self
            .arena
            .property(parent, &name)
            .and_then(|(_, property)| property.ty.map(|ty| (property.type_name.clone(), ty)));
        if let Some((type_name, id)) = target {
            self.arena[scope].base = Some(TypeRef::Resolved { name: type_name, id });
        }
    }

    /// An attached scope is based on the attached type of the named type.
    fn resolve_attached_base(&mut self, scope: ScopeId, location: Span) {
        let name = self.arena[scope].internal_name.clone();
        let TypeLookup::Found(provider) = self.find_type_reporting(&name, location) else {
            return;
        };
        match self.arena.attached_type(provider) {
            Some(attached) => {
                let attached_name = self.arena[attached].internal_name.clone();
                self.arena[scope].base = Some(TypeRef::Resolved {
                    name: attached_name,
                    id: attached,
                });
            }
            None => self.logger.log(
                &MISSING_PROPERTY,
                format!("{} does not have an attached type", name),
                location,
            ),
        }
    }

    fn resolve_member_types(&mut self, scope: ScopeId, location: Span) {
        for index in 0..self.arena[scope].properties.len() {
            let property = &self.arena[scope].properties[index];
            if property.is_alias || property.ty.is_some() {
                continue;
            }
            let type_name = property.type_name.clone();
            let span = property.location.unwrap_or(location);
            let resolved = self.resolve_declared_type(&type_name, span);
            let is_reference = resolved.is_some_and(|id| self.arena[id].access == AccessSemantics::Reference);
            let property = &mut self.arena[scope].properties[index];
            property.ty = resolved;
            property.is_pointer = is_reference && !property.is_list;
        }

        for index in 0..self.arena[scope].methods.len() {
            let method = &self.arena[scope].methods[index];
            let span = method.location.unwrap_or(location);
            let return_type_name = method.return_type_name.clone();
            if !return_type_name.is_empty() && method.return_type.is_none() {
                let resolved = self.resolve_declared_type(&return_type_name, span);
                self.arena[scope].methods[index].return_type = resolved;
            }
            for param_index in 0..self.arena[scope].methods[index].parameters.len() {
                let parameter = &self.arena[scope].methods[index].parameters[param_index];
                if parameter.ty.is_some() {
                    continue;
                }
                let type_name = parameter.type_name.clone();
                let resolved = self.resolve_declared_type(&type_name, span);
                let is_reference =
                    resolved.is_some_and(|id| self.arena[id].access == AccessSemantics::Reference);
                let parameter = &mut self.arena[scope].methods[index].parameters[param_index];
                parameter.ty = resolved;
                parameter.is_pointer = is_reference;
            }
        }
    }

    /// Walk the base chain of every document object. A repeat closes a
    /// cycle; the link that closes it is dropped so the cycle is reported
    /// once, whichever object reaches it first.
    pub(super) fn break_inheritance_cycles(&mut self) {
        let scopes: Vec<ScopeId> = self
            .document_scopes
            .iter()
            .copied()
            .filter(|s| self.arena[*s].kind == ScopeKind::QmlObject)
            .collect();
        for original in scopes {
            let mut seen: Vec<ScopeId> = Vec::new();
            let mut seen_set = FxHashSet::default();
            let mut current = Some(original);
            while let Some(scope) = current {
                if !seen_set.insert(scope) {
                    let start = seen.iter().position(|s| *s == scope).unwrap_or(0);
                    let cycle = &seen[start..];
                    let message = format!(
                        "{} is part of an inheritance cycle: {}",
                        self.arena[scope].name(),
                        self.arena.describe_chain(cycle, scope)
                    );
                    let closing = cycle[cycle.len() - 1];
                    let location = self.arena[closing].location.unwrap_or_default();
                    self.logger.log(&INHERITANCE_CYCLE, message.clone(), location);
                    let closing_scope = &mut self.arena[closing];
                    closing_scope.base = None;
                    closing_scope.base_type_error = Some(message);
                    break;
                }
                seen.push(scope);
                current = self.arena.base_type(scope);
            }
        }
    }

    /// `required foo` marks an own or inherited property as required; an
    /// inherited one is copied into the scope first.
    pub(super) fn apply_required_declarations(&mut self) {
        let declarations = std::mem::take(&mut self.required_declarations);
        for (scope, name, location) in declarations {
            if let Some(property) = self.arena[scope].own_property_mut(&name) {
                property.is_required = true;
                continue;
            }
            match self.arena.property(scope, &name) {
                Some((_, inherited)) => {
                    let mut property = inherited.clone();
                    property.is_required = true;
                    property.location = Some(location);
                    self.arena[scope].insert_property(property);
                }
                None => self.logger.log(
                    &MISSING_PROPERTY,
                    format!("Property \"{}\" was marked as required but does not exist.", name),
                    location,
                ),
            }
        }
    }

    /// An import is used when some resolved type name came from it.
    pub(super) fn check_unused_imports(&mut self) {
        let used: FxHashSet<&str> = self.used_type_names.iter().map(String::as_str).collect();
        for import in &self.imports {
            let is_used = match &import.qualifier {
                Some(qualifier) => {
                    let prefix = format!("{}.", qualifier);
                    used.iter().any(|name| name.starts_with(&prefix))
                }
                None => used.iter().any(|name| {
                    !name.contains('.')
                        && self
                            .types
                            .get(name)
                            .and_then(|t| t.module.as_deref())
                            .is_some_and(|module| module == import.uri)
                }),
            };
            if !is_used {
                self.logger.log(&UNUSED_IMPORTS, "Unused import", import.location);
            }
        }
    }
}
