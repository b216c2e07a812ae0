//! Default property assignment and object-binding checks.

use crate::binding::{BindingContent, PropertyBinding};
use crate::logger::{INCOMPATIBLE_TYPE, MISSING_PROPERTY, NON_LIST_PROPERTY};
use crate::scope::ScopeId;
use crate::span::Span;

use super::ImportVisitor;

/// Objects declared directly inside a parent, assigned to the parent's
/// default property.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAssignment {
    /// Parent object
    pub parent: ScopeId,
    /// Name of the default property
    pub property: String,
    /// Assigned children in source order
    pub children: Vec<ScopeId>,
}

/// Native types that turn an `on` value source into an interceptor.
const INTERCEPTOR_TYPES: &[&str] = &["QQmlPropertyValueInterceptor", "QQuickBehavior"];

impl ImportVisitor<'_> {
    pub(super) fn assign_default_properties(&mut self) {
        let mut grouped: Vec<(ScopeId, Vec<(ScopeId, Span)>)> = Vec::new();
        for &(parent, child, location) in &self.pending_defaults {
            match grouped.iter_mut().find(|(p, _)| *p == parent) {
                Some((_, children)) => children.push((child, location)),
                None => grouped.push((parent, vec![(child, location)])),
            }
        }

        for (parent, children) in grouped {
            if !self.arena.is_fully_resolved(parent) {
                continue;
            }
            let Some(name) = self.arena.default_property_name(parent).map(str::to_string) else {
                let location = children.first().map(|(_, l)| *l).unwrap_or_default();
                self.logger.log(
                    &MISSING_PROPERTY,
                    "Cannot assign to non-existent default property",
                    location,
                );
                continue;
            };
            let Some((_, property)) = self.arena.property(parent, &name) else {
                let location = children.first().map(|(_, l)| *l).unwrap_or_default();
                self.logger.log(
                    &MISSING_PROPERTY,
                    format!("Cannot assign to non-existent default property \"{}\"", name),
                    location,
                );
                continue;
            };
            let (is_list, property_type) = (property.is_list, property.ty);

            if !is_list && children.len() > 1 {
                self.logger.log(
                    &NON_LIST_PROPERTY,
                    "Cannot assign multiple objects to a default non-list property",
                    children[1].1,
                );
            }

            for &(child, location) in &children {
                self.arena[parent].bindings.push(PropertyBinding::new(
                    name.as_str(),
                    location,
                    BindingContent::Object(child),
                ));
                if let Some(property_type) = property_type {
                    self.check_assigned_object(property_type, child, &name, location);
                }
            }
            self.default_assignments.push(DefaultAssignment {
                parent,
                property: name,
                children: children.into_iter().map(|(child, _)| child).collect(),
            });
        }
    }

    pub(super) fn check_object_bindings(&mut self) {
        let bindings = std::mem::take(&mut self.object_bindings);
        for binding in &bindings {
            if let BindingContent::ValueSource(child) = self.arena[binding.owner].bindings[binding.binding_index].content {
                let is_interceptor = self
                    .arena
                    .base_chain(child)
                    .iter()
                    .any(|scope| INTERCEPTOR_TYPES.contains(&self.arena[*scope].internal_name.as_str()));
                if is_interceptor {
                    self.arena[binding.owner].bindings[binding.binding_index].content =
                        BindingContent::Interceptor(child);
                }
                continue;
            }

            if !self.arena.is_fully_resolved(binding.owner) {
                continue;
            }
            let Some(property_type) = self
                .arena
                .property(binding.owner, &binding.property)
                .and_then(|(_, property)| property.ty)
            else {
                continue;
            };
            self.check_assigned_object(property_type, binding.child, &binding.property, binding.location);
        }
        self.object_bindings = bindings;
    }

    /// Warn about an object that cannot be stored in a property of type
    /// `property_type`, and mark objects that get wrapped in an implicit
    /// component.
    fn check_assigned_object(&mut self, property_type: ScopeId, child: ScopeId, property: &str, location: Span) {
        if !self.arena.is_fully_resolved(child) {
            return;
        }
        let component = self.builtins.component;
        if self.arena.inherits(property_type, component) && !self.arena.inherits(child, component) {
            self.implicit_components.insert(child);
            return;
        }
        if self.accepts_any_object(property_type) || self.arena.inherits(child, property_type) {
            return;
        }
        self.logger.log(
            &INCOMPATIBLE_TYPE,
            format!(
                "Cannot assign object of type {} to property \"{}\" of type {}",
                self.arena[child].name(),
                property,
                self.arena[property_type].name()
            ),
            location,
        );
    }

    fn accepts_any_object(&self, property_type: ScopeId) -> bool {
        [self.builtins.var, self.builtins.js_value, self.builtins.object]
            .contains(&property_type)
    }
}
