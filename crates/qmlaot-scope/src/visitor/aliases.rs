//! Alias resolution.
//!
//! Aliases may refer to other aliases declared later in the document, so
//! resolution runs in rounds over a queue of scopes. A scope goes back on
//! the queue while one of its aliases waits for another alias. A round that
//! resolves nothing means the remaining aliases wait on each other.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use super::ImportVisitor;
use crate::logger::{ALIAS_CYCLE, UNRESOLVED_ALIAS};
use crate::scope::{AccessSemantics, ScopeId};

/// Outcome of one attempt to resolve an alias.
enum AliasStep {
    Resolved,
    Pending,
    Failed(String),
}

impl ImportVisitor<'_> {
    pub(super) fn resolve_aliases(&mut self) {
        let mut queue: VecDeque<ScopeId> = self.alias_scopes.iter().copied().collect();
        let mut abandoned: FxHashSet<(ScopeId, String)> = FxHashSet::default();

        while !queue.is_empty() {
            self.alias_rounds += 1;
            let mut requeue = Vec::new();
            let mut progress = false;

            while let Some(scope) = queue.pop_front() {
                let mut waiting = false;
                for name in self.unresolved_aliases(scope, &abandoned) {
                    match self.resolve_alias(scope, &name, &abandoned) {
                        AliasStep::Resolved => progress = true,
                        AliasStep::Pending => waiting = true,
                        AliasStep::Failed(message) => {
                            let location = self.alias_location(scope, &name);
                            self.logger.log(&UNRESOLVED_ALIAS, message, location);
                            abandoned.insert((scope, name));
                            progress = true;
                        }
                    }
                }
                if waiting {
                    requeue.push(scope);
                }
            }

            if requeue.is_empty() {
                break;
            }
            if !progress {
                for scope in requeue {
                    for name in self.unresolved_aliases(scope, &abandoned) {
                        let location = self.alias_location(scope, &name);
                        self.logger.log(
                            &ALIAS_CYCLE,
                            format!("Alias \"{}\" is part of an alias cycle", name),
                            location,
                        );
                        abandoned.insert((scope, name));
                    }
                }
                break;
            }
            queue.extend(requeue);
        }
        tracing::debug!(rounds = self.alias_rounds, abandoned = abandoned.len(), "resolved aliases");
    }

    fn unresolved_aliases(&self, scope: ScopeId, abandoned: &FxHashSet<(ScopeId, String)>) -> Vec<String> {
        self.arena[scope]
            .properties
            .iter()
            .filter(|p| p.is_alias && p.ty.is_none())
            .filter(|p| !abandoned.contains(&(scope, p.name.clone())))
            .map(|p| p.name.clone())
            .collect()
    }

    fn alias_location(&self, scope: ScopeId, name: &str) -> crate::span::Span {
        self.arena[scope]
            .own_property(name)
            .and_then(|p| p.location)
            .or(self.arena[scope].location)
            .unwrap_or_default()
    }

    /// Follow `id.prop.subprop` through the id table and the property
    /// types of the target.
    fn resolve_alias(
        &mut self,
        scope: ScopeId,
        name: &str,
        abandoned: &FxHashSet<(ScopeId, String)>,
    ) -> AliasStep {
        let Some(expression) = self.arena[scope]
            .own_property(name)
            .and_then(|p| p.alias_expression.clone())
        else {
            return AliasStep::Failed(format!("Alias \"{}\" has no target", name));
        };
        let mut segments = expression.split('.');
        let id = segments.next().unwrap_or_default();
        let Some(object) = self.ids.get(id) else {
            return AliasStep::Failed(format!(
                "Cannot deduce type of alias \"{}\": \"{}\" is not an id",
                name, id
            ));
        };
        let path: Vec<&str> = segments.collect();

        if path.is_empty() {
            let is_reference = self.arena[object].access == AccessSemantics::Reference;
            if let Some(alias) = self.arena[scope].own_property_mut(name) {
                alias.ty = Some(object);
                alias.is_writable = false;
                alias.is_pointer = is_reference;
                alias.is_list = false;
                alias.alias_target_scope = Some(object);
            }
            return AliasStep::Resolved;
        }

        let mut current = object;
        for (position, segment) in path.iter().enumerate() {
            let Some((owner, target)) = self.arena.property(current, segment) else {
                return AliasStep::Failed(format!(
                    "Cannot deduce type of alias \"{}\": \"{}\" has no property \"{}\"",
                    name,
                    self.arena[current].name(),
                    segment
                ));
            };
            if target.is_alias && target.ty.is_none() {
                if abandoned.contains(&(owner, target.name.clone())) {
                    return AliasStep::Failed(format!(
                        "Cannot deduce type of alias \"{}\": target alias \"{}\" is unresolved",
                        name, segment
                    ));
                }
                return AliasStep::Pending;
            }
            let Some(ty) = target.ty else {
                return AliasStep::Failed(format!(
                    "Cannot deduce type of alias \"{}\": type {} of \"{}\" is unresolved",
                    name, target.type_name, segment
                ));
            };

            if position + 1 == path.len() {
                let resolved = target.clone();
                if let Some(alias) = self.arena[scope].own_property_mut(name) {
                    alias.ty = Some(ty);
                    alias.type_name = resolved.type_name;
                    alias.is_list = resolved.is_list;
                    alias.is_pointer = resolved.is_pointer;
                    alias.is_writable = resolved.is_writable;
                    alias.alias_target_scope = Some(current);
                    alias.alias_target_name = Some(segment.to_string());
                }
                return AliasStep::Resolved;
            }
            current = ty;
        }
        AliasStep::Failed(format!("Cannot deduce type of alias \"{}\"", name))
    }
}
