//! Signal handler resolution.

use super::{ImportVisitor, PendingHandler};
use crate::binding::{BindingContent, ScriptBindingKind};
use crate::logger::{SIGNAL, SIGNAL_HANDLER_PARAMETERS};
use crate::meta::{JsIdentifier, JsIdentifierKind, Parameter};
use crate::scope::{AccessSemantics, ScopeId};
use crate::span::Span;

/// A handler binding matched to the signal it handles.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHandler {
    /// Scope the handler is bound on
    pub scope: ScopeId,
    /// Handler name (`onClicked`)
    pub handler: String,
    /// Signal name (`clicked`)
    pub signal: String,
    /// Parameter names the handler body sees
    pub parameters: Vec<String>,
    /// Whether the signal is a property change signal
    pub is_change_handler: bool,
    /// Binding location
    pub location: Span,
}

/// `onClicked` -> `clicked`, `onXChanged` -> `xChanged`.
pub(crate) fn signal_name(handler: &str) -> Option<String> {
    let rest = handler.strip_prefix("on")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

impl ImportVisitor<'_> {
    pub(super) fn resolve_signal_handlers(&mut self) {
        let pending = std::mem::take(&mut self.pending_handlers);
        for handler in &pending {
            self.resolve_signal_handler(handler);
        }
    }

    fn resolve_signal_handler(&mut self, handler: &PendingHandler) {
        if !self.arena.is_fully_resolved(handler.scope) {
            return;
        }
        let Some(signal) = signal_name(&handler.handler_name) else {
            return;
        };

        let found = self
            .arena
            .methods(handler.scope, &signal)
            .into_iter()
            .find(|(_, method)| method.kind == crate::meta::MethodKind::Signal)
            .map(|(_, method)| (method.parameters.clone(), method.is_implicit));

        let (signal_parameters, is_change_handler) = match found {
            Some((parameters, is_implicit)) => {
                let is_notify = self.is_notify_signal(handler.scope, &signal);
                (parameters, is_implicit || is_notify)
            }
            None => {
                let property = signal.strip_suffix("Changed").filter(|p| !p.is_empty());
                match property {
                    Some(property) if self.arena.has_property(handler.scope, property) => (Vec::new(), true),
                    _ => {
                        self.logger.log(
                            &SIGNAL,
                            format!("no matching signal found for handler \"{}\"", handler.handler_name),
                            handler.location,
                        );
                        return;
                    }
                }
            }
        };

        self.check_handler_parameters(handler, &signal, &signal_parameters);
        self.check_signal_parameter_passing(&signal, &signal_parameters, handler.location);

        let names: Vec<String> = if handler.parameters.is_empty() {
            for parameter in &signal_parameters {
                self.arena[handler.function_scope].js_identifiers.insert(
                    parameter.name.clone(),
                    JsIdentifier {
                        kind: JsIdentifierKind::Injected,
                        location: handler.location,
                    },
                );
            }
            signal_parameters.iter().map(|p| p.name.clone()).collect()
        } else {
            handler.parameters.iter().map(|p| p.name.clone()).collect()
        };

        if is_change_handler {
            if let BindingContent::Script { kind, .. } =
                &mut self.arena[handler.scope].bindings[handler.binding_index].content
            {
                *kind = ScriptBindingKind::ChangeHandler;
            }
        }

        self.signal_handlers.push(SignalHandler {
            scope: handler.scope,
            handler: handler.handler_name.clone(),
            signal,
            parameters: names,
            is_change_handler,
            location: handler.location,
        });
    }

    fn is_notify_signal(&self, scope: ScopeId, signal: &str) -> bool {
        self.arena.base_chain(scope).iter().any(|owner| {
            self.arena[*owner]
                .properties
                .iter()
                .any(|p| p.notify.as_deref() == Some(signal))
        })
    }

    fn check_handler_parameters(&mut self, handler: &PendingHandler, signal: &str, signal_parameters: &[Parameter]) {
        if handler.parameters.len() > signal_parameters.len() {
            self.logger.log(
                &SIGNAL,
                format!(
                    "Signal handler for \"{}\" has more formal parameters than the signal it handles.",
                    signal
                ),
                handler.location,
            );
            return;
        }

        for (i, parameter) in handler.parameters.iter().enumerate() {
            let Some(j) = signal_parameters.iter().position(|p| p.name == parameter.name) else {
                continue;
            };
            if i != j {
                self.logger.log(
                    &SIGNAL_HANDLER_PARAMETERS,
                    format!(
                        "Parameter {} to signal handler for \"{}\" is called \"{}\". The signal has a parameter of the same name in position {}.",
                        i + 1,
                        signal,
                        parameter.name,
                        j + 1
                    ),
                    parameter.location,
                );
            }
        }
    }

    /// Reference types must travel by pointer and value types by value for
    /// the handler to be compiled.
    fn check_signal_parameter_passing(&mut self, signal: &str, parameters: &[Parameter], location: Span) {
        for parameter in parameters {
            let Some(ty) = parameter.ty else {
                continue;
            };
            let type_name = self.arena[ty].name().to_string();
            match self.arena[ty].access {
                AccessSemantics::Reference if !parameter.is_pointer => self.logger.log(
                    &SIGNAL,
                    format!(
                        "Type {} of parameter {} in signal called {} should be passed by pointer to be able to compile.",
                        type_name, parameter.name, signal
                    ),
                    location,
                ),
                AccessSemantics::Value if parameter.is_pointer => self.logger.log(
                    &SIGNAL,
                    format!(
                        "Type {} of parameter {} in signal called {} should be passed by value or const reference to be able to compile.",
                        type_name, parameter.name, signal
                    ),
                    location,
                ),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_name_from_handler() {
        assert_eq!(signal_name("onClicked").as_deref(), Some("clicked"));
        assert_eq!(signal_name("onWidthChanged").as_deref(), Some("widthChanged"));
        assert_eq!(signal_name("on"), None);
    }
}
