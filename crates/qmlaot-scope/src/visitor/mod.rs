//! The scope/import visitor.
//!
//! [`ImportVisitor::visit`] walks a [`Document`] once to build the scope
//! tree, then runs the resolution passes in order:
//!
//! 1. type names (bases, property and method types, grouped/attached bases)
//! 2. inheritance cycles
//! 3. `required` declarations
//! 4. aliases (fixpoint over a work queue)
//! 5. default properties and object bindings
//! 6. bindings to missing properties
//! 7. signal handlers
//! 8. required properties
//! 9. unused imports
//!
//! Nothing here fails: problems are logged and the affected scopes stay
//! partially resolved.

mod aliases;
mod checks;
mod defaults;
mod ids;
mod resolve;
mod signals;

pub use defaults::DefaultAssignment;
pub use ids::{IdEntry, IdTable};
pub use signals::SignalHandler;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::binding::{BindingContent, PropertyBinding, ScriptBindingKind};
use crate::builtins::BuiltinTypes;
use crate::config::LoggerConfig;
use crate::document::{
    BindingDeclaration, BindingValue, Document, Import, Member, ObjectDefinition,
    ParameterDeclaration, PropertyDeclaration,
};
use crate::logger::{Logger, DUPLICATED_NAME, SYNTAX};
use crate::meta::{Enumeration, JsIdentifier, JsIdentifierKind, Method, MethodKind, Parameter, Property};
use crate::scope::{ScopeArena, ScopeId, ScopeKind, TypeRef};
use crate::span::Span;
use crate::types::ContextualTypes;

/// Everything the visitor produced for one document.
#[derive(Debug)]
pub struct VisitResult {
    /// Root object scope
    pub root: ScopeId,
    /// Document-wide ids
    pub ids: IdTable,
    /// Inline components by name
    pub inline_components: FxHashMap<String, ScopeId>,
    /// Children assigned to default properties, per parent
    pub default_assignments: Vec<DefaultAssignment>,
    /// Resolved signal handlers
    pub signal_handlers: Vec<SignalHandler>,
    /// Objects wrapped in an implicit component
    pub implicit_components: FxHashSet<ScopeId>,
    /// Number of alias resolution rounds that ran
    pub alias_rounds: usize,
    /// Scopes created for this document, in creation order
    pub scopes: Vec<ScopeId>,
    /// Diagnostics
    pub logger: Logger,
}

/// A handler binding waiting for its signal to be looked up.
#[derive(Debug, Clone)]
struct PendingHandler {
    scope: ScopeId,
    binding_index: usize,
    handler_name: String,
    parameters: Vec<ParameterDeclaration>,
    function_scope: ScopeId,
    location: Span,
}

/// An object bound to a named property.
#[derive(Debug, Clone)]
struct ObjectBinding {
    owner: ScopeId,
    property: String,
    child: ScopeId,
    binding_index: usize,
    location: Span,
}

/// Builds the scope tree of one document.
pub struct ImportVisitor<'a> {
    arena: &'a mut ScopeArena,
    types: &'a ContextualTypes,
    builtins: &'a BuiltinTypes,
    logger: Logger,
    file_path: String,
    component_name: String,
    imports: Vec<Import>,
    used_type_names: Vec<String>,
    ids: IdTable,
    inline_components: FxHashMap<String, ScopeId>,
    document_scopes: Vec<ScopeId>,
    pending_defaults: Vec<(ScopeId, ScopeId, Span)>,
    object_bindings: Vec<ObjectBinding>,
    alias_scopes: Vec<ScopeId>,
    required_declarations: Vec<(ScopeId, String, Span)>,
    pending_handlers: Vec<PendingHandler>,
    implicit_components: FxHashSet<ScopeId>,
    default_assignments: Vec<DefaultAssignment>,
    signal_handlers: Vec<SignalHandler>,
    alias_rounds: usize,
}

impl<'a> ImportVisitor<'a> {
    /// Create a visitor that adds scopes to `arena` and resolves names
    /// through `types`.
    pub fn new(
        arena: &'a mut ScopeArena,
        types: &'a ContextualTypes,
        builtins: &'a BuiltinTypes,
        config: LoggerConfig,
    ) -> Self {
        Self {
            arena,
            types,
            builtins,
            logger: Logger::with_config(config),
            file_path: String::new(),
            component_name: String::new(),
            imports: Vec::new(),
            used_type_names: Vec::new(),
            ids: IdTable::new(),
            inline_components: FxHashMap::default(),
            document_scopes: Vec::new(),
            pending_defaults: Vec::new(),
            object_bindings: Vec::new(),
            alias_scopes: Vec::new(),
            required_declarations: Vec::new(),
            pending_handlers: Vec::new(),
            implicit_components: FxHashSet::default(),
            default_assignments: Vec::new(),
            signal_handlers: Vec::new(),
            alias_rounds: 0,
        }
    }

    /// Build and resolve the scope tree of `document`.
    pub fn visit(mut self, document: &Document) -> VisitResult {
        let _span = tracing::debug_span!("visit", file = %document.file_path).entered();
        self.file_path = document.file_path.clone();
        self.component_name = document.component_name().to_string();
        self.imports = document.imports.clone();

        let root = self.visit_object(&document.root, None);
        for pragma in &document.pragmas {
            if pragma.name == "Singleton" {
                self.arena[root].is_singleton = true;
            }
        }
        tracing::debug!(scopes = self.document_scopes.len(), ids = self.ids.len(), "built scope tree");

        self.resolve_types();
        self.break_inheritance_cycles();
        self.apply_required_declarations();
        self.resolve_aliases();
        self.assign_default_properties();
        self.check_object_bindings();
        self.check_property_bindings();
        self.resolve_signal_handlers();
        self.check_required_properties(root);
        self.check_unused_imports();
        tracing::debug!(
            diagnostics = self.logger.diagnostics().len(),
            alias_rounds = self.alias_rounds,
            "resolved document"
        );

        VisitResult {
            root,
            ids: self.ids,
            inline_components: self.inline_components,
            default_assignments: self.default_assignments,
            signal_handlers: self.signal_handlers,
            implicit_components: self.implicit_components,
            alias_rounds: self.alias_rounds,
            scopes: self.document_scopes,
            logger: self.logger,
        }
    }

    fn create_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, location: Span) -> ScopeId {
        let id = self.arena.create(kind, parent);
        self.arena[id].location = Some(location);
        self.document_scopes.push(id);
        id
    }

    fn visit_object(&mut self, definition: &ObjectDefinition, parent: Option<ScopeId>) -> ScopeId {
        let id = self.create_scope(ScopeKind::QmlObject, parent, definition.location);
        {
            let scope = &mut self.arena[id];
            scope.base = Some(TypeRef::Unresolved(definition.type_name.clone()));
            scope.is_composite = true;
            scope.file_path = Some(self.file_path.clone());
        }
        for member in &definition.members {
            self.visit_member(id, member);
        }
        id
    }

    fn visit_member(&mut self, scope: ScopeId, member: &Member) {
        match member {
            Member::Property(declaration) => self.visit_property(scope, declaration),
            Member::Signal(declaration) => {
                if self.arena[scope].own_methods(&declaration.name).any(|m| m.kind == MethodKind::Signal) {
                    self.logger.log(
                        &DUPLICATED_NAME,
                        format!("Duplicated signal name \"{}\".", declaration.name),
                        declaration.location,
                    );
                }
                let mut signal = Method::new(&declaration.name, MethodKind::Signal);
                signal.parameters = declaration.parameters.iter().map(declared_parameter).collect();
                signal.location = Some(declaration.location);
                self.arena[scope].methods.push(signal);
            }
            Member::Function(declaration) => {
                if self.arena[scope].own_methods(&declaration.name).next().is_some() {
                    self.logger.log(
                        &DUPLICATED_NAME,
                        format!("Duplicated method name \"{}\".", declaration.name),
                        declaration.location,
                    );
                }
                let relative = self.arena[scope].function_table.len();
                self.arena[scope].function_table.push(declaration.function_index);

                let mut method = Method::new(&declaration.name, MethodKind::Method);
                method.parameters = declaration.parameters.iter().map(declared_parameter).collect();
                method.return_type_name = declaration.return_type.clone().unwrap_or_default();
                method.relative_function_index = Some(relative);
                method.location = Some(declaration.location);
                self.arena[scope].methods.push(method);

                let function = self.create_function_scope(scope, &declaration.parameters, declaration.location);
                for local in &declaration.locals {
                    let kind = match local.kind {
                        crate::document::LocalKind::Var => JsIdentifierKind::FunctionScoped,
                        crate::document::LocalKind::Let => JsIdentifierKind::LexicalScoped,
                        crate::document::LocalKind::Const => JsIdentifierKind::Constant,
                    };
                    self.arena[function].js_identifiers.insert(
                        local.name.clone(),
                        JsIdentifier {
                            kind,
                            location: local.location,
                        },
                    );
                }
            }
            Member::Enum(declaration) => {
                let mut enumeration = Enumeration {
                    name: declaration.name.clone(),
                    ..Enumeration::default()
                };
                let mut next = 0;
                for key in &declaration.keys {
                    let value = key.value.unwrap_or(next);
                    enumeration.keys.push(key.name.clone());
                    enumeration.values.push(value);
                    next = value.wrapping_add(1);
                }
                self.arena[scope].enums.push(enumeration);
                let index = self.arena[scope].enums.len() - 1;
                let enum_scope = self.arena.create_enum_scope(scope, index, self.builtins.int);
                self.arena[enum_scope].location = Some(declaration.location);
                self.document_scopes.push(enum_scope);
            }
            Member::Required(declaration) => {
                self.required_declarations
                    .push((scope, declaration.name.clone(), declaration.location));
            }
            Member::Binding(declaration) => self.visit_binding(scope, declaration),
            Member::Object(definition) => {
                let child = self.visit_object(definition, Some(scope));
                self.pending_defaults.push((scope, child, definition.location));
            }
            Member::Component(component) => {
                let root = self.visit_object(&component.root, Some(scope));
                let root_scope = &mut self.arena[root];
                root_scope.is_inline_component = true;
                root_scope.inline_component_name = Some(component.name.clone());
                root_scope.internal_name = component.name.clone();
                if self.inline_components.insert(component.name.clone(), root).is_some() {
                    self.logger.log(
                        &DUPLICATED_NAME,
                        format!("Duplicated inline component name \"{}\".", component.name),
                        component.location,
                    );
                }
            }
        }
    }

    fn visit_property(&mut self, scope: ScopeId, declaration: &PropertyDeclaration) {
        if self.arena[scope].own_property(&declaration.name).is_some() {
            self.logger.log(
                &DUPLICATED_NAME,
                format!("Duplicated property name \"{}\".", declaration.name),
                declaration.location,
            );
            return;
        }

        let mut property = Property::new(&declaration.name, &declaration.type_name);
        property.is_list = declaration.is_list;
        property.is_writable = !declaration.is_readonly;
        property.is_required = declaration.is_required;
        property.location = Some(declaration.location);
        property.notify = Some(format!("{}Changed", declaration.name));
        if declaration.is_alias() {
            property.is_alias = true;
            property.alias_expression = declaration.alias_target.clone();
            if !self.alias_scopes.contains(&scope) {
                self.alias_scopes.push(scope);
            }
        }
        if declaration.is_default {
            if self.arena[scope].default_property.is_some() {
                self.logger.log(
                    &DUPLICATED_NAME,
                    "Cannot define multiple default properties",
                    declaration.location,
                );
            } else {
                self.arena[scope].default_property = Some(declaration.name.clone());
            }
        }
        if let Some(initializer) = &declaration.initializer {
            property.binding_index =
                self.visit_binding_value(scope, &declaration.name, initializer, declaration.location, false);
        }
        self.arena[scope].insert_property(property);

        let change_signal = format!("{}Changed", declaration.name);
        if self.arena[scope].own_methods(&change_signal).next().is_none() {
            let mut signal = Method::new(change_signal, MethodKind::Signal);
            signal.is_implicit = true;
            signal.location = Some(declaration.location);
            self.arena[scope].methods.push(signal);
        }
    }

    fn visit_binding(&mut self, scope: ScopeId, declaration: &BindingDeclaration) {
        let segments = declaration.segments();
        if segments == ["id"] {
            self.visit_id_binding(scope, &declaration.value, declaration.location);
            return;
        }
        let Some((last, groups)) = segments.split_last() else {
            return;
        };

        let mut target = scope;
        for group in groups {
            target = self.enter_group(target, group, declaration.location);
        }

        if is_handler_name(last) {
            if let BindingValue::Script {
                function_index,
                parameters,
                is_undefined,
            } = &declaration.value
            {
                let function_scope = self.create_function_scope(target, parameters, declaration.location);
                self.arena[target].function_table.push(*function_index);
                let binding_index = self.push_binding(
                    target,
                    PropertyBinding::new(
                        *last,
                        declaration.location,
                        BindingContent::Script {
                            function_index: *function_index,
                            kind: ScriptBindingKind::SignalHandler,
                            is_undefined: *is_undefined,
                        },
                    ),
                );
                self.pending_handlers.push(PendingHandler {
                    scope: target,
                    binding_index,
                    handler_name: last.to_string(),
                    parameters: parameters.clone(),
                    function_scope,
                    location: declaration.location,
                });
                return;
            }
        }

        self.visit_binding_value(target, last, &declaration.value, declaration.location, declaration.on);
    }

    /// Enter the grouped or attached scope `name` of `parent`, reusing it if
    /// a previous binding already created it.
    fn enter_group(&mut self, parent: ScopeId, name: &str, location: Span) -> ScopeId {
        let kind = if name.starts_with(|c: char| c.is_uppercase()) {
            ScopeKind::AttachedProperty
        } else {
            ScopeKind::GroupedProperty
        };
        if let Some(existing) = self.arena.find_child(parent, kind, name) {
            return existing;
        }

        let child = self.create_scope(kind, Some(parent), location);
        self.arena[child].internal_name = name.to_string();
        self.arena[child].file_path = Some(self.file_path.clone());
        let content = match kind {
            ScopeKind::AttachedProperty => BindingContent::AttachedProperty(child),
            _ => BindingContent::GroupProperty(child),
        };
        self.push_binding(parent, PropertyBinding::new(name, location, content));
        child
    }

    /// Record the binding of `name` to `value` on `scope`. Returns the index
    /// of the (first) binding created.
    fn visit_binding_value(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: &BindingValue,
        location: Span,
        on: bool,
    ) -> Option<usize> {
        let content = match value {
            BindingValue::Bool { value } => BindingContent::BoolLiteral(*value),
            BindingValue::Number { value } => BindingContent::NumberLiteral(*value),
            BindingValue::String { value } => BindingContent::StringLiteral(value.clone()),
            BindingValue::RegExp { pattern } => BindingContent::RegExpLiteral(pattern.clone()),
            BindingValue::Null => BindingContent::NullLiteral,
            BindingValue::Identifier { name: identifier } => {
                self.logger.log(
                    &SYNTAX,
                    format!("Bare identifier \"{}\" can only be bound to id", identifier),
                    location,
                );
                return None;
            }
            BindingValue::Translation {
                text,
                comment,
                context,
                number,
            } => BindingContent::Translation {
                text: text.clone(),
                comment: comment.clone(),
                context: context.clone(),
                number: *number,
            },
            BindingValue::TranslationById { id, number } => BindingContent::TranslationById {
                id: id.clone(),
                number: *number,
            },
            BindingValue::Script {
                function_index,
                parameters,
                is_undefined,
            } => {
                self.create_function_scope(scope, parameters, location);
                self.arena[scope].function_table.push(*function_index);
                BindingContent::Script {
                    function_index: *function_index,
                    kind: ScriptBindingKind::PropertyBinding,
                    is_undefined: *is_undefined,
                }
            }
            BindingValue::Object(definition) => {
                let child = self.visit_object(definition, Some(scope));
                let content = if on {
                    BindingContent::ValueSource(child)
                } else {
                    BindingContent::Object(child)
                };
                let index = self.push_binding(scope, PropertyBinding::new(name, location, content));
                self.object_bindings.push(ObjectBinding {
                    owner: scope,
                    property: name.to_string(),
                    child,
                    binding_index: index,
                    location: definition.location,
                });
                return Some(index);
            }
            BindingValue::ObjectList { elements } => {
                let mut first = None;
                for definition in elements {
                    let child = self.visit_object(definition, Some(scope));
                    let index = self.push_binding(
                        scope,
                        PropertyBinding::new(name, definition.location, BindingContent::Object(child)),
                    );
                    self.object_bindings.push(ObjectBinding {
                        owner: scope,
                        property: name.to_string(),
                        child,
                        binding_index: index,
                        location: definition.location,
                    });
                    first.get_or_insert(index);
                }
                return first;
            }
        };
        Some(self.push_binding(scope, PropertyBinding::new(name, location, content)))
    }

    fn push_binding(&mut self, scope: ScopeId, binding: PropertyBinding) -> usize {
        let bindings = &mut self.arena[scope].bindings;
        bindings.push(binding);
        bindings.len() - 1
    }

    fn create_function_scope(
        &mut self,
        parent: ScopeId,
        parameters: &[ParameterDeclaration],
        location: Span,
    ) -> ScopeId {
        let function = self.create_scope(ScopeKind::JsFunction, Some(parent), location);
        for parameter in parameters {
            self.arena[function].js_identifiers.insert(
                parameter.name.clone(),
                JsIdentifier {
                    kind: JsIdentifierKind::Parameter,
                    location: parameter.location,
                },
            );
        }
        function
    }
}

fn declared_parameter(declaration: &ParameterDeclaration) -> Parameter {
    Parameter::new(
        &declaration.name,
        declaration.type_name.clone().unwrap_or_else(|| "var".to_string()),
    )
}

/// `onClicked`, `onWidthChanged`: `on` followed by an upper case letter.
fn is_handler_name(name: &str) -> bool {
    name.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_uppercase())
}
