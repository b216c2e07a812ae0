//! End-to-end tests for the import visitor

use qmlaot_scope::binding::{BindingContent, ScriptBindingKind};
use qmlaot_scope::logger::{
    ALIAS_CYCLE, DUPLICATED_NAME, IMPORT, INCOMPATIBLE_TYPE, INHERITANCE_CYCLE, MISSING_PROPERTY,
    NON_LIST_PROPERTY, REQUIRED, SIGNAL, SIGNAL_HANDLER_PARAMETERS, UNRESOLVED_ALIAS, UNRESOLVED_TYPE,
    UNUSED_IMPORTS,
};
use qmlaot_scope::meta::JsIdentifierKind;
use qmlaot_scope::{
    builtins, BuiltinTypes, ContextualTypes, Document, ImportVisitor, LoggerConfig, ScopeArena, ScopeKind,
    Severity, TypeDescription, VisitResult,
};
use serde_json::{json, Value};

const QUICK: &str = r#"{
    "module": "QtQuick",
    "version": "2.15",
    "components": [
        {
            "name": "QQuickItem", "prototype": "QObject", "exports": ["Item"],
            "default_property": "data",
            "properties": [
                {"name": "width", "type": "double"},
                {"name": "height", "type": "double"},
                {"name": "parent", "type": "QQuickItem*"},
                {"name": "anchors", "type": "QQuickAnchors*", "readonly": true},
                {"name": "data", "type": "QObject", "list": true, "readonly": true}
            ]
        },
        {
            "name": "QQuickAnchors", "prototype": "QObject",
            "properties": [
                {"name": "fill", "type": "QQuickItem*"},
                {"name": "margins", "type": "double"},
                {"name": "leftMargin", "type": "double"}
            ]
        },
        {"name": "QQuickMouseEvent", "prototype": "QObject"},
        {
            "name": "QQuickMouseArea", "prototype": "QQuickItem", "exports": ["MouseArea"],
            "methods": [
                {"name": "clicked", "kind": "signal", "parameters": [{"name": "mouse", "type": "QQuickMouseEvent*"}]},
                {"name": "pressed", "kind": "signal", "parameters": [{"name": "mouse", "type": "QQuickMouseEvent"}]}
            ]
        },
        {
            "name": "QQuickLoader", "prototype": "QQuickItem", "exports": ["Loader"],
            "properties": [{"name": "sourceComponent", "type": "QQmlComponent*"}]
        },
        {
            "name": "QQuickSingle", "prototype": "QQuickItem", "exports": ["Single"],
            "default_property": "content",
            "properties": [{"name": "content", "type": "QQuickItem*"}]
        },
        {
            "name": "QQuickNeedy", "prototype": "QQuickItem", "exports": ["Needy"],
            "properties": [{"name": "model", "type": "QString", "required": true}]
        },
        {"name": "QQuickBehavior", "prototype": "QObject", "exports": ["Behavior"]},
        {"name": "QQuickKeysAttached", "prototype": "QObject",
         "methods": [{"name": "pressed", "kind": "signal"}]},
        {"name": "QQuickKeys", "prototype": "QObject", "exports": ["Keys"], "attached_type": "QQuickKeysAttached"}
    ],
    "failed": ["Canvas"]
}"#;

const CONTROLS: &str = r#"{
    "module": "QtQuick.Controls",
    "components": [{"name": "QQuickButton", "prototype": "QQuickItem", "exports": ["Button"]}]
}"#;

struct Fixture {
    arena: ScopeArena,
    types: ContextualTypes,
    builtins: BuiltinTypes,
}

impl Fixture {
    fn new() -> Self {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = builtins::install(&mut arena, &mut types);
        for text in [QUICK, CONTROLS] {
            TypeDescription::from_json(text)
                .unwrap()
                .load_into(&mut arena, &mut types, &builtins, None)
                .unwrap();
        }
        Self { arena, types, builtins }
    }

    fn visit(&mut self, document: Value) -> VisitResult {
        let document: Document = serde_json::from_value(document).unwrap();
        ImportVisitor::new(&mut self.arena, &self.types, &self.builtins, LoggerConfig::new()).visit(&document)
    }
}

fn loc(line: u32) -> Value {
    json!({"start": line as usize * 10, "end": line as usize * 10 + 5, "line": line, "column": 5})
}

fn document(root: Value) -> Value {
    json!({"file_path": "Main.qml", "imports": [{"uri": "QtQuick", "location": loc(1)}], "root": root})
}

fn object(type_name: &str, line: u32, members: Value) -> Value {
    json!({"type_name": type_name, "location": loc(line), "members": members})
}

fn id(name: &str, line: u32) -> Value {
    json!({"kind": "binding", "path": "id", "value": {"type": "identifier", "name": name}, "location": loc(line)})
}

fn number(path: &str, value: f64, line: u32) -> Value {
    json!({"kind": "binding", "path": path, "value": {"type": "number", "value": value}, "location": loc(line)})
}

fn alias(name: &str, target: &str, line: u32) -> Value {
    json!({"kind": "property", "name": name, "type_name": "alias", "alias_target": target, "location": loc(line)})
}

fn property(name: &str, type_name: &str, line: u32) -> Value {
    json!({"kind": "property", "name": name, "type_name": type_name, "location": loc(line)})
}

fn child(definition: Value) -> Value {
    let mut member = definition;
    member["kind"] = json!("object");
    member
}

#[test]
fn test_grouped_property_scope_is_shared() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([number("anchors.margins", 1.0, 3), number("anchors.leftMargin", 2.0, 4)]),
    )));

    let groups: Vec<_> = fixture.arena[result.root]
        .children
        .iter()
        .copied()
        .filter(|c| fixture.arena[*c].kind == ScopeKind::GroupedProperty)
        .collect();
    assert_eq!(groups.len(), 1);
    let anchors = groups[0];
    assert_eq!(fixture.arena[anchors].internal_name, "anchors");
    assert_eq!(fixture.arena[anchors].bindings.len(), 2);
    assert_eq!(fixture.arena[anchors].base_type_name(), Some("QQuickAnchors*"));
    assert!(result.logger.diagnostics().is_empty(), "{:?}", result.logger.diagnostics());
}

#[test]
fn test_duplicate_id_reports_first_declaration() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            child(object("Item", 3, json!([id("foo", 4)]))),
            child(object("Item", 5, json!([id("foo", 6)])))
        ]),
    )));

    let duplicates: Vec<_> = result.logger.of_category(&DUPLICATED_NAME).collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].span.line, 6);
    assert_eq!(duplicates[0].related.len(), 1);
    assert_eq!(duplicates[0].related[0].span.line, 4);
    assert!(duplicates[0].message.contains("first declared at 4:5"));

    let first = result.ids.get("foo").unwrap();
    assert_eq!(fixture.arena[first].location.map(|l| l.line), Some(3));
}

#[test]
fn test_alias_takes_type_and_writability_of_target() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            alias("b", "a.x", 3),
            alias("c", "a.y", 4),
            alias("whole", "a", 5),
            child(object(
                "Item",
                6,
                json!([
                    id("a", 7),
                    property("x", "int", 8),
                    {"kind": "property", "name": "y", "type_name": "int", "is_readonly": true, "location": loc(9)}
                ])
            ))
        ]),
    )));
    assert!(result.logger.diagnostics().is_empty(), "{:?}", result.logger.diagnostics());

    let root = &fixture.arena[result.root];
    let a = result.ids.get("a").unwrap();
    let b = root.own_property("b").unwrap();
    assert_eq!(b.ty, Some(fixture.builtins.int));
    assert!(b.is_writable);
    assert_eq!(b.alias_target_scope, Some(a));
    assert_eq!(b.alias_target_name.as_deref(), Some("x"));

    let c = root.own_property("c").unwrap();
    assert_eq!(c.ty, Some(fixture.builtins.int));
    assert!(!c.is_writable);

    let whole = root.own_property("whole").unwrap();
    assert_eq!(whole.ty, Some(a));
    assert!(whole.is_pointer);
}

#[test]
fn test_alias_chain_resolves_within_depth_rounds() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            id("root", 3),
            alias("a1", "root.a2", 4),
            alias("a2", "root.a3", 5),
            alias("a3", "root.x", 6),
            property("x", "string", 7)
        ]),
    )));

    assert!(result.alias_rounds <= 3, "took {} rounds", result.alias_rounds);
    for name in ["a1", "a2", "a3"] {
        let alias = fixture.arena[result.root].own_property(name).unwrap();
        assert_eq!(alias.ty, Some(fixture.builtins.string), "{}", name);
    }
    assert!(result.logger.diagnostics().is_empty());
}

#[test]
fn test_alias_cycle_reported_once_per_alias() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            id("root", 3),
            alias("a", "root.b", 4),
            alias("b", "root.c", 5),
            alias("c", "root.a", 6),
            alias("d", "missing.x", 7)
        ]),
    )));

    let cycles: Vec<_> = result.logger.of_category(&ALIAS_CYCLE).collect();
    assert_eq!(cycles.len(), 3);
    for name in ["a", "b", "c"] {
        assert_eq!(
            cycles.iter().filter(|d| d.message.contains(&format!("\"{}\"", name))).count(),
            1
        );
        assert!(fixture.arena[result.root].own_property(name).unwrap().ty.is_none());
    }
    assert_eq!(result.logger.of_category(&UNRESOLVED_ALIAS).count(), 1);
}

#[test]
fn test_swapped_handler_parameters() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            {"kind": "signal", "name": "clicked", "location": loc(3), "parameters": [
                {"name": "x", "type_name": "int"}, {"name": "y", "type_name": "int"}
            ]},
            {"kind": "binding", "path": "onClicked", "location": loc(4), "value": {
                "type": "script", "function_index": 0,
                "parameters": [{"name": "y", "location": loc(4)}, {"name": "x", "location": loc(4)}]
            }}
        ]),
    )));

    let swapped: Vec<_> = result.logger.of_category(&SIGNAL_HANDLER_PARAMETERS).collect();
    assert_eq!(swapped.len(), 2);
    assert!(swapped[0].message.contains("Parameter 1"));
    assert!(swapped[0].message.contains("\"y\""));
    assert!(swapped[0].message.contains("position 2"));
    assert_eq!(swapped[0].severity, Severity::Warning);

    assert_eq!(result.signal_handlers.len(), 1);
    assert_eq!(result.signal_handlers[0].signal, "clicked");
    assert_eq!(result.signal_handlers[0].parameters, vec!["y", "x"]);
}

#[test]
fn test_native_signal_handlers() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "MouseArea",
        2,
        json!([
            property("count", "int", 3),
            {"kind": "binding", "path": "onClicked", "location": loc(4),
             "value": {"type": "script", "function_index": 0}},
            {"kind": "binding", "path": "onPressed", "location": loc(5),
             "value": {"type": "script", "function_index": 1}},
            {"kind": "binding", "path": "onWidthChanged", "location": loc(6),
             "value": {"type": "script", "function_index": 2}},
            {"kind": "binding", "path": "onCountChanged", "location": loc(7),
             "value": {"type": "script", "function_index": 3}},
            {"kind": "binding", "path": "onTapped", "location": loc(8),
             "value": {"type": "script", "function_index": 4}}
        ]),
    )));

    let signal_errors: Vec<_> = result.logger.of_category(&SIGNAL).map(|d| d.message.as_str()).collect();
    assert_eq!(signal_errors.len(), 2, "{:?}", signal_errors);
    assert!(signal_errors[0].contains("should be passed by pointer"));
    assert_eq!(signal_errors[1], "no matching signal found for handler \"onTapped\"");

    let clicked = result.signal_handlers.iter().find(|h| h.signal == "clicked").unwrap();
    assert_eq!(clicked.parameters, vec!["mouse"]);
    assert!(!clicked.is_change_handler);
    let function = fixture.arena[result.root]
        .children
        .iter()
        .copied()
        .find(|c| fixture.arena[*c].js_identifiers.contains_key("mouse"))
        .unwrap();
    assert_eq!(fixture.arena[function].js_identifiers["mouse"].kind, JsIdentifierKind::Injected);

    for signal in ["widthChanged", "countChanged"] {
        let handler = result.signal_handlers.iter().find(|h| h.signal == signal).unwrap();
        assert!(handler.is_change_handler, "{}", signal);
    }
    let change_bindings = fixture.arena[result.root]
        .bindings
        .iter()
        .filter(|b| matches!(b.content, BindingContent::Script { kind: ScriptBindingKind::ChangeHandler, .. }))
        .count();
    assert_eq!(change_bindings, 2);
}

#[test]
fn test_attached_handler() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([{"kind": "binding", "path": "Keys.onPressed", "location": loc(3),
                "value": {"type": "script", "function_index": 0}}]),
    )));
    assert!(result.logger.diagnostics().is_empty(), "{:?}", result.logger.diagnostics());
    let attached = result.signal_handlers[0].scope;
    assert_eq!(fixture.arena[attached].kind, ScopeKind::AttachedProperty);
    assert_eq!(fixture.arena[attached].base_type_name(), Some("QQuickKeysAttached"));
}

#[test]
fn test_required_properties() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            child(object("Needy", 3, json!([]))),
            child(object("Needy", 4, json!([
                {"kind": "binding", "path": "model", "location": loc(5), "value": {"type": "string", "value": "m"}}
            ]))),
            child(object("Needy", 6, json!([id("aliased", 7)]))),
            alias("exposed", "aliased.model", 8)
        ]),
    )));

    let required: Vec<_> = result.logger.of_category(&REQUIRED).collect();
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].span.line, 3);
    assert_eq!(
        required[0].message,
        "Component is missing required property model from QQuickNeedy"
    );
}

#[test]
fn test_required_declaration_of_unknown_property() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([{"kind": "required", "name": "nothing", "location": loc(3)}]),
    )));
    let missing: Vec<_> = result.logger.of_category(&MISSING_PROPERTY).collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].message.contains("\"nothing\" was marked as required"));
}

#[test]
fn test_inheritance_cycle_is_broken() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            {"kind": "component", "name": "A", "location": loc(3), "root": object("B", 3, json!([]))},
            {"kind": "component", "name": "B", "location": loc(4), "root": object("A", 4, json!([]))}
        ]),
    )));

    let cycles: Vec<_> = result.logger.of_category(&INHERITANCE_CYCLE).collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].message.contains("A -> B -> A"), "{}", cycles[0].message);

    let b = result.inline_components["B"];
    assert!(fixture.arena[b].base.is_none());
    assert!(fixture.arena[b].base_type_error.is_some());
    assert!(!fixture.arena.is_fully_resolved(b));
}

#[test]
fn test_unused_import() {
    let mut fixture = Fixture::new();
    let mut doc = document(object("Item", 3, json!([])));
    doc["imports"] = json!([
        {"uri": "QtQuick", "location": loc(1)},
        {"uri": "QtQuick.Controls", "location": loc(2)}
    ]);
    let result = fixture.visit(doc);

    let unused: Vec<_> = result.logger.of_category(&UNUSED_IMPORTS).collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].span.line, 2);
    assert_eq!(unused[0].severity, Severity::Info);
}

#[test]
fn test_default_property_assignment() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            child(object("Single", 3, json!([
                child(object("Item", 4, json!([]))),
                child(object("Item", 5, json!([])))
            ]))),
            child(object("QtObject", 6, json!([child(object("Item", 7, json!([])))]))),
            child(object("Single", 8, json!([child(object("QtObject", 9, json!([])))])))
        ]),
    )));

    let root_assignment = result
        .default_assignments
        .iter()
        .find(|a| a.parent == result.root)
        .unwrap();
    assert_eq!(root_assignment.property, "data");
    assert_eq!(root_assignment.children.len(), 3);

    let non_list: Vec<_> = result.logger.of_category(&NON_LIST_PROPERTY).collect();
    assert_eq!(non_list.len(), 1);
    assert_eq!(non_list[0].span.line, 5);

    let missing: Vec<_> = result.logger.of_category(&MISSING_PROPERTY).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].message, "Cannot assign to non-existent default property");

    let incompatible: Vec<_> = result.logger.of_category(&INCOMPATIBLE_TYPE).collect();
    assert_eq!(incompatible.len(), 1);
    assert_eq!(incompatible[0].span.line, 9);
}

#[test]
fn test_component_property_wraps_object() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Loader",
        2,
        json!([
            {"kind": "binding", "path": "sourceComponent", "location": loc(3),
             "value": {"type": "object", "type_name": "Item", "location": loc(3), "members": []}},
            {"kind": "binding", "path": "width", "on": true, "location": loc(4),
             "value": {"type": "object", "type_name": "Behavior", "location": loc(4), "members": []}}
        ]),
    )));
    assert!(result.logger.diagnostics().is_empty(), "{:?}", result.logger.diagnostics());
    assert_eq!(result.implicit_components.len(), 1);

    let bindings = &fixture.arena[result.root].bindings;
    assert!(matches!(bindings[1].content, BindingContent::Interceptor(_)));
}

#[test]
fn test_unresolved_and_failed_types() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            child(object("Frobnicator", 3, json!([number("whatever", 1.0, 4)]))),
            child(object("Canvas", 5, json!([])))
        ]),
    )));

    let unresolved: Vec<_> = result.logger.of_category(&UNRESOLVED_TYPE).collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].message, "Frobnicator was not found. Did you add all import paths?");
    let failed: Vec<_> = result.logger.of_category(&IMPORT).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].message.starts_with("Canvas was not loaded"));
    // Bindings on unresolved objects are not checked
    assert_eq!(result.logger.of_category(&MISSING_PROPERTY).count(), 0);
}

#[test]
fn test_binding_to_missing_property() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object("Item", 2, json!([number("colour", 1.0, 3)]))));
    let missing: Vec<_> = result.logger.of_category(&MISSING_PROPERTY).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].message, "Could not find property \"colour\".");
}

#[test]
fn test_disabled_category_is_dropped() {
    let mut fixture = Fixture::new();
    let (config, rejected) = LoggerConfig::from_entries([("missing-property", "off")]);
    assert!(rejected.is_empty());
    let document: Document =
        serde_json::from_value(document(object("Item", 2, json!([number("colour", 1.0, 3)])))).unwrap();
    let result = ImportVisitor::new(&mut fixture.arena, &fixture.types, &fixture.builtins, config).visit(&document);
    assert!(result.logger.diagnostics().is_empty());
}

#[test]
fn test_document_enums_and_functions() {
    let mut fixture = Fixture::new();
    let result = fixture.visit(document(object(
        "Item",
        2,
        json!([
            {"kind": "enum", "name": "Mode", "location": loc(3),
             "keys": [{"name": "Off"}, {"name": "On", "value": 5}, {"name": "Auto"}]},
            {"kind": "function", "name": "toggle", "function_index": 7, "location": loc(4),
             "parameters": [{"name": "on", "type_name": "bool"}],
             "locals": [{"name": "tmp", "kind": "let"}]},
            {"kind": "function", "name": "toggle", "function_index": 8, "location": loc(5)}
        ]),
    )));

    let (_, mode) = fixture.arena.enumeration(result.root, "Mode").unwrap();
    assert_eq!(mode.values, vec![0, 5, 6]);
    let enum_scope = mode.scope.unwrap();
    assert_eq!(fixture.arena.base_type(enum_scope), Some(fixture.builtins.int));

    assert_eq!(fixture.arena[result.root].function_table, vec![7, 8]);
    assert_eq!(result.logger.of_category(&DUPLICATED_NAME).count(), 1);
    let function = fixture.arena[result.root]
        .children
        .iter()
        .copied()
        .find(|c| fixture.arena[*c].kind == ScopeKind::JsFunction)
        .unwrap();
    assert_eq!(fixture.arena[function].js_identifiers["on"].kind, JsIdentifierKind::Parameter);
    assert_eq!(fixture.arena[function].js_identifiers["tmp"].kind, JsIdentifierKind::LexicalScoped);
}
