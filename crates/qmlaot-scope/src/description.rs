//! Loader for JSON type descriptions (the qmltypes of a module).

use serde::{Deserialize, Serialize};

use crate::builtins::BuiltinTypes;
use crate::error::DescriptionError;
use crate::meta::{Enumeration, Method, MethodKind, Parameter, Property};
use crate::scope::{AccessSemantics, ScopeArena, ScopeId, TypeRef};
use crate::types::{ContextualTypes, ImportedType, TypeLookup, TypeVersion};

/// A module's type description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDescription {
    /// Module uri, e.g. `QtQuick`
    pub module: String,
    /// Module version
    #[serde(default)]
    pub version: Option<String>,
    /// Exported components
    #[serde(default)]
    pub components: Vec<ComponentDescription>,
    /// QML names whose import failed
    #[serde(default)]
    pub failed: Vec<String>,
}

/// One exported type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentDescription {
    /// Native name
    pub name: String,
    /// Header the type is declared in
    pub file: Option<String>,
    /// Native name of the base type
    pub prototype: Option<String>,
    /// Native name of the extension type
    pub extension: Option<String>,
    /// Native name of the attached type
    pub attached_type: Option<String>,
    /// Element type of sequences
    pub value_type: Option<String>,
    /// QML names the type is exported as
    pub exports: Vec<String>,
    /// Value, reference, sequence or none
    pub access: AccessSemantics,
    /// Default property
    pub default_property: Option<String>,
    /// Parent property
    pub parent_property: Option<String>,
    /// Singleton export
    pub singleton: bool,
    /// JavaScript object type
    pub script: bool,
    /// Properties
    pub properties: Vec<PropertyDescription>,
    /// Methods and signals
    pub methods: Vec<MethodDescription>,
    /// Enumerations
    pub enums: Vec<EnumDescription>,
}

/// A property of a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDescription {
    /// Name
    pub name: String,
    /// Native type name, `*` suffix for pointers
    #[serde(rename = "type")]
    pub type_name: String,
    /// `QQmlListProperty`
    pub list: bool,
    /// Not writable
    pub readonly: bool,
    /// Must be set on instantiation
    pub required: bool,
    /// Change signal
    pub notify: Option<String>,
}

/// A method or signal of a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodDescription {
    /// Name
    pub name: String,
    /// Method, signal, slot or constructor
    pub kind: MethodKind,
    /// Native return type, absent for `void`
    pub return_type: Option<String>,
    /// Parameters
    pub parameters: Vec<ParameterDescription>,
}

/// A parameter of a method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDescription {
    /// Name
    pub name: String,
    /// Native type name, `*` suffix for pointers
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An enumeration of a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDescription {
    /// Name
    pub name: String,
    /// Alternative name of a flags type
    pub alias: Option<String>,
    /// Flags
    pub flag: bool,
    /// Keys with their values
    pub values: Vec<EnumValueDescription>,
}

/// A key of an enumeration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumValueDescription {
    /// Key
    pub name: String,
    /// Value
    pub value: i32,
}

impl TypeDescription {
    /// Parse a description from JSON.
    pub fn from_json(text: &str) -> Result<Self, DescriptionError> {
        serde_json::from_str(text).map_err(|source| DescriptionError::Json {
            what: "type description",
            source,
        })
    }

    /// Create scopes for all components and register their names.
    ///
    /// Native names are registered unattributed; QML exports are attributed
    /// to the module and, when `qualifier` is given, registered as
    /// `Qualifier.Name`. References between components (and to types already
    /// in `types`) are resolved after all components exist; references that
    /// still do not resolve stay [`TypeRef::Unresolved`].
    pub fn load_into(
        &self,
        arena: &mut ScopeArena,
        types: &mut ContextualTypes,
        builtins: &BuiltinTypes,
        qualifier: Option<&str>,
    ) -> Result<Vec<ScopeId>, DescriptionError> {
        let revision = self.version.as_deref().and_then(TypeVersion::parse);
        let qualified = |name: &str| match qualifier {
            Some(q) => format!("{}.{}", q, name),
            None => name.to_string(),
        };

        let mut created = Vec::with_capacity(self.components.len());
        for (index, component) in self.components.iter().enumerate() {
            if component.name.is_empty() {
                return Err(DescriptionError::UnnamedComponent {
                    index,
                    module: self.module.clone(),
                });
            }
            let id = arena.create_type(&component.name, component.access);
            {
                let scope = &mut arena[id];
                scope.file_path = Some(
                    component
                        .file
                        .clone()
                        .unwrap_or_else(|| format!("{}.h", component.name.to_lowercase())),
                );
                scope.module = Some(self.module.clone());
                scope.is_singleton = component.singleton;
                scope.is_script = component.script;
                scope.default_property = component.default_property.clone();
                scope.parent_property = component.parent_property.clone();
            }
            if !types.contains(&component.name) {
                types.insert_type(&component.name, id, None);
            }
            for export in &component.exports {
                let name = qualified(export);
                if types
                    .get(&name)
                    .is_some_and(|existing| existing.module.as_deref() == Some(self.module.as_str()))
                {
                    return Err(DescriptionError::DuplicateExport {
                        name,
                        module: self.module.clone(),
                    });
                }
                types.insert(
                    name,
                    ImportedType {
                        scope: Some(id),
                        revision,
                        module: Some(self.module.clone()),
                    },
                );
            }
            created.push(id);
        }

        for name in &self.failed {
            types.insert_failed(qualified(name), Some(&self.module));
        }

        for (component, &id) in self.components.iter().zip(&created) {
            self.link_component(component, id, arena, types, builtins);
        }
        tracing::debug!(
            module = %self.module,
            components = created.len(),
            "loaded type description"
        );
        Ok(created)
    }

    fn link_component(
        &self,
        component: &ComponentDescription,
        id: ScopeId,
        arena: &mut ScopeArena,
        types: &ContextualTypes,
        builtins: &BuiltinTypes,
    ) {
        let type_ref = |name: &Option<String>| {
            name.as_ref().map(|name| match types.lookup(name) {
                TypeLookup::Found(target) => TypeRef::Resolved {
                    name: name.clone(),
                    id: target,
                },
                _ => TypeRef::Unresolved(name.clone()),
            })
        };
        arena[id].base = type_ref(&component.prototype);
        arena[id].extension = type_ref(&component.extension);
        arena[id].attached_type = type_ref(&component.attached_type);
        arena[id].value_type = type_ref(&component.value_type);

        for description in &component.properties {
            let (ty, is_pointer) = types.resolve_signature_type(&description.type_name);
            let mut property = Property::new(&description.name, &description.type_name);
            property.ty = ty;
            property.is_pointer = is_pointer;
            property.is_list = description.list;
            property.is_writable = !description.readonly;
            property.is_required = description.required;
            property.notify = description.notify.clone();
            arena[id].insert_property(property);
        }

        for description in &component.methods {
            let mut method = Method::new(&description.name, description.kind);
            if let Some(return_type) = &description.return_type {
                method.return_type_name = return_type.clone();
                method.return_type = types.resolve_signature_type(return_type).0;
            }
            for param in &description.parameters {
                let (ty, is_pointer) = types.resolve_signature_type(&param.type_name);
                let mut parameter = Parameter::new(&param.name, &param.type_name);
                parameter.ty = ty;
                parameter.is_pointer = is_pointer;
                method.parameters.push(parameter);
            }
            arena[id].methods.push(method);
        }

        for description in &component.enums {
            let enumeration = Enumeration {
                name: description.name.clone(),
                alias: description.alias.clone(),
                is_flag: description.flag,
                keys: description.values.iter().map(|v| v.name.clone()).collect(),
                values: description.values.iter().map(|v| v.value).collect(),
                scope: None,
            };
            arena[id].enums.push(enumeration);
            let index = arena[id].enums.len() - 1;
            arena.create_enum_scope(id, index, builtins.int);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    const QUICK: &str = r#"{
        "module": "QtQuick",
        "version": "2.15",
        "components": [
            {
                "name": "QQuickItem",
                "prototype": "QObject",
                "exports": ["Item"],
                "default_property": "data",
                "properties": [
                    {"name": "width", "type": "double"},
                    {"name": "parent", "type": "QQuickItem*"},
                    {"name": "data", "type": "QObject", "list": true, "readonly": true}
                ],
                "methods": [
                    {"name": "childAt", "return_type": "QQuickItem*",
                     "parameters": [{"name": "x", "type": "double"}, {"name": "y", "type": "double"}]}
                ],
                "enums": [{"name": "TransformOrigin", "values": [{"name": "TopLeft", "value": 0}, {"name": "Top", "value": 1}]}]
            }
        ],
        "failed": ["Canvas"]
    }"#;

    #[test]
    fn test_load_resolves_references() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = builtins::install(&mut arena, &mut types);
        let description = TypeDescription::from_json(QUICK).expect("valid description");
        let ids = description
            .load_into(&mut arena, &mut types, &builtins, None)
            .expect("loads");
        let item = ids[0];

        assert_eq!(types.lookup("Item"), TypeLookup::Found(item));
        assert_eq!(types.get("Item").and_then(|t| t.module.as_deref()), Some("QtQuick"));
        assert_eq!(types.lookup("Canvas"), TypeLookup::FailedImport);
        assert_eq!(arena.base_type(item), Some(builtins.object));

        let (_, parent) = arena.property(item, "parent").expect("parent property");
        assert_eq!(parent.ty, Some(item));
        assert!(parent.is_pointer);
        let (_, data) = arena.property(item, "data").expect("data property");
        assert!(data.is_list && !data.is_writable);
        assert_eq!(arena.default_property_name(item), Some("data"));

        let (_, e) = arena.enumeration(item, "TransformOrigin").expect("enum");
        assert_eq!(e.value("Top"), Some(1));
        let enum_scope = e.scope.expect("enum scope");
        assert_eq!(arena.base_type(enum_scope), Some(builtins.int));
    }

    #[test]
    fn test_qualified_load() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = builtins::install(&mut arena, &mut types);
        let description = TypeDescription::from_json(QUICK).expect("valid description");
        description
            .load_into(&mut arena, &mut types, &builtins, Some("QQ"))
            .expect("loads");
        assert!(matches!(types.lookup("QQ.Item"), TypeLookup::Found(_)));
        assert_eq!(types.lookup("Item"), TypeLookup::NotFound);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = TypeDescription::from_json("{").expect_err("must fail");
        assert!(err.to_string().starts_with("Invalid type description"));
    }

    #[test]
    fn test_unnamed_component_is_an_error() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = builtins::install(&mut arena, &mut types);
        let description = TypeDescription {
            module: "M".into(),
            components: vec![ComponentDescription::default()],
            ..TypeDescription::default()
        };
        assert!(matches!(
            description.load_into(&mut arena, &mut types, &builtins, None),
            Err(DescriptionError::UnnamedComponent { index: 0, .. })
        ));
    }
}
