//! Member descriptors owned by scopes: properties, methods, enumerations and
//! JavaScript identifiers.

use serde::{Deserialize, Serialize};

use crate::scope::ScopeId;
use crate::span::Span;

/// A declared or imported property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Type name as written in the declaration or type description
    pub type_name: String,
    /// Resolved type, filled in once the name resolves
    pub ty: Option<ScopeId>,
    /// `list<T>` property
    pub is_list: bool,
    /// Assignable from bindings and scripts
    pub is_writable: bool,
    /// Stored as a pointer in the native object (reference types)
    pub is_pointer: bool,
    /// Must be bound by every instantiation
    pub is_required: bool,
    /// Alias property
    pub is_alias: bool,
    /// Dotted id path an alias points at (`a.x`)
    pub alias_expression: Option<String>,
    /// Scope the alias finally resolved into
    pub alias_target_scope: Option<ScopeId>,
    /// Name of the target property when an alias resolved to a property
    pub alias_target_name: Option<String>,
    /// Index of the initializer binding in the owning scope's binding list
    pub binding_index: Option<usize>,
    /// Index of the property in its owning scope
    pub index: usize,
    /// Name of the change signal
    pub notify: Option<String>,
    /// Declaration site, when the property comes from a document
    pub location: Option<Span>,
}

impl Property {
    /// Create a writable property with the given type name.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_writable: true,
            ..Self::default()
        }
    }

    /// Whether the type of this property is known.
    pub fn is_resolved(&self) -> bool {
        self.ty.is_some()
    }
}

/// Kind of a method-like member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Plain invokable method or JavaScript function
    #[default]
    Method,
    /// Signal
    Signal,
    /// Slot
    Slot,
    /// Constructor of a value type
    Constructor,
}

/// One parameter of a method or signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    /// Parameter name, may be empty for imported signatures
    pub name: String,
    /// Type name as declared
    pub type_name: String,
    /// Resolved type
    pub ty: Option<ScopeId>,
    /// Passed as a pointer (`T *`)
    pub is_pointer: bool,
    /// Passed as a list
    pub is_list: bool,
}

impl Parameter {
    /// Create a parameter.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }
}

/// A method, signal, slot or constructor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Return type name, empty for `void`
    pub return_type_name: String,
    /// Resolved return type
    pub return_type: Option<ScopeId>,
    /// Ordered parameters
    pub parameters: Vec<Parameter>,
    /// Kind of method
    pub kind: MethodKind,
    /// Relative index into the owning scope's function table
    pub relative_function_index: Option<usize>,
    /// Whether the method is implicitly declared (change signals)
    pub is_implicit: bool,
    /// Declaration site
    pub location: Option<Span>,
}

impl Method {
    /// Create a method of the given kind without parameters.
    pub fn new(name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Index of the parameter named `name`.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Human readable signature, e.g. `clicked(int x, int y)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.type_name.clone()
                } else {
                    format!("{} {}", p.type_name, p.name)
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// An enumeration declared on a type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enumeration {
    /// Enumeration name
    pub name: String,
    /// Alternative name for flags types
    pub alias: Option<String>,
    /// Whether the enumeration is a set of flags
    pub is_flag: bool,
    /// Keys in declaration order
    pub keys: Vec<String>,
    /// Values, parallel to `keys`; empty when the values are not known
    pub values: Vec<i32>,
    /// Scope created for the enumeration itself
    pub scope: Option<ScopeId>,
}

impl Enumeration {
    /// Whether `key` is a member.
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Numeric value of `key`, if the values are known.
    pub fn value(&self, key: &str) -> Option<i32> {
        let index = self.keys.iter().position(|k| k == key)?;
        self.values.get(index).copied()
    }
}

/// How a JavaScript identifier was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsIdentifierKind {
    /// Function parameter
    Parameter,
    /// `var` declaration (function scoped)
    FunctionScoped,
    /// `let` declaration
    LexicalScoped,
    /// `const` declaration
    Constant,
    /// Injected by the engine (signal handler arguments)
    Injected,
}

/// A JavaScript identifier declared in a function or block scope.
#[derive(Debug, Clone, PartialEq)]
pub struct JsIdentifier {
    /// How the identifier was declared
    pub kind: JsIdentifierKind,
    /// Declaration site
    pub location: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_formatting() {
        let mut method = Method::new("clicked", MethodKind::Signal);
        method.parameters.push(Parameter::new("x", "int"));
        method.parameters.push(Parameter::new("", "QString"));
        assert_eq!(method.signature(), "clicked(int x, QString)");
        assert_eq!(method.parameter_index("x"), Some(0));
        assert_eq!(method.parameter_index("y"), None);
    }

    #[test]
    fn test_enumeration_values() {
        let e = Enumeration {
            name: "Mode".into(),
            keys: vec!["A".into(), "B".into()],
            values: vec![0, 4],
            ..Enumeration::default()
        };
        assert!(e.has_key("B"));
        assert_eq!(e.value("B"), Some(4));
        assert_eq!(e.value("C"), None);
    }
}
