//! The parsed document consumed by the visitor.
//!
//! Parsing QML is done elsewhere; this is the shape its output is handed
//! over in (usually as JSON).

use serde::{Deserialize, Serialize};

use crate::error::DescriptionError;
use crate::span::Span;

/// A parsed QML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path of the `.qml` file
    pub file_path: String,
    /// `pragma` statements
    #[serde(default)]
    pub pragmas: Vec<Pragma>,
    /// `import` statements
    #[serde(default)]
    pub imports: Vec<Import>,
    /// Root object
    pub root: ObjectDefinition,
}

impl Document {
    /// Parse a document from JSON.
    pub fn from_json(text: &str) -> Result<Self, DescriptionError> {
        serde_json::from_str(text).map_err(|source| DescriptionError::Json {
            what: "document",
            source,
        })
    }

    /// Name of the component the document defines (file stem).
    pub fn component_name(&self) -> &str {
        let file = self.file_path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(&self.file_path);
        file.strip_suffix(".qml").unwrap_or(file)
    }
}

/// `pragma Name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pragma {
    /// Pragma name
    pub name: String,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `import uri version as Qualifier`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// Module uri or directory
    pub uri: String,
    /// Version, if given
    #[serde(default)]
    pub version: Option<String>,
    /// Qualifier, if given
    #[serde(default)]
    pub qualifier: Option<String>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `Type { members }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Type name, possibly qualified (`QQ.Item`)
    pub type_name: String,
    /// Location of the type name
    #[serde(default)]
    pub location: Span,
    /// Members in source order
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A member of an object definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    /// `property T name[: value]`
    Property(PropertyDeclaration),
    /// `signal name(params)`
    Signal(SignalDeclaration),
    /// `function name(params) { }`
    Function(FunctionDeclaration),
    /// `enum Name { A, B }`
    Enum(EnumDeclaration),
    /// `required name`
    Required(RequiredDeclaration),
    /// `path: value`
    Binding(BindingDeclaration),
    /// A child object without target property
    Object(ObjectDefinition),
    /// `component Name: Type { }`
    Component(InlineComponent),
}

/// `[default] [required] [readonly] property [list<]T[>] name[: value]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    /// Property name
    pub name: String,
    /// Type name; `alias` for aliases
    pub type_name: String,
    /// `list<T>`
    #[serde(default)]
    pub is_list: bool,
    /// `readonly`
    #[serde(default)]
    pub is_readonly: bool,
    /// `required`
    #[serde(default)]
    pub is_required: bool,
    /// `default`
    #[serde(default)]
    pub is_default: bool,
    /// Target expression of an alias (`a.x`)
    #[serde(default)]
    pub alias_target: Option<String>,
    /// Initializer
    #[serde(default)]
    pub initializer: Option<BindingValue>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

impl PropertyDeclaration {
    /// Whether this declares an alias.
    pub fn is_alias(&self) -> bool {
        self.type_name == "alias"
    }
}

/// A parameter of a signal, function or handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    /// Name
    pub name: String,
    /// Type annotation
    #[serde(default)]
    pub type_name: Option<String>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `signal name(T a, U b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDeclaration {
    /// Signal name
    pub name: String,
    /// Parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `var`, `let` or `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

/// A local declared in a function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDeclaration {
    /// Name
    pub name: String,
    /// Declaration keyword
    pub kind: LocalKind,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `function name(params): T { }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Function name
    pub name: String,
    /// Parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    /// Return type annotation
    #[serde(default)]
    pub return_type: Option<String>,
    /// Index of the compiled function in the document
    pub function_index: usize,
    /// Locals of the body
    #[serde(default)]
    pub locals: Vec<LocalDeclaration>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// A key of an enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumKey {
    /// Key
    pub name: String,
    /// Explicit value
    #[serde(default)]
    pub value: Option<i32>,
}

/// `enum Name { ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDeclaration {
    /// Enum name
    pub name: String,
    /// Keys
    pub keys: Vec<EnumKey>,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `required name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredDeclaration {
    /// Property name
    pub name: String,
    /// Location
    #[serde(default)]
    pub location: Span,
}

/// `a.b.c: value` or `Type on prop { }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDeclaration {
    /// Dotted target (`anchors.left`, `onClicked`, `id`)
    pub path: String,
    /// Value
    pub value: BindingValue,
    /// `Type on prop { }` syntax
    #[serde(default)]
    pub on: bool,
    /// Location of the target
    #[serde(default)]
    pub location: Span,
}

impl BindingDeclaration {
    /// Path segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('.').collect()
    }
}

/// Value side of a binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BindingValue {
    /// `true`/`false`
    Bool {
        /// Value
        value: bool,
    },
    /// Numeric literal
    Number {
        /// Value
        value: f64,
    },
    /// String literal
    String {
        /// Value
        value: String,
    },
    /// Regular expression literal
    RegExp {
        /// Pattern
        pattern: String,
    },
    /// `null`
    Null,
    /// A bare identifier (used by `id:`)
    Identifier {
        /// Identifier
        name: String,
    },
    /// `qsTr(...)`
    Translation {
        /// Text
        text: String,
        /// Comment
        #[serde(default)]
        comment: String,
        /// Context
        #[serde(default)]
        context: String,
        /// Plural number
        #[serde(default = "default_number")]
        number: i32,
    },
    /// `qsTrId(...)`
    TranslationById {
        /// Id
        id: String,
        /// Plural number
        #[serde(default = "default_number")]
        number: i32,
    },
    /// Any other expression or function
    Script {
        /// Index of the compiled function
        function_index: usize,
        /// Parameters of a `function (a, b) { }` or arrow handler
        #[serde(default)]
        parameters: Vec<ParameterDeclaration>,
        /// The expression is statically `undefined`
        #[serde(default)]
        is_undefined: bool,
    },
    /// `Type { }`
    Object(ObjectDefinition),
    /// `[Type { }, Type { }]`
    ObjectList {
        /// Elements
        elements: Vec<ObjectDefinition>,
    },
}

fn default_number() -> i32 {
    -1
}

/// `component Name: Type { }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineComponent {
    /// Component name
    pub name: String,
    /// Root object
    pub root: ObjectDefinition,
    /// Location
    #[serde(default)]
    pub location: Span,
}
