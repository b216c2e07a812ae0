//! Property bindings recorded on object scopes.

use crate::scope::ScopeId;
use crate::span::Span;

/// What a script binding is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptBindingKind {
    /// `prop: expression`
    PropertyBinding,
    /// `onSignal: ...`
    SignalHandler,
    /// `onPropChanged: ...`
    ChangeHandler,
}

/// The value side of a binding. Exactly one shape per binding.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingContent {
    /// `true` / `false`
    BoolLiteral(bool),
    /// Numeric literal
    NumberLiteral(f64),
    /// String literal
    StringLiteral(String),
    /// Regular expression literal
    RegExpLiteral(String),
    /// `null`
    NullLiteral,
    /// `qsTr("text", "comment", n)`
    Translation {
        /// Source text
        text: String,
        /// Disambiguation comment
        comment: String,
        /// Translation context
        context: String,
        /// Plural number
        number: i32,
    },
    /// `qsTrId("id", n)`
    TranslationById {
        /// Translation id
        id: String,
        /// Plural number
        number: i32,
    },
    /// A compiled script expression or function
    Script {
        /// Index of the bytecode function in the document's function table
        function_index: usize,
        /// What the script is bound as
        kind: ScriptBindingKind,
        /// The script is statically known to evaluate to `undefined`
        is_undefined: bool,
    },
    /// `prop: Type { ... }`
    Object(ScopeId),
    /// `Behavior on prop { ... }`
    Interceptor(ScopeId),
    /// `NumberAnimation on prop { ... }`
    ValueSource(ScopeId),
    /// `Keys.onPressed: ...` grouping; owns the attached scope
    AttachedProperty(ScopeId),
    /// `anchors.left: ...` grouping; owns the grouped scope
    GroupProperty(ScopeId),
}

impl BindingContent {
    /// Whether the content is one of the literal shapes.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            BindingContent::BoolLiteral(_)
                | BindingContent::NumberLiteral(_)
                | BindingContent::StringLiteral(_)
                | BindingContent::RegExpLiteral(_)
                | BindingContent::NullLiteral
        )
    }

    /// Scope owned or referenced by the binding, if any.
    pub fn scope(&self) -> Option<ScopeId> {
        match self {
            BindingContent::Object(id)
            | BindingContent::Interceptor(id)
            | BindingContent::ValueSource(id)
            | BindingContent::AttachedProperty(id)
            | BindingContent::GroupProperty(id) => Some(*id),
            _ => None,
        }
    }

    /// Short name of the shape, used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            BindingContent::BoolLiteral(_) => "bool literal",
            BindingContent::NumberLiteral(_) => "number literal",
            BindingContent::StringLiteral(_) => "string literal",
            BindingContent::RegExpLiteral(_) => "regexp literal",
            BindingContent::NullLiteral => "null literal",
            BindingContent::Translation { .. } => "translation",
            BindingContent::TranslationById { .. } => "translation by id",
            BindingContent::Script { .. } => "script",
            BindingContent::Object(_) => "object",
            BindingContent::Interceptor(_) => "interceptor",
            BindingContent::ValueSource(_) => "value source",
            BindingContent::AttachedProperty(_) => "attached property",
            BindingContent::GroupProperty(_) => "group property",
        }
    }
}

/// A binding of a property on an object scope.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    /// Name of the bound property (or handler name for signal handlers)
    pub property_name: String,
    /// Location of the binding
    pub location: Span,
    /// Bound value
    pub content: BindingContent,
}

impl PropertyBinding {
    /// Create a binding.
    pub fn new(property_name: impl Into<String>, location: Span, content: BindingContent) -> Self {
        Self {
            property_name: property_name.into(),
            location,
            content,
        }
    }

    /// Whether the binding targets a property (as opposed to a signal).
    pub fn is_property_binding(&self) -> bool {
        !matches!(
            self.content,
            BindingContent::Script {
                kind: ScriptBindingKind::SignalHandler | ScriptBindingKind::ChangeHandler,
                ..
            }
        )
    }
}
