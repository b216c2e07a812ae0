//! Register contents: what a bytecode register holds at a program point.
//!
//! A register's content is a pair of types. The *stored* type is the native
//! representation the value lives in (`QVariant`, `int`, `QObject *`); the
//! *contained* type is what the value logically is. How the content was
//! produced (a scope property, a singleton, an enum member, ...) is kept as
//! a [`ContentVariant`] because it selects the lowering strategy.

use serde::{Deserialize, Serialize};

use qmlaot_scope::{Enumeration, Method, ScopeId};

/// Index of the accumulator in the register file.
pub const ACCUMULATOR: u32 = 2;

/// Index of the first function argument in the register file.
pub const FIRST_ARGUMENT: u32 = 6;

/// How a register content came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentVariant {
    /// An object found through its id
    ObjectById,
    /// A singleton type
    Singleton,
    /// A JavaScript module or script
    Script,
    /// A type referenced as such (its meta-object)
    MetaType,
    /// A property of the JavaScript global object
    JavaScriptGlobal,
    /// A plain JavaScript object
    JavaScriptObject,
    /// A property of a plain JavaScript object
    JavaScriptObjectProperty,
    /// A property of the QML scope object
    ScopeProperty,
    /// A method of the QML scope object
    ScopeMethod,
    /// An attached object of the QML scope object
    ScopeAttached,
    /// An import namespace resolved against the scope object
    ScopeModulePrefix,
    /// A property provided by an extension of the scope object
    ExtensionScopeProperty,
    /// A method provided by an extension of the scope object
    ExtensionScopeMethod,
    /// A property of some object
    ObjectProperty,
    /// A method of some object
    ObjectMethod,
    /// An enum of some object
    ObjectEnum,
    /// An attached object of some object
    ObjectAttached,
    /// An import namespace resolved against some object
    ObjectModulePrefix,
    /// A property provided by an extension of some object
    ExtensionObjectProperty,
    /// A method provided by an extension of some object
    ExtensionObjectMethod,
    /// An enum provided by an extension of some object
    ExtensionObjectEnum,
    /// The return value of a typed method
    MethodReturnValue,
    /// The return value of an untyped JavaScript function
    JavaScriptReturnValue,
    /// An element of a list
    ListValue,
    /// Produced by the engine itself (constants, operators)
    Builtin,
    /// Anything else
    #[default]
    Unknown,
}

/// A property a register content refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyContent {
    /// Property name
    pub name: String,
    /// Resolved property type
    pub ty: ScopeId,
    /// List property
    pub is_list: bool,
}

/// What the register logically contains.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// A value of the given type
    Type(ScopeId),
    /// The value of a property
    Property(PropertyContent),
    /// An enumeration, or one of its members
    Enumeration {
        /// The enumeration
        enumeration: Enumeration,
        /// Member name; empty when the enumeration itself is referenced
        member: String,
    },
    /// A method (all overloads, most derived first)
    Method {
        /// Method name
        name: String,
        /// Candidate overloads
        overloads: Vec<Method>,
    },
    /// An import namespace, by string index
    ImportNamespace(u32),
    /// The result of merging several types on a control flow join
    Conversion {
        /// Types that flowed into the join
        origins: Vec<ScopeId>,
        /// Resulting type
        result: ScopeId,
    },
}

/// The content of a register at a program point.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterContent {
    /// Native representation
    pub stored: ScopeId,
    /// Logical content
    pub content: Content,
    /// How the content was produced
    pub variant: ContentVariant,
    /// Type the content was looked up in (owner of a property, enum, ...)
    pub scope: Option<ScopeId>,
}

impl RegisterContent {
    /// A plain value of type `contained`, stored as `stored`.
    pub fn of_type(stored: ScopeId, contained: ScopeId, variant: ContentVariant) -> Self {
        Self {
            stored,
            content: Content::Type(contained),
            variant,
            scope: None,
        }
    }

    /// The value of `property` of `scope`.
    pub fn of_property(
        stored: ScopeId,
        property: PropertyContent,
        variant: ContentVariant,
        scope: ScopeId,
    ) -> Self {
        Self {
            stored,
            content: Content::Property(property),
            variant,
            scope: Some(scope),
        }
    }

    /// Same content, stored in `stored`.
    pub fn stored_in(&self, stored: ScopeId) -> Self {
        Self {
            stored,
            ..self.clone()
        }
    }

    /// Content is a plain type.
    pub fn is_type(&self) -> bool {
        matches!(self.content, Content::Type(_))
    }

    /// Content is a property value.
    pub fn is_property(&self) -> bool {
        matches!(self.content, Content::Property(_))
    }

    /// Content is an enumeration or enum member.
    pub fn is_enumeration(&self) -> bool {
        matches!(self.content, Content::Enumeration { .. })
    }

    /// Content is a method.
    pub fn is_method(&self) -> bool {
        matches!(self.content, Content::Method { .. })
    }

    /// Content is an import namespace.
    pub fn is_import_namespace(&self) -> bool {
        matches!(self.content, Content::ImportNamespace(_))
    }

    /// Content is a merge of several types.
    pub fn is_conversion(&self) -> bool {
        matches!(self.content, Content::Conversion { .. })
    }

    /// The property, for property contents.
    pub fn property(&self) -> Option<&PropertyContent> {
        match &self.content {
            Content::Property(property) => Some(property),
            _ => None,
        }
    }

    /// The enumeration, for enum contents.
    pub fn enumeration(&self) -> Option<&Enumeration> {
        match &self.content {
            Content::Enumeration { enumeration, .. } => Some(enumeration),
            _ => None,
        }
    }

    /// The enum member name; empty for non-enum contents or when the
    /// enumeration itself is referenced.
    pub fn enum_member(&self) -> &str {
        match &self.content {
            Content::Enumeration { member, .. } => member,
            _ => "",
        }
    }

    /// Overloads of a method content.
    pub fn method_overloads(&self) -> &[Method] {
        match &self.content {
            Content::Method { overloads, .. } => overloads,
            _ => &[],
        }
    }

    /// Import namespace string index.
    pub fn import_namespace(&self) -> Option<u32> {
        match self.content {
            Content::ImportNamespace(index) => Some(index),
            _ => None,
        }
    }
}

/// Whether `index` addresses a function argument of a function taking
/// `argument_count` arguments.
pub fn is_argument(index: u32, argument_count: usize) -> bool {
    index >= FIRST_ARGUMENT && ((index - FIRST_ARGUMENT) as usize) < argument_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{ContextualTypes, ScopeArena};

    #[test]
    fn test_argument_range() {
        assert!(!is_argument(ACCUMULATOR, 2));
        assert!(is_argument(6, 2));
        assert!(is_argument(7, 2));
        assert!(!is_argument(8, 2));
        assert!(!is_argument(6, 0));
    }

    #[test]
    fn test_stored_in_keeps_content() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        let content = RegisterContent::of_type(builtins.int, builtins.int, ContentVariant::Builtin);
        let moved = content.stored_in(builtins.var);
        assert_eq!(moved.stored, builtins.var);
        assert_eq!(moved.content, Content::Type(builtins.int));
        assert_eq!(moved.variant, ContentVariant::Builtin);
        assert_eq!(content.enum_member(), "");
    }
}
