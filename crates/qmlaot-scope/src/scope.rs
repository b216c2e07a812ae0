//! The scope graph.
//!
//! All scopes of a compilation (imported types, builtins and the scopes of
//! the document being visited) live in one [`ScopeArena`] and refer to each
//! other through [`ScopeId`]s. Tree edges (`parent`/`children`) and non-tree
//! links (base, extension, attached and value types) are therefore plain
//! indices and can never form ownership cycles.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::binding::PropertyBinding;
use crate::meta::{Enumeration, JsIdentifier, Method, Property};
use crate::span::Span;

/// Index of a scope in a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a scope node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Function body
    JsFunction,
    /// Block inside a function
    JsLexical,
    /// Object definition or imported object type
    QmlObject,
    /// `anchors` in `anchors.left: ...`
    GroupedProperty,
    /// `Keys` in `Keys.onPressed: ...`
    AttachedProperty,
    /// Enumeration
    Enum,
}

impl ScopeKind {
    /// Grouped and attached scopes are shared between all bindings that
    /// name them on the same parent.
    pub fn is_unique(self) -> bool {
        !matches!(self, ScopeKind::GroupedProperty | ScopeKind::AttachedProperty)
    }

    /// Whether the kind is one of the JavaScript scopes.
    pub fn is_js(self) -> bool {
        matches!(self, ScopeKind::JsFunction | ScopeKind::JsLexical)
    }
}

/// How values of a type are stored and passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSemantics {
    /// Object types, passed as `T *`
    #[default]
    Reference,
    /// Value types, passed by value
    Value,
    /// Lists
    Sequence,
    /// Namespaces and types without instances
    None,
}

/// A reference to another scope by name, resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Only the name is known yet
    Unresolved(String),
    /// The name resolved to a scope
    Resolved {
        /// Name as written
        name: String,
        /// Target scope
        id: ScopeId,
    },
}

impl TypeRef {
    /// Name as written.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Unresolved(name) | TypeRef::Resolved { name, .. } => name,
        }
    }

    /// Target scope, if resolved.
    pub fn id(&self) -> Option<ScopeId> {
        match self {
            TypeRef::Unresolved(_) => None,
            TypeRef::Resolved { id, .. } => Some(*id),
        }
    }
}

/// A node in the scope graph.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Kind of scope
    pub kind: ScopeKind,
    /// Enclosing scope
    pub parent: Option<ScopeId>,
    /// Owned child scopes in creation order
    pub children: Vec<ScopeId>,
    /// Base type
    pub base: Option<TypeRef>,
    /// Set when the base link was dropped, e.g. to break a cycle
    pub base_type_error: Option<String>,
    /// Native name of the type (`QQuickItem`), or the group/attached name
    pub internal_name: String,
    /// File the type was defined in. Builtins have none.
    pub file_path: Option<String>,
    /// Module the type was imported from
    pub module: Option<String>,
    /// Value, reference or sequence semantics
    pub access: AccessSemantics,
    /// Defined in a QML document rather than natively
    pub is_composite: bool,
    /// `pragma Singleton` or a singleton type export
    pub is_singleton: bool,
    /// Plain JavaScript object type (`Math`, `console`)
    pub is_script: bool,
    /// Root of an inline component
    pub is_inline_component: bool,
    /// Name of the inline component, for its root scope
    pub inline_component_name: Option<String>,
    /// Name of the default property declared on this type
    pub default_property: Option<String>,
    /// Name of the parent property declared on this type
    pub parent_property: Option<String>,
    /// Attached type provider
    pub attached_type: Option<TypeRef>,
    /// Extension type
    pub extension: Option<TypeRef>,
    /// Element type of a sequence
    pub value_type: Option<TypeRef>,
    /// Own properties in declaration order
    pub properties: Vec<Property>,
    /// Own methods; several entries may share a name (overloads)
    pub methods: Vec<Method>,
    /// Own enumerations
    pub enums: Vec<Enumeration>,
    /// Own bindings; several entries may share a property name
    pub bindings: Vec<PropertyBinding>,
    /// JavaScript identifiers declared directly in this scope
    pub js_identifiers: FxHashMap<String, JsIdentifier>,
    /// Relative function index to absolute function index
    pub function_table: Vec<usize>,
    /// Source location of the scope
    pub location: Option<Span>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            base: None,
            base_type_error: None,
            internal_name: String::new(),
            file_path: None,
            module: None,
            access: AccessSemantics::Reference,
            is_composite: false,
            is_singleton: false,
            is_script: false,
            is_inline_component: false,
            inline_component_name: None,
            default_property: None,
            parent_property: None,
            attached_type: None,
            extension: None,
            value_type: None,
            properties: Vec::new(),
            methods: Vec::new(),
            enums: Vec::new(),
            bindings: Vec::new(),
            js_identifiers: FxHashMap::default(),
            function_table: Vec::new(),
            location: None,
        }
    }

    /// Display name: the internal name, else the base type name.
    pub fn name(&self) -> &str {
        if !self.internal_name.is_empty() {
            return &self.internal_name;
        }
        self.base.as_ref().map(TypeRef::name).unwrap_or("")
    }

    /// Name of the base type as written.
    pub fn base_type_name(&self) -> Option<&str> {
        self.base.as_ref().map(TypeRef::name)
    }

    /// Own property named `name`.
    pub fn own_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Mutable own property named `name`.
    pub fn own_property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Insert a property, replacing an own property of the same name.
    pub fn insert_property(&mut self, mut property: Property) {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == property.name) {
            property.index = existing.index;
            *existing = property;
        } else {
            property.index = self.properties.len();
            self.properties.push(property);
        }
    }

    /// Own methods named `name`, in declaration order.
    pub fn own_methods<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Method> + use<'a, 'n> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Own bindings for `property`, in source order.
    pub fn own_bindings<'a, 'n>(
        &'a self,
        property: &'n str,
    ) -> impl Iterator<Item = &'a PropertyBinding> + use<'a, 'n> {
        self.bindings.iter().filter(move |b| b.property_name == property)
    }

    /// Whether this scope binds `property` itself.
    pub fn has_own_binding(&self, property: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.property_name == property && b.is_property_binding())
    }
}

/// Which link led [`ScopeArena::search_base_and_extension`] to a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    /// The scope itself or one of its base types
    Base,
    /// The extension of the scope or of a base type
    Extension,
}

/// Owner of every scope of a compilation.
#[derive(Debug, Clone, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the arena holds no scopes.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Create a scope and attach it to `parent`.
    pub fn create(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent));
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        id
    }

    /// Create a parentless named type. Used for builtins and imported types.
    pub fn create_type(
        &mut self,
        internal_name: impl Into<String>,
        access: AccessSemantics,
    ) -> ScopeId {
        let id = self.create(ScopeKind::QmlObject, None);
        let scope = self.get_mut(id);
        scope.internal_name = internal_name.into();
        scope.access = access;
        id
    }

    /// Scope at `id`.
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Mutable scope at `id`.
    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// All ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len() as u32).map(ScopeId)
    }

    /// Resolved base type.
    pub fn base_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).base.as_ref().and_then(TypeRef::id)
    }

    /// Resolved extension type.
    pub fn extension_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).extension.as_ref().and_then(TypeRef::id)
    }

    /// Resolved element type of a sequence.
    pub fn value_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).value_type.as_ref().and_then(TypeRef::id)
    }

    /// `id` followed by its base types, stopping at the first repeat.
    pub fn base_chain(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut seen = FxHashSet::default();
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(scope) = current {
            if !seen.insert(scope) {
                break;
            }
            chain.push(scope);
            current = self.base_type(scope);
        }
        chain
    }

    /// Visit each type of the base chain of `id`, checking the extension
    /// chain of a type before the type itself, until `check` returns `true`.
    pub fn search_base_and_extension<F>(&self, id: ScopeId, mut check: F) -> bool
    where
        F: FnMut(ScopeId, SearchStep) -> bool,
    {
        for scope in self.base_chain(id) {
            if let Some(extension) = self.extension_type(scope) {
                for ext in self.base_chain(extension) {
                    if check(ext, SearchStep::Extension) {
                        return true;
                    }
                }
            }
            if check(scope, SearchStep::Base) {
                return true;
            }
        }
        false
    }

    /// First property named `name` on the type chain, with its owner.
    pub fn property(&self, id: ScopeId, name: &str) -> Option<(ScopeId, &Property)> {
        let mut found = None;
        self.search_base_and_extension(id, |scope, _| {
            found = self.get(scope).own_property(name).map(|p| (scope, p));
            found.is_some()
        });
        found
    }

    /// Whether the type chain declares `name`.
    pub fn has_property(&self, id: ScopeId, name: &str) -> bool {
        self.property(id, name).is_some()
    }

    /// All methods named `name` on the type chain, most derived first.
    pub fn methods(&self, id: ScopeId, name: &str) -> Vec<(ScopeId, &Method)> {
        let mut methods = Vec::new();
        self.search_base_and_extension(id, |scope, _| {
            methods.extend(self.get(scope).own_methods(name).map(|m| (scope, m)));
            false
        });
        methods
    }

    /// Whether the type chain declares a method named `name`.
    pub fn has_method(&self, id: ScopeId, name: &str) -> bool {
        self.search_base_and_extension(id, |scope, _| {
            self.get(scope).own_methods(name).next().is_some()
        })
    }

    /// Enumeration named `name` on the type chain.
    pub fn enumeration(&self, id: ScopeId, name: &str) -> Option<(ScopeId, &Enumeration)> {
        let mut found = None;
        self.search_base_and_extension(id, |scope, _| {
            found = self
                .get(scope)
                .enums
                .iter()
                .find(|e| e.name == name || e.alias.as_deref() == Some(name))
                .map(|e| (scope, e));
            found.is_some()
        });
        found
    }

    /// Enumeration on the type chain that has a key named `key`.
    pub fn enumeration_with_key(&self, id: ScopeId, key: &str) -> Option<(ScopeId, &Enumeration)> {
        let mut found = None;
        self.search_base_and_extension(id, |scope, _| {
            found = self
                .get(scope)
                .enums
                .iter()
                .find(|e| e.has_key(key))
                .map(|e| (scope, e));
            found.is_some()
        });
        found
    }

    /// Default property name on the type chain.
    pub fn default_property_name(&self, id: ScopeId) -> Option<&str> {
        let mut found = None;
        self.search_base_and_extension(id, |scope, _| {
            found = self.get(scope).default_property.as_deref();
            found.is_some()
        });
        found
    }

    /// Attached type provided by the type chain.
    pub fn attached_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.base_chain(id)
            .into_iter()
            .find_map(|scope| self.get(scope).attached_type.as_ref().and_then(TypeRef::id))
    }

    /// Whether `base` is `id` or one of its base types.
    pub fn inherits(&self, id: ScopeId, base: ScopeId) -> bool {
        self.base_chain(id).contains(&base)
    }

    /// Whether `id` and its whole base chain resolved.
    pub fn is_fully_resolved(&self, id: ScopeId) -> bool {
        let mut current = id;
        let mut seen = FxHashSet::default();
        loop {
            if !seen.insert(current) {
                return false;
            }
            let scope = self.get(current);
            if scope.base_type_error.is_some() {
                return false;
            }
            match &scope.base {
                None => return true,
                Some(TypeRef::Unresolved(_)) => return false,
                Some(TypeRef::Resolved { id, .. }) => current = *id,
            }
        }
    }

    /// First base type (starting at `id`) that is not defined in a document.
    pub fn non_composite_base_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.base_chain(id)
            .into_iter()
            .find(|scope| !self.get(*scope).is_composite)
    }

    /// Innermost QML (object, grouped or attached) scope enclosing `id`.
    pub fn enclosing_qml_scope(&self, id: ScopeId) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(scope) = current {
            if !self.get(scope).kind.is_js() && self.get(scope).kind != ScopeKind::Enum {
                return Some(scope);
            }
            current = self.get(scope).parent;
        }
        None
    }

    /// Look up a JavaScript identifier starting at `id` and walking out
    /// through the enclosing JavaScript scopes.
    pub fn find_js_identifier(&self, id: ScopeId, name: &str) -> Option<&JsIdentifier> {
        let mut current = Some(id);
        while let Some(scope) = current {
            let s = self.get(scope);
            if !s.kind.is_js() {
                return None;
            }
            if let Some(identifier) = s.js_identifiers.get(name) {
                return Some(identifier);
            }
            current = s.parent;
        }
        None
    }

    /// Child of `parent` of the given non-unique kind named `name`.
    pub fn find_child(&self, parent: ScopeId, kind: ScopeKind, name: &str) -> Option<ScopeId> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|child| self.get(*child).kind == kind && self.get(*child).internal_name == name)
    }

    /// Create the scope of enumeration `enum_index` of `owner`, based on
    /// `underlying` (normally `int`), and link it from the enumeration.
    pub fn create_enum_scope(
        &mut self,
        owner: ScopeId,
        enum_index: usize,
        underlying: ScopeId,
    ) -> ScopeId {
        let id = self.create(ScopeKind::Enum, Some(owner));
        let enum_name = self.get(owner).enums[enum_index].name.clone();
        let underlying_name = self.get(underlying).internal_name.clone();
        let scope = self.get_mut(id);
        scope.internal_name = enum_name;
        scope.access = AccessSemantics::Value;
        scope.base = Some(TypeRef::Resolved {
            name: underlying_name,
            id: underlying,
        });
        self.get_mut(owner).enums[enum_index].scope = Some(id);
        id
    }

    /// Rendered base chain for cycle diagnostics: `A -> B -> A`.
    pub fn describe_chain(&self, chain: &[ScopeId], repeated: ScopeId) -> String {
        let mut names: Vec<&str> = chain.iter().map(|id| self.get(*id).name()).collect();
        names.push(self.get(repeated).name());
        names.join(" -> ")
    }
}

impl std::ops::Index<ScopeId> for ScopeArena {
    type Output = Scope;

    fn index(&self, id: ScopeId) -> &Scope {
        self.get(id)
    }
}

impl std::ops::IndexMut<ScopeId> for ScopeArena {
    fn index_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Method, MethodKind};

    fn link(arena: &mut ScopeArena, derived: ScopeId, base: ScopeId) {
        let name = arena.get(base).name().to_string();
        arena.get_mut(derived).base = Some(TypeRef::Resolved { name, id: base });
    }

    #[test]
    fn test_create_attaches_children() {
        let mut arena = ScopeArena::new();
        let root = arena.create(ScopeKind::QmlObject, None);
        let child = arena.create(ScopeKind::QmlObject, Some(root));
        assert_eq!(arena[root].children, vec![child]);
        assert_eq!(arena[child].parent, Some(root));
    }

    #[test]
    fn test_property_lookup_walks_bases_and_extensions() {
        let mut arena = ScopeArena::new();
        let object = arena.create_type("QObject", AccessSemantics::Reference);
        arena[object].insert_property(Property::new("objectName", "QString"));
        let ext = arena.create_type("ItemExtension", AccessSemantics::Reference);
        arena[ext].insert_property(Property::new("extra", "int"));
        let item = arena.create_type("QQuickItem", AccessSemantics::Reference);
        link(&mut arena, item, object);
        arena[item].extension = Some(TypeRef::Resolved { name: "ItemExtension".into(), id: ext });

        assert_eq!(arena.property(item, "objectName").map(|(s, _)| s), Some(object));
        assert_eq!(arena.property(item, "extra").map(|(s, _)| s), Some(ext));
        assert!(arena.property(item, "missing").is_none());
    }

    #[test]
    fn test_methods_most_derived_first() {
        let mut arena = ScopeArena::new();
        let base = arena.create_type("Base", AccessSemantics::Reference);
        arena[base].methods.push(Method::new("f", MethodKind::Method));
        let derived = arena.create_type("Derived", AccessSemantics::Reference);
        arena[derived].methods.push(Method::new("f", MethodKind::Method));
        link(&mut arena, derived, base);

        let owners: Vec<ScopeId> = arena.methods(derived, "f").into_iter().map(|(s, _)| s).collect();
        assert_eq!(owners, vec![derived, base]);
    }

    #[test]
    fn test_methods_outlive_the_queried_name() {
        let mut arena = ScopeArena::new();
        let ty = arena.create_type("T", AccessSemantics::Reference);
        arena[ty].methods.push(Method::new("f", MethodKind::Signal));
        let methods = {
            let name = String::from("f");
            arena.methods(ty, &name)
        };
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].1.kind, MethodKind::Signal);
    }

    #[test]
    fn test_base_chain_stops_on_cycle() {
        let mut arena = ScopeArena::new();
        let a = arena.create_type("A", AccessSemantics::Reference);
        let b = arena.create_type("B", AccessSemantics::Reference);
        link(&mut arena, a, b);
        link(&mut arena, b, a);
        assert_eq!(arena.base_chain(a), vec![a, b]);
        assert!(!arena.is_fully_resolved(a));
        assert_eq!(arena.describe_chain(&[a, b], a), "A -> B -> A");
    }

    #[test]
    fn test_insert_property_replaces_by_name() {
        let mut arena = ScopeArena::new();
        let s = arena.create_type("S", AccessSemantics::Reference);
        arena[s].insert_property(Property::new("x", "int"));
        arena[s].insert_property(Property::new("y", "int"));
        arena[s].insert_property(Property::new("x", "double"));
        assert_eq!(arena[s].properties.len(), 2);
        assert_eq!(arena[s].own_property("x").map(|p| p.index), Some(0));
        assert_eq!(arena[s].own_property("x").map(|p| p.type_name.as_str()), Some("double"));
    }
}
