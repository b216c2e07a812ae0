//! Type questions the code generator asks about scopes.
//!
//! Everything here is a pure query over a resolved [`ScopeArena`]; the
//! generator never mutates scopes.

use qmlaot_scope::scope::SearchStep;
use qmlaot_scope::{AccessSemantics, BuiltinTypes, Method, ScopeArena, ScopeId, ScopeKind};

use crate::register::{Content, ContentVariant, PropertyContent, RegisterContent};

/// Native integer types, by internal name.
const INTEGRAL_NAMES: &[&str] = &[
    "int", "uint", "qlonglong", "qulonglong", "long", "ulong", "short", "ushort", "char", "uchar",
    "qint64", "quint64", "qint32", "quint32", "qint16", "quint16", "qint8", "quint8",
];

/// Answers type questions against one arena.
#[derive(Clone, Copy)]
pub struct TypeResolver<'a> {
    arena: &'a ScopeArena,
    builtins: &'a BuiltinTypes,
}

impl<'a> TypeResolver<'a> {
    /// Create a resolver.
    pub fn new(arena: &'a ScopeArena, builtins: &'a BuiltinTypes) -> Self {
        Self { arena, builtins }
    }

    /// The arena queries run against.
    pub fn arena(&self) -> &'a ScopeArena {
        self.arena
    }

    /// The builtin types.
    pub fn builtins(&self) -> &'a BuiltinTypes {
        self.builtins
    }

    /// Native name of `ty`.
    pub fn internal_name(&self, ty: ScopeId) -> &'a str {
        self.arena[ty].name()
    }

    /// Native name with a pointer suffix for reference types (`QObject *`).
    pub fn augmented_internal_name(&self, ty: ScopeId) -> String {
        if self.is_reference(ty) {
            format!("{} *", self.internal_name(ty))
        } else {
            self.internal_name(ty).to_string()
        }
    }

    /// Whether values of `ty` are handled by pointer.
    pub fn is_reference(&self, ty: ScopeId) -> bool {
        self.arena[ty].access == AccessSemantics::Reference
    }

    /// Whether `ty` is a sequence type.
    pub fn is_sequence(&self, ty: ScopeId) -> bool {
        self.arena[ty].access == AccessSemantics::Sequence
    }

    /// Whether `ty` is a plain JavaScript value container or object.
    pub fn is_js_value(&self, ty: ScopeId) -> bool {
        ty == self.builtins.js_value || self.arena[ty].is_script
    }

    /// Types that fit into a `QJSPrimitiveValue`.
    pub fn is_primitive(&self, ty: ScopeId) -> bool {
        let b = self.builtins;
        [b.int, b.real, b.float, b.bool, b.void, b.null, b.string, b.js_primitive].contains(&ty)
    }

    /// Whether `ty` is a number (anything extended by the number prototype).
    pub fn is_numeric(&self, ty: ScopeId) -> bool {
        self.arena
            .search_base_and_extension(ty, |scope, _| scope == self.builtins.number_prototype)
    }

    /// Whether `ty` is an integer type.
    pub fn is_integral(&self, ty: ScopeId) -> bool {
        self.is_numeric(ty) && INTEGRAL_NAMES.contains(&self.internal_name(ty))
    }

    /// Whether `ty` is the scope of an enumeration.
    pub fn is_enum(&self, ty: ScopeId) -> bool {
        self.arena[ty].kind == ScopeKind::Enum
    }

    /// The type values of `ty` are generically handled as.
    pub fn generic_type(&self, ty: ScopeId) -> ScopeId {
        let b = self.builtins;
        let scope = &self.arena[ty];
        if scope.is_script {
            return b.js_value;
        }
        if ty == b.meta_object {
            return ty;
        }
        if scope.access == AccessSemantics::Reference {
            return self
                .arena
                .base_chain(ty)
                .into_iter()
                .find(|base| {
                    let name = self.internal_name(*base);
                    name == "QObject" || name == "QQmlComponent"
                })
                .unwrap_or(b.js_value);
        }
        if self.is_primitive(ty)
            || [
                b.js_value,
                b.list_property,
                b.url,
                b.date_time,
                b.variant_list,
                b.var,
                b.string_list,
                b.empty_list,
            ]
            .contains(&ty)
        {
            return ty;
        }
        if self.is_numeric(ty) {
            return b.real;
        }
        if self.is_enum(ty) {
            return b.int;
        }
        if scope.access == AccessSemantics::Sequence {
            let holds_objects = self
                .arena
                .value_type(ty)
                .is_some_and(|value| self.is_reference(self.generic_type(value)));
            return if holds_objects { b.list_property } else { b.variant_list };
        }
        b.var
    }

    /// The native representation values of `ty` are stored in.
    pub fn stored_type(&self, ty: ScopeId) -> ScopeId {
        let scope = &self.arena[ty];
        if ty == self.builtins.void {
            return ty;
        }
        if scope.is_script {
            return self.builtins.js_value;
        }
        if scope.is_composite {
            return self
                .arena
                .non_composite_base_type(ty)
                .unwrap_or_else(|| self.generic_type(ty));
        }
        if scope.file_path.is_none() {
            return self.generic_type(ty);
        }
        ty
    }

    /// Content of a plain value of type `ty`.
    pub fn global_type(&self, ty: ScopeId) -> RegisterContent {
        RegisterContent::of_type(self.stored_type(ty), ty, ContentVariant::Unknown)
    }

    /// What `content` logically is.
    pub fn contained_type(&self, content: &RegisterContent) -> ScopeId {
        match &content.content {
            Content::Type(ty) => *ty,
            Content::Property(property) if property.is_list => self.builtins.list_property,
            Content::Property(property) => property.ty,
            Content::Enumeration { .. } => self.builtins.int,
            Content::Method { .. } => self.builtins.js_value,
            Content::ImportNamespace(_) => content.scope.unwrap_or(self.builtins.void),
            Content::Conversion { result, .. } => *result,
        }
    }

    /// Whether `content` is a list.
    pub fn is_list(&self, content: &RegisterContent) -> bool {
        match &content.content {
            Content::Property(property) => property.is_list,
            _ => self.is_sequence(self.contained_type(content)),
        }
    }

    /// Whether `content` holds `ty`.
    pub fn register_contains(&self, content: &RegisterContent, ty: ScopeId) -> bool {
        self.contained_type(content) == ty
    }

    /// Conversions the engine performs without format requirements.
    pub fn can_primitively_convert_from_to(&self, from: ScopeId, to: ScopeId) -> bool {
        let b = self.builtins;
        if from == to {
            return true;
        }
        if from == b.var || to == b.var || from == b.js_value || to == b.js_value {
            return true;
        }
        if self.is_numeric(from) && (self.is_numeric(to) || to == b.bool || to == b.string) {
            return true;
        }
        if self.is_reference(from) && to == b.bool {
            return true;
        }
        if (from == b.string && to == b.url) || (from == b.url && to == b.string) {
            return true;
        }
        if from == b.void || to == b.void {
            return true;
        }
        if from == b.string && to == b.date_time {
            return true;
        }
        if from == b.null && self.is_reference(to) {
            return true;
        }
        if from == b.js_primitive {
            return self.is_primitive(to) || self.is_reference(to);
        }
        if to == b.js_primitive {
            return self.is_primitive(from);
        }
        if from == b.empty_list || from == b.variant_list {
            return self.is_sequence(to);
        }
        if self.is_enum(from) && self.is_numeric(to) {
            return true;
        }
        let match_by_name = !self.arena[to].is_composite;
        self.arena.base_chain(from).into_iter().any(|base| {
            base == to || (match_by_name && self.internal_name(base) == self.internal_name(to))
        })
    }

    /// Whether values of `from` can be turned into `to` at all.
    pub fn can_convert_from_to(&self, from: ScopeId, to: ScopeId) -> bool {
        if self.can_primitively_convert_from_to(from, to) {
            return true;
        }
        let b = self.builtins;
        if from == b.string {
            return matches!(
                self.internal_name(to),
                "QTime" | "QDate" | "QPoint" | "QPointF" | "QSize" | "QSizeF" | "QRect" | "QRectF"
                    | "QColor" | "QByteArray"
            );
        }
        if [b.date_time, b.date, b.time].contains(&from) {
            return [b.date_time, b.date, b.time, b.string].contains(&to);
        }
        false
    }

    /// Common type two values can both be stored in.
    pub fn merge(&self, a: ScopeId, b: ScopeId) -> ScopeId {
        let t = self.builtins;
        if a == b {
            return a;
        }
        if a == t.js_value || a == t.var {
            return a;
        }
        if b == t.js_value || b == t.var {
            return b;
        }
        if self.is_numeric(a) && self.is_numeric(b) {
            return t.real;
        }
        let either = |x: ScopeId, y: ScopeId| (a == x && b == y) || (a == y && b == x);
        if either(t.bool, t.int) {
            return t.int;
        }
        if either(t.int, t.string) {
            return t.string;
        }
        if self.is_primitive(a) && self.is_primitive(b) {
            return t.js_primitive;
        }
        let b_chain = self.arena.base_chain(b);
        if let Some(common) = self.arena.base_chain(a).into_iter().find(|base| b_chain.contains(base)) {
            return common;
        }
        if a == t.null && self.is_reference(b) {
            return b;
        }
        if b == t.null && self.is_reference(a) {
            return a;
        }
        t.var
    }

    /// Content of member `name` of `base`: a property, method or enum.
    pub fn member_type(&self, base: &RegisterContent, name: &str) -> Option<RegisterContent> {
        let owner = self.contained_type(base);
        let b = self.builtins;
        if name == "length" && (owner == b.string || self.is_list(base)) {
            let mut length = RegisterContent::of_type(b.int, b.int, ContentVariant::Builtin);
            length.scope = Some(owner);
            return Some(length);
        }

        if let Some((scope, step)) = self.find_property(owner, name) {
            let variant = match step {
                SearchStep::Base => ContentVariant::ObjectProperty,
                SearchStep::Extension => ContentVariant::ExtensionObjectProperty,
            };
            return self.property_content(scope, name, variant);
        }

        let overloads = self.overload_chain(owner, name);
        if !overloads.is_empty() {
            return Some(RegisterContent {
                stored: b.js_value,
                content: Content::Method {
                    name: name.to_string(),
                    overloads,
                },
                variant: ContentVariant::ObjectMethod,
                scope: Some(owner),
            });
        }

        let (scope, enumeration, member) = match self.arena.enumeration(owner, name) {
            Some((scope, enumeration)) => (scope, enumeration, String::new()),
            None => {
                let (scope, enumeration) = self.arena.enumeration_with_key(owner, name)?;
                (scope, enumeration, name.to_string())
            }
        };
        Some(RegisterContent {
            stored: b.int,
            content: Content::Enumeration {
                enumeration: enumeration.clone(),
                member,
            },
            variant: ContentVariant::ObjectEnum,
            scope: Some(scope),
        })
    }

    /// Content of `name` looked up in the QML scope object `scope`.
    pub fn scoped_type(&self, scope: ScopeId, name: &str) -> Option<RegisterContent> {
        if let Some((owner, step)) = self.find_property(scope, name) {
            let variant = match step {
                SearchStep::Base => ContentVariant::ScopeProperty,
                SearchStep::Extension => ContentVariant::ExtensionScopeProperty,
            };
            return self.property_content(owner, name, variant);
        }
        let overloads = self.overload_chain(scope, name);
        if overloads.is_empty() {
            return None;
        }
        Some(RegisterContent {
            stored: self.builtins.js_value,
            content: Content::Method {
                name: name.to_string(),
                overloads,
            },
            variant: ContentVariant::ScopeMethod,
            scope: Some(scope),
        })
    }

    /// Content of an element of the list `list`.
    pub fn value_type(&self, list: &RegisterContent) -> RegisterContent {
        let contained = self.contained_type(list);
        let element = self
            .arena
            .value_type(contained)
            .unwrap_or(self.builtins.var);
        let mut content = self.global_type(element);
        content.variant = ContentVariant::ListValue;
        content.scope = Some(contained);
        content
    }

    /// Overloads of `name` on `ty`: most derived type first, and within one
    /// type the last declaration first.
    pub fn overload_chain(&self, ty: ScopeId, name: &str) -> Vec<Method> {
        let mut chain: Vec<Method> = Vec::new();
        let mut group: Vec<Method> = Vec::new();
        let mut group_owner = None;
        for (owner, method) in self.arena.methods(ty, name) {
            if group_owner != Some(owner) {
                chain.extend(group.drain(..).rev());
                group_owner = Some(owner);
            }
            group.push(method.clone());
        }
        chain.extend(group.into_iter().rev());
        chain
    }

    /// Human readable description of `content` for rejection messages.
    pub fn descriptive_name(&self, content: &RegisterContent) -> String {
        let stored = self.internal_name(content.stored);
        let scope = content
            .scope
            .map(|scope| format!("{}::", self.arena[scope].name()))
            .unwrap_or_default();
        match &content.content {
            Content::Type(ty) => format!("{} of {}", stored, self.internal_name(*ty)),
            Content::Property(property) => format!(
                "{} of {}{} with type {}",
                stored,
                scope,
                property.name,
                self.internal_name(property.ty)
            ),
            Content::Enumeration {
                enumeration,
                member,
            } => format!("{} of {}{}::{}", stored, scope, enumeration.name, member),
            Content::Method { name, .. } => format!("{} of {}{}(...)", stored, scope, name),
            Content::ImportNamespace(index) => format!("import namespace {}", index),
            Content::Conversion { result, .. } => {
                format!("conversion to {}", self.internal_name(*result))
            }
        }
    }

    fn find_property(&self, ty: ScopeId, name: &str) -> Option<(ScopeId, SearchStep)> {
        let mut found = None;
        self.arena.search_base_and_extension(ty, |scope, step| {
            if self.arena[scope].own_property(name).is_some() {
                found = Some((scope, step));
                return true;
            }
            false
        });
        found
    }

    fn property_content(
        &self,
        owner: ScopeId,
        name: &str,
        variant: ContentVariant,
    ) -> Option<RegisterContent> {
        let property = self.arena[owner].own_property(name)?;
        let ty = property.ty?;
        let stored = if property.is_list {
            self.builtins.list_property
        } else {
            self.stored_type(ty)
        };
        Some(RegisterContent::of_property(
            stored,
            PropertyContent {
                name: name.to_string(),
                ty,
                is_list: property.is_list,
            },
            variant,
            owner,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{ContextualTypes, MethodKind, Parameter, Property, TypeRef};

    struct Fixture {
        arena: ScopeArena,
        builtins: BuiltinTypes,
    }

    fn fixture() -> Fixture {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        Fixture { arena, builtins }
    }

    fn derive(arena: &mut ScopeArena, name: &str, base: ScopeId) -> ScopeId {
        let id = arena.create_type(name, AccessSemantics::Reference);
        arena[id].file_path = Some(format!("{}.h", name.to_lowercase()));
        let base_name = arena[base].internal_name.clone();
        arena[id].base = Some(TypeRef::Resolved { name: base_name, id: base });
        id
    }

    #[test]
    fn test_stored_type_of_builtins() {
        let f = fixture();
        let r = TypeResolver::new(&f.arena, &f.builtins);
        let b = &f.builtins;
        assert_eq!(r.stored_type(b.real), b.real);
        assert_eq!(r.stored_type(b.void), b.void);
        assert_eq!(r.stored_type(b.math), b.js_value);
        assert_eq!(r.stored_type(b.object), b.object);
    }

    #[test]
    fn test_composite_stored_as_native_base() {
        let mut f = fixture();
        let item = derive(&mut f.arena, "QQuickItem", f.builtins.object);
        let doc = derive(&mut f.arena, "Main", item);
        f.arena[doc].is_composite = true;
        let r = TypeResolver::new(&f.arena, &f.builtins);
        assert_eq!(r.stored_type(doc), item);
        assert_eq!(r.generic_type(doc), f.builtins.object);
    }

    #[test]
    fn test_numeric_and_integral() {
        let f = fixture();
        let r = TypeResolver::new(&f.arena, &f.builtins);
        assert!(r.is_numeric(f.builtins.int));
        assert!(r.is_integral(f.builtins.int));
        assert!(r.is_numeric(f.builtins.real));
        assert!(!r.is_integral(f.builtins.real));
        assert!(!r.is_numeric(f.builtins.string));
    }

    #[test]
    fn test_merge_rules() {
        let f = fixture();
        let r = TypeResolver::new(&f.arena, &f.builtins);
        let b = &f.builtins;
        assert_eq!(r.merge(b.int, b.real), b.real);
        assert_eq!(r.merge(b.bool, b.int), b.int);
        assert_eq!(r.merge(b.int, b.string), b.string);
        assert_eq!(r.merge(b.bool, b.string), b.js_primitive);
        assert_eq!(r.merge(b.null, b.object), b.object);
        assert_eq!(r.merge(b.url, b.int), b.var);
    }

    #[test]
    fn test_string_conversions() {
        let f = fixture();
        let r = TypeResolver::new(&f.arena, &f.builtins);
        let b = &f.builtins;
        assert!(r.can_convert_from_to(b.string, b.time));
        assert!(r.can_convert_from_to(b.string, b.url));
        assert!(r.can_convert_from_to(b.string, b.byte_array));
        assert!(!r.can_convert_from_to(b.url, b.int));
    }

    #[test]
    fn test_member_type_finds_properties_and_length() {
        let mut f = fixture();
        let item = derive(&mut f.arena, "QQuickItem", f.builtins.object);
        let mut width = Property::new("width", "double");
        width.ty = Some(f.builtins.real);
        f.arena[item].insert_property(width);
        let r = TypeResolver::new(&f.arena, &f.builtins);

        let base = r.global_type(item);
        let member = r.member_type(&base, "width").expect("width");
        assert_eq!(member.variant, ContentVariant::ObjectProperty);
        assert_eq!(member.stored, f.builtins.real);
        assert_eq!(member.scope, Some(item));

        let text = r.global_type(f.builtins.string);
        let length = r.member_type(&text, "length").expect("length");
        assert_eq!(length.stored, f.builtins.int);
        assert!(r.member_type(&base, "missing").is_none());
    }

    #[test]
    fn test_overload_chain_order() {
        let mut f = fixture();
        let base = derive(&mut f.arena, "Base", f.builtins.object);
        let derived = derive(&mut f.arena, "Derived", base);
        for (owner, ty) in [(base, "QString"), (derived, "int"), (derived, "double")] {
            let mut m = Method::new("f", MethodKind::Method);
            m.parameters.push(Parameter::new("x", ty));
            f.arena[owner].methods.push(m);
        }
        let r = TypeResolver::new(&f.arena, &f.builtins);
        let order: Vec<String> = r
            .overload_chain(derived, "f")
            .into_iter()
            .map(|m| m.parameters[0].type_name.clone())
            .collect();
        assert_eq!(order, vec!["double", "int", "QString"]);
    }
}
