//! Builtin types every compilation can rely on.

use crate::meta::{Method, MethodKind, Parameter, Property};
use crate::scope::{AccessSemantics, ScopeArena, ScopeId, TypeRef};
use crate::types::ContextualTypes;

/// Ids of the builtin types installed by [`install`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTypes {
    /// `void`
    pub void: ScopeId,
    /// `std::nullptr_t`
    pub null: ScopeId,
    /// `double`
    pub real: ScopeId,
    /// `float`
    pub float: ScopeId,
    /// `int`
    pub int: ScopeId,
    /// `bool`
    pub bool: ScopeId,
    /// `QString`
    pub string: ScopeId,
    /// `QStringList`
    pub string_list: ScopeId,
    /// `QUrl`
    pub url: ScopeId,
    /// `QDateTime`
    pub date_time: ScopeId,
    /// `QDate`
    pub date: ScopeId,
    /// `QTime`
    pub time: ScopeId,
    /// `QByteArray`
    pub byte_array: ScopeId,
    /// `QVariantList`
    pub variant_list: ScopeId,
    /// `QVariant`
    pub var: ScopeId,
    /// `QJSValue`
    pub js_value: ScopeId,
    /// `QJSPrimitiveValue`
    pub js_primitive: ScopeId,
    /// `QQmlListProperty<QObject>`
    pub list_property: ScopeId,
    /// `const QMetaObject`
    pub meta_object: ScopeId,
    /// `void*`, the type of `[]`
    pub empty_list: ScopeId,
    /// `QObject`
    pub object: ScopeId,
    /// `QQmlComponent`
    pub component: ScopeId,
    /// Prototype shared by all numeric types
    pub number_prototype: ScopeId,
    /// The JavaScript global object
    pub js_global: ScopeId,
    /// `Math`
    pub math: ScopeId,
    /// `console`
    pub console: ScopeId,
}

struct Installer<'a> {
    arena: &'a mut ScopeArena,
    types: &'a mut ContextualTypes,
}

impl Installer<'_> {
    fn native(&mut self, internal: &str, access: AccessSemantics, header: Option<&str>) -> ScopeId {
        let id = self.arena.create_type(internal, access);
        self.arena[id].file_path = header.map(str::to_string);
        self.types.insert_type(internal, id, None);
        id
    }

    fn export(&mut self, qml_name: &str, id: ScopeId) {
        self.types.insert_type(qml_name, id, None);
    }

    fn set_base(&mut self, id: ScopeId, base: ScopeId) {
        let name = self.arena[base].internal_name.clone();
        self.arena[id].base = Some(TypeRef::Resolved { name, id: base });
    }

    fn set_extension(&mut self, id: ScopeId, extension: ScopeId) {
        let name = self.arena[extension].internal_name.clone();
        self.arena[id].extension = Some(TypeRef::Resolved { name, id: extension });
    }

    fn set_value_type(&mut self, id: ScopeId, value: ScopeId) {
        let name = self.arena[value].internal_name.clone();
        self.arena[id].value_type = Some(TypeRef::Resolved { name, id: value });
    }

    fn script_object(&mut self, internal: &str) -> ScopeId {
        let id = self.arena.create_type(internal, AccessSemantics::Value);
        self.arena[id].is_script = true;
        id
    }

    fn readonly_property(&mut self, owner: ScopeId, name: &str, ty: ScopeId) {
        let mut property = Property::new(name, self.arena[ty].internal_name.clone());
        property.ty = Some(ty);
        property.is_writable = false;
        self.arena[owner].insert_property(property);
    }

    fn method(&mut self, owner: ScopeId, name: &str, ret: ScopeId, params: &[(&str, ScopeId)]) {
        let mut method = Method::new(name, MethodKind::Method);
        method.return_type_name = self.arena[ret].internal_name.clone();
        method.return_type = Some(ret);
        for (param_name, ty) in params {
            let mut parameter = Parameter::new(*param_name, self.arena[*ty].internal_name.clone());
            parameter.ty = Some(*ty);
            method.parameters.push(parameter);
        }
        self.arena[owner].methods.push(method);
    }
}

const MATH_CONSTANTS: &[&str] = &["E", "LN10", "LN2", "LOG10E", "LOG2E", "PI", "SQRT1_2", "SQRT2"];

const MATH_UNARY: &[&str] = &[
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atanh", "cbrt", "ceil", "clz32", "cos",
    "cosh", "exp", "expm1", "floor", "fround", "log", "log10", "log1p", "log2", "round", "sign",
    "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
];

const MATH_BINARY: &[&str] = &["atan2", "hypot", "imul", "max", "min", "pow"];

const CONSOLE_METHODS: &[&str] = &["log", "debug", "info", "warn", "error"];

/// Install the builtin types into `arena` and register their names in
/// `types`, both under their native and their QML names.
pub fn install(arena: &mut ScopeArena, types: &mut ContextualTypes) -> BuiltinTypes {
    let mut i = Installer { arena, types };
    use AccessSemantics::{None as NoAccess, Reference, Sequence, Value};

    let void = i.native("void", NoAccess, None);
    let null = i.native("std::nullptr_t", Value, None);
    let number_prototype = i.script_object("NumberPrototype");

    let real = i.native("double", Value, None);
    let float = i.native("float", Value, None);
    let int = i.native("int", Value, None);
    let bool = i.native("bool", Value, None);
    let string = i.native("QString", Value, None);
    let url = i.native("QUrl", Value, None);
    let date_time = i.native("QDateTime", Value, None);
    let date = i.native("QDate", Value, Some("qdatetime.h"));
    let time = i.native("QTime", Value, Some("qdatetime.h"));
    let byte_array = i.native("QByteArray", Value, Some("qbytearray.h"));
    let var = i.native("QVariant", Value, None);
    let js_value = i.native("QJSValue", Value, None);
    let string_list = i.native("QStringList", Sequence, None);
    let variant_list = i.native("QVariantList", Sequence, None);
    let js_primitive = i.native("QJSPrimitiveValue", Value, Some("qjsprimitivevalue.h"));
    let object = i.native("QObject", Reference, Some("qobject.h"));
    let component = i.native("QQmlComponent", Reference, Some("qqmlcomponent.h"));
    let list_property = i.native("QQmlListProperty<QObject>", Sequence, Some("qqmllist.h"));
    let meta_object = i.native("const QMetaObject", Reference, Some("qmetaobject.h"));
    let empty_list = i.arena.create_type("void*", Sequence);

    for numeric in [real, float, int] {
        i.set_extension(numeric, number_prototype);
    }
    for name in [
        "qlonglong", "qulonglong", "long", "ulong", "uint", "short", "ushort", "char", "uchar",
        "qint64", "quint64", "qint32", "quint32", "qint16", "quint16", "qint8", "quint8",
    ] {
        let id = i.native(name, Value, Some("qglobal.h"));
        i.set_extension(id, number_prototype);
    }

    i.set_value_type(string_list, string);
    i.set_value_type(variant_list, var);
    i.set_value_type(list_property, object);
    i.set_base(component, object);

    i.export("real", real);
    i.export("number", real);
    i.export("string", string);
    i.export("url", url);
    i.export("date", date_time);
    i.export("var", var);
    i.export("variant", var);
    i.export("QtObject", object);
    i.export("Component", component);
    i.types.set_array_type(variant_list);

    let math = i.script_object("MathObject");
    for constant in MATH_CONSTANTS {
        i.readonly_property(math, constant, real);
    }
    for name in MATH_UNARY {
        i.method(math, name, real, &[("x", real)]);
    }
    for name in MATH_BINARY {
        i.method(math, name, real, &[("x", real), ("y", real)]);
    }
    i.method(math, "random", real, &[]);

    let console = i.script_object("Console");
    for name in CONSOLE_METHODS {
        i.method(console, name, void, &[]);
    }

    let js_global = i.script_object("GlobalObject");
    i.readonly_property(js_global, "Math", math);
    i.readonly_property(js_global, "console", console);
    i.readonly_property(js_global, "NaN", real);
    i.readonly_property(js_global, "Infinity", real);
    i.readonly_property(js_global, "undefined", void);

    BuiltinTypes {
        void,
        null,
        real,
        float,
        int,
        bool,
        string,
        string_list,
        url,
        date_time,
        date,
        time,
        byte_array,
        variant_list,
        var,
        js_value,
        js_primitive,
        list_property,
        meta_object,
        empty_list,
        object,
        component,
        number_prototype,
        js_global,
        math,
        console,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeLookup;

    #[test]
    fn test_qml_names_resolve_to_native_types() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = install(&mut arena, &mut types);

        assert_eq!(types.lookup("real"), TypeLookup::Found(builtins.real));
        assert_eq!(types.lookup("string"), TypeLookup::Found(builtins.string));
        assert_eq!(types.lookup("QtObject"), TypeLookup::Found(builtins.object));
        assert_eq!(arena[builtins.string].internal_name, "QString");
        assert_eq!(types.array_type(), Some(builtins.variant_list));
    }

    #[test]
    fn test_math_and_console_are_script_objects() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = install(&mut arena, &mut types);

        assert!(arena[builtins.math].is_script);
        assert!(arena.has_method(builtins.math, "max"));
        assert!(arena.has_method(builtins.console, "log"));
        let (_, math) = arena.property(builtins.js_global, "Math").expect("Math on global object");
        assert_eq!(math.ty, Some(builtins.math));
    }

    #[test]
    fn test_component_derives_from_object() {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = install(&mut arena, &mut types);
        assert!(arena.inherits(builtins.component, builtins.object));
    }
}
