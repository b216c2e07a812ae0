//! The conversion matrix.
//!
//! [`convert_stored`] turns an expression of one native representation into
//! another. [`convert_contained`] works on register contents: it checks the
//! logical types are convertible at all and handles the conversions that
//! depend on what a value is rather than how it is stored.

use qmlaot_scope::{AccessSemantics, MethodKind, ScopeId};

use crate::error::Rejection;
use crate::literal::string_literal;
use crate::register::RegisterContent;
use crate::resolver::TypeResolver;

/// Convert `variable`, stored as `from`, into the representation `to`.
pub fn convert_stored(r: &TypeResolver<'_>, from: ScopeId, to: ScopeId, variable: &str) -> String {
    let b = r.builtins();

    if from == b.void {
        if r.is_reference(to) {
            return format!("static_cast<{} *>(nullptr)", r.internal_name(to));
        }
        if let Some(zero) = zero_bool_or_numeric(r, to) {
            return zero.to_string();
        }
        if to == b.string {
            return string_literal("undefined");
        }
        if to == from {
            return variable.to_string();
        }
        return format!("{}()", r.augmented_internal_name(to));
    }

    if from == to {
        return variable.to_string();
    }

    if from == b.null {
        if r.is_reference(to) {
            return format!("static_cast<{} *>(nullptr)", r.internal_name(to));
        }
        if to == b.js_primitive {
            return "QJSPrimitiveValue(QJSPrimitiveNull())".to_string();
        }
        if to == b.js_value {
            return "QJSValue(QJSValue::NullValue)".to_string();
        }
        if to == b.var {
            return "QVariant::fromValue<std::nullptr_t>(nullptr)".to_string();
        }
    }

    if r.is_reference(from) {
        if r.is_reference(to) {
            let to_name = r.internal_name(to);
            let from_name = r.internal_name(from);
            let arena = r.arena();
            let upcast = arena.base_chain(from).into_iter().any(|base| r.internal_name(base) == to_name);
            let downcast = arena.base_chain(to).into_iter().any(|base| r.internal_name(base) == from_name);
            if upcast || downcast {
                return format!("static_cast<{} *>({})", to_name, variable);
            }
        } else if to == b.bool {
            return format!("({} != nullptr)", variable);
        }
    }

    if r.is_js_value(from) && r.is_js_value(to) {
        return variable.to_string();
    }

    if from == b.real && to == b.int {
        return format!("QJSNumberCoercion::toInteger({})", variable);
    }

    let is_bool_or_number = |ty: ScopeId| r.is_numeric(ty) || ty == b.bool || r.is_enum(ty);
    if is_bool_or_number(from) && is_bool_or_number(to) {
        return format!("{}({})", r.internal_name(to), variable);
    }

    if from == b.js_primitive {
        if to == b.real {
            return format!("{}.toDouble()", variable);
        }
        if to == b.bool {
            return format!("{}.toBoolean()", variable);
        }
        if to == b.int {
            return format!("{}.toInteger()", variable);
        }
        if to == b.string {
            return format!("{}.toString()", variable);
        }
        if to == b.js_value {
            return format!("QJSValue(QJSPrimitiveValue({}))", variable);
        }
        if to == b.var {
            return format!("{}.toVariant()", variable);
        }
        if r.is_reference(to) {
            return format!("static_cast<{} *>(nullptr)", r.internal_name(to));
        }
    }

    if r.is_js_value(from) {
        if to == b.js_primitive {
            return format!("{}.toPrimitive()", variable);
        }
        if to == b.var {
            return format!("{}.toVariant(QJSValue::RetainJSObjects)", variable);
        }
        return format!("qjsvalue_cast<{}>({})", r.augmented_internal_name(to), variable);
    }

    if to == b.js_primitive {
        return format!("QJSPrimitiveValue({})", variable);
    }

    if to == b.js_value {
        return format!("aotContext->engine->toScriptValue({})", variable);
    }

    if from == b.var {
        if to == b.list_property {
            return format!("QQmlListReference({}, aotContext->qmlEngine())", variable);
        }
        return format!(
            "aotContext->engine->fromVariant<{}>({})",
            r.augmented_internal_name(to),
            variable
        );
    }

    if to == b.var {
        return format!("QVariant::fromValue({})", variable);
    }

    if from == b.url && to == b.string {
        return format!("{}.toString()", variable);
    }

    if from == b.string && to == b.url {
        return format!("QUrl({})", variable);
    }

    if from == b.empty_list && r.is_sequence(to) {
        return format!("{}()", r.augmented_internal_name(to));
    }

    let retrieve_from_primitive = |ty: ScopeId| -> Option<&'static str> {
        if ty == b.bool {
            Some(".toBoolean()")
        } else if ty == b.int {
            Some(".toInteger()")
        } else if ty == b.real {
            Some(".toDouble()")
        } else if ty == b.string {
            Some(".toString()")
        } else {
            None
        }
    };
    let fits_into_primitive = retrieve_from_primitive(from).is_some() || from == b.float;
    if fits_into_primitive {
        if let Some(retrieve) = retrieve_from_primitive(to) {
            return format!("QJSPrimitiveValue({}){}", variable, retrieve);
        }
    }

    format!(
        "aotContext->engine->fromScriptValue<{}>(aotContext->engine->toScriptValue({}))",
        r.augmented_internal_name(to),
        variable
    )
}

/// Convert `variable`, holding `from`, into a variable holding `to`.
///
/// Rejects pairs of logical types that cannot be converted.
pub fn convert_contained(
    r: &TypeResolver<'_>,
    from: &RegisterContent,
    to: &RegisterContent,
    variable: &str,
) -> Result<String, Rejection> {
    let b = r.builtins();
    let from_type = r.contained_type(from);
    let to_type = r.contained_type(to);

    if from.stored == to.stored && from_type == to_type {
        return Ok(variable.to_string());
    }

    let truthy_value = to_type == b.bool && is_value_type_instance(r, from_type);
    if !truthy_value && !r.can_convert_from_to(from_type, to_type) {
        return Err(Rejection::unsupported(format!(
            "conversion from {} to {}",
            r.internal_name(from_type),
            r.internal_name(to_type)
        )));
    }

    if to.stored == to_type {
        if truthy_value {
            return Ok("true".to_string());
        }

        let dates = [b.date_time, b.date, b.time];
        let date_pair = (from_type == b.string && dates.contains(&to_type))
            || (dates.contains(&from_type) && (to_type == b.string || dates.contains(&to_type)));
        if date_pair && from_type != to_type {
            let input = convert_stored(r, from.stored, from_type, variable);
            return Ok(format!(
                "aotContext->engine->coerceValue<{}, {}>({})",
                r.internal_name(from_type),
                r.internal_name(to_type),
                input
            ));
        }

        if from_type == b.string && to_type == b.byte_array {
            let input = convert_stored(r, from.stored, b.string, variable);
            return Ok(format!("{}.toUtf8()", input));
        }

        if let Some(parameter) = single_argument_constructor(r, from_type, to_type) {
            let input = convert_stored(r, from.stored, r.stored_type(parameter), variable);
            return Ok(format!("{}({})", r.internal_name(to_type), input));
        }
    }

    Ok(convert_stored(r, from.stored, to.stored, variable))
}

/// Convert a variable of plain type `from` into plain type `to`.
pub fn convert_types(
    r: &TypeResolver<'_>,
    from: ScopeId,
    to: ScopeId,
    variable: &str,
) -> Result<String, Rejection> {
    convert_contained(r, &r.global_type(from), &r.global_type(to), variable)
}

fn zero_bool_or_numeric(r: &TypeResolver<'_>, to: ScopeId) -> Option<&'static str> {
    let b = r.builtins();
    if to == b.bool {
        Some("false")
    } else if to == b.int {
        Some("0")
    } else if to == b.float {
        Some("0.0f")
    } else if to == b.real {
        Some("0.0")
    } else {
        None
    }
}

/// Instances of value types other than the script value containers are
/// objects, and objects are truthy.
fn is_value_type_instance(r: &TypeResolver<'_>, ty: ScopeId) -> bool {
    let b = r.builtins();
    r.arena()[ty].access == AccessSemantics::Value
        && !r.is_primitive(ty)
        && !r.is_numeric(ty)
        && !r.is_enum(ty)
        && ![b.var, b.js_value, b.js_primitive, b.url].contains(&ty)
        && !r.arena()[ty].is_script
}

/// Parameter type of a constructor of value type `to` that takes a single
/// argument `from` converts to.
fn single_argument_constructor(r: &TypeResolver<'_>, from: ScopeId, to: ScopeId) -> Option<ScopeId> {
    if r.arena()[to].access != AccessSemantics::Value || r.is_primitive(to) {
        return None;
    }
    let constructors: Vec<ScopeId> = r
        .arena()
        .get(to)
        .methods
        .iter()
        .filter(|method| method.kind == MethodKind::Constructor && method.parameters.len() == 1)
        .filter_map(|method| method.parameters[0].ty)
        .collect();
    constructors
        .iter()
        .copied()
        .find(|parameter| *parameter == from)
        .or_else(|| {
            constructors
                .iter()
                .copied()
                .find(|parameter| r.can_primitively_convert_from_to(from, *parameter))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{BuiltinTypes, ContextualTypes, Method, Parameter, ScopeArena, TypeRef};

    fn setup() -> (ScopeArena, BuiltinTypes) {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        (arena, builtins)
    }

    #[test]
    fn test_void_produces_defaults() {
        let (arena, b) = setup();
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(convert_stored(&r, b.void, b.int, "x"), "0");
        assert_eq!(convert_stored(&r, b.void, b.real, "x"), "0.0");
        assert_eq!(convert_stored(&r, b.void, b.bool, "x"), "false");
        assert_eq!(convert_stored(&r, b.void, b.string, "x"), "QStringLiteral(\"undefined\")");
        assert_eq!(convert_stored(&r, b.void, b.object, "x"), "static_cast<QObject *>(nullptr)");
        assert_eq!(convert_stored(&r, b.void, b.var, "x"), "QVariant()");
    }

    #[test]
    fn test_numeric_conversions() {
        let (arena, b) = setup();
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(convert_stored(&r, b.real, b.int, "r2"), "QJSNumberCoercion::toInteger(r2)");
        assert_eq!(convert_stored(&r, b.int, b.real, "r2"), "double(r2)");
        assert_eq!(convert_stored(&r, b.int, b.bool, "r2"), "bool(r2)");
        assert_eq!(convert_stored(&r, b.int, b.string, "r2"), "QJSPrimitiveValue(r2).toString()");
    }

    #[test]
    fn test_container_conversions() {
        let (arena, b) = setup();
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(convert_stored(&r, b.js_primitive, b.real, "p"), "p.toDouble()");
        assert_eq!(convert_stored(&r, b.int, b.js_primitive, "i"), "QJSPrimitiveValue(i)");
        assert_eq!(convert_stored(&r, b.var, b.int, "v"), "aotContext->engine->fromVariant<int>(v)");
        assert_eq!(convert_stored(&r, b.int, b.var, "i"), "QVariant::fromValue(i)");
        assert_eq!(convert_stored(&r, b.js_value, b.var, "j"), "j.toVariant(QJSValue::RetainJSObjects)");
        assert_eq!(convert_stored(&r, b.string, b.url, "s"), "QUrl(s)");
        assert_eq!(convert_stored(&r, b.object, b.bool, "o"), "(o != nullptr)");
    }

    #[test]
    fn test_reference_casts_both_directions() {
        let (mut arena, b) = setup();
        let item = arena.create_type("QQuickItem", AccessSemantics::Reference);
        arena[item].file_path = Some("qquickitem.h".into());
        arena[item].base = Some(TypeRef::Resolved { name: "QObject".into(), id: b.object });
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(convert_stored(&r, item, b.object, "o"), "static_cast<QObject *>(o)");
        assert_eq!(convert_stored(&r, b.object, item, "o"), "static_cast<QQuickItem *>(o)");
    }

    #[test]
    fn test_contained_rejects_impossible_pairs() {
        let (arena, b) = setup();
        let r = TypeResolver::new(&arena, &b);
        let error = convert_types(&r, b.url, b.int, "u").unwrap_err();
        assert_eq!(error.to_string(), "Cannot generate efficient code for conversion from QUrl to int");
    }

    #[test]
    fn test_contained_string_to_dates() {
        let (arena, b) = setup();
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(
            convert_types(&r, b.string, b.date, "s").unwrap(),
            "aotContext->engine->coerceValue<QString, QDate>(s)"
        );
        assert_eq!(
            convert_types(&r, b.time, b.date_time, "t").unwrap(),
            "aotContext->engine->coerceValue<QTime, QDateTime>(t)"
        );
        assert_eq!(convert_types(&r, b.string, b.byte_array, "s").unwrap(), "s.toUtf8()");
    }

    #[test]
    fn test_value_types_are_truthy() {
        let (mut arena, b) = setup();
        let point = arena.create_type("QPointF", AccessSemantics::Value);
        arena[point].file_path = Some("qpoint.h".into());
        let r = TypeResolver::new(&arena, &b);
        assert_eq!(convert_types(&r, point, b.bool, "p").unwrap(), "true");
    }

    #[test]
    fn test_single_argument_constructor() {
        let (mut arena, b) = setup();
        let color = arena.create_type("QColor", AccessSemantics::Value);
        arena[color].file_path = Some("qcolor.h".into());
        let mut constructor = Method::new("QColor", MethodKind::Constructor);
        let mut parameter = Parameter::new("name", "QString");
        parameter.ty = Some(b.string);
        constructor.parameters.push(parameter);
        arena[color].methods.push(constructor);
        let r = TypeResolver::new(&arena, &b);
        let from = r.global_type(b.js_primitive);
        let mut to = r.global_type(color);
        to.content = crate::register::Content::Type(color);
        let from = RegisterContent { content: crate::register::Content::Type(b.string), ..from };
        assert_eq!(convert_contained(&r, &from, &to, "p").unwrap(), "QColor(p.toString())");
    }
}
