//! Library calls lowered to native expressions instead of lookups.
//!
//! Covers the `Math` functions, `console` logging, `string.arg()`, the
//! translation functions and a few list methods. Every helper returns `None` when the call has no inline form; the caller
//! then falls back to a generic call or rejects.

use qmlaot_scope::ScopeId;

use crate::conversion::convert_stored;
use crate::resolver::TypeResolver;

const NAN: &str = "std::numeric_limits<double>::quiet_NaN()";
const INFINITY: &str = "std::numeric_limits<double>::infinity()";

/// Headers inlined `Math` code needs.
pub const MATH_INCLUDES: &[&str] = &["cmath", "limits", "qalgorithms.h", "qrandom.h"];

const NO_INCLUDES: &[&str] = &[];

/// Headers inlined translation calls need.
pub const TRANSLATION_INCLUDES: &[&str] = &["QtCore/qcoreapplication.h"];

/// An argument of an inlined call: its stored type and the expression
/// reading it.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Stored type
    pub stored: ScopeId,
    /// Expression
    pub expression: String,
}

/// Native code for an inlined call.
#[derive(Debug, Clone, PartialEq)]
pub struct Inlined {
    /// Statements
    pub code: String,
    /// Headers the statements need
    pub includes: &'static [&'static str],
}

/// Expression for `Math.<name>` over the locals `arg1`..`argN`.
///
/// `atan2`, `expm1`, `hypot` and `pow` are left to the runtime.
pub fn math_expression(name: &str, argc: usize) -> Option<String> {
    let expression = match (name, argc) {
        ("abs", 1) => "(qIsNull(arg1) ? 0 : (arg1 < 0.0 ? -arg1 : arg1))".to_string(),
        ("acos", 1) => format!("arg1 > 1.0 ? {} : std::acos(arg1)", NAN),
        ("acosh", 1) => format!("arg1 < 1.0 ? {} : std::acosh(arg1)", NAN),
        ("asin", 1) => format!("arg1 > 1.0 ? {} : std::asin(arg1)", NAN),
        ("asinh", 1) => "qIsNull(arg1) ? arg1 : std::asinh(arg1)".to_string(),
        ("atan", 1) => "qIsNull(arg1) ? arg1 : std::atan(arg1)".to_string(),
        ("atanh", 1) => "qIsNull(arg1) ? arg1 : std::atanh(arg1)".to_string(),
        ("cbrt", 1) => "std::cbrt(arg1)".to_string(),
        ("ceil", 1) => {
            "(arg1 < 0.0 && arg1 > -1.0) ? std::copysign(0.0, -1.0) : std::ceil(arg1)".to_string()
        }
        ("clz32", 1) => {
            "qint32(qCountLeadingZeroBits(quint32(QJSNumberCoercion::toInteger(arg1))))".to_string()
        }
        ("cos", 1) => "std::cos(arg1)".to_string(),
        ("cosh", 1) => "std::cosh(arg1)".to_string(),
        ("exp", 1) => format!(
            "std::isinf(arg1) ? (std::copysign(1.0, arg1) == -1 ? 0.0 : {}) : std::exp(arg1)",
            INFINITY
        ),
        ("floor", 1) => "std::floor(arg1)".to_string(),
        ("fround", 1) => {
            "(std::isnan(arg1) || std::isinf(arg1) || qIsNull(arg1)) ? arg1 : double(float(arg1))"
                .to_string()
        }
        ("imul", 2) => "qint32(quint32(QJSNumberCoercion::toInteger(arg1)) \
                        * quint32(QJSNumberCoercion::toInteger(arg2)))"
            .to_string(),
        ("log", 1) => format!("arg1 < 0.0 ? {} : std::log(arg1)", NAN),
        ("log10", 1) => format!("arg1 < 0.0 ? {} : std::log10(arg1)", NAN),
        ("log1p", 1) => format!("arg1 < -1.0 ? {} : std::log1p(arg1)", NAN),
        ("log2", 1) => format!("arg1 < -0.0 ? {} : std::log2(arg1)", NAN),
        ("max", 2) => "(qIsNull(arg2) && qIsNull(arg1) && std::copysign(1.0, arg2) == 1) \
                       ? arg2 : ((arg2 > arg1 || std::isnan(arg2)) ? arg2 : arg1)"
            .to_string(),
        ("min", 2) => "(qIsNull(arg2) && qIsNull(arg1) && std::copysign(1.0, arg2) == -1) \
                       ? arg2 : ((arg2 < arg1 || std::isnan(arg2)) ? arg2 : arg1)"
            .to_string(),
        ("random", 0) => "QRandomGenerator::global()->generateDouble()".to_string(),
        ("round", 1) => "std::isfinite(arg1) ? ((arg1 < 0.5 && arg1 >= -0.5) \
                         ? std::copysign(0.0, arg1) : std::floor(arg1 + 0.5)) : arg1"
            .to_string(),
        ("sign", 1) => format!(
            "std::isnan(arg1) ? {} : (qIsNull(arg1) ? arg1 : (std::signbit(arg1) ? -1.0 : 1.0))",
            NAN
        ),
        ("sin", 1) => "qIsNull(arg1) ? arg1 : std::sin(arg1)".to_string(),
        ("sinh", 1) => "qIsNull(arg1) ? arg1 : std::sinh(arg1)".to_string(),
        ("sqrt", 1) => "std::sqrt(arg1)".to_string(),
        ("tan", 1) => "qIsNull(arg1) ? arg1 : std::tan(arg1)".to_string(),
        ("tanh", 1) => "qIsNull(arg1) ? arg1 : std::tanh(arg1)".to_string(),
        ("trunc", 1) => "std::trunc(arg1)".to_string(),
        _ => return None,
    };
    Some(expression)
}

/// Inline `Math.<name>(args)` into `out`, which must be stored as `double`.
pub fn inline_math(
    r: &TypeResolver<'_>,
    name: &str,
    arguments: &[Argument],
    out_stored: ScopeId,
    out: &str,
) -> Option<Inlined> {
    let real = r.builtins().real;
    if out_stored != real {
        return None;
    }
    let expression = math_expression(name, arguments.len())?;

    let mut code = String::from("{\n");
    for (i, argument) in arguments.iter().enumerate() {
        code.push_str(&format!(
            "const double arg{} = {};\n",
            i + 1,
            convert_stored(r, argument.stored, real, &argument.expression)
        ));
    }
    code.push_str(&format!("{} = {};\n}}\n", out, expression));
    Some(Inlined {
        code,
        includes: MATH_INCLUDES,
    })
}

/// Message type a `console` method logs with.
fn console_message_type(name: &str) -> Option<&'static str> {
    match name {
        "log" | "debug" => Some("QtDebugMsg"),
        "info" => Some("QtInfoMsg"),
        "warn" => Some("QtWarningMsg"),
        "error" => Some("QtCriticalMsg"),
        _ => None,
    }
}

/// Inline `console.<name>(args)`: the arguments are converted to strings,
/// joined with spaces and handed to the runtime's console writer.
pub fn inline_console(r: &TypeResolver<'_>, name: &str, arguments: &[Argument]) -> Option<Inlined> {
    let message_type = console_message_type(name)?;
    let string = r.builtins().string;
    let message = if arguments.is_empty() {
        "QString()".to_string()
    } else {
        arguments
            .iter()
            .map(|argument| convert_stored(r, argument.stored, string, &argument.expression))
            .collect::<Vec<_>>()
            .join(" + QLatin1Char(' ') + ")
    };
    Some(Inlined {
        code: format!(
            "{{\nconst QString message = {};\naotContext->writeToConsole({}, message);\n}}\n",
            message, message_type
        ),
        includes: &[],
    })
}

/// Inline `base.arg(argument)` on a string `base` into `out`, which must
/// be stored as `QString`.
pub fn inline_string_arg(
    r: &TypeResolver<'_>,
    base: &Argument,
    argument: &Argument,
    out_stored: ScopeId,
    out: &str,
) -> Option<Inlined> {
    let string = r.builtins().string;
    if base.stored != string || out_stored != string {
        return None;
    }
    Some(Inlined {
        code: format!(
            "{} = {}.arg({});\n",
            out,
            base.expression,
            convert_stored(r, argument.stored, string, &argument.expression)
        ),
        includes: &[],
    })
}

/// Whether `name` is one of the global translation functions.
pub fn is_translation_function(name: &str) -> bool {
    matches!(
        name,
        "qsTr" | "qsTranslate" | "qsTrId" | "QT_TR_NOOP" | "QT_TRANSLATE_NOOP" | "QT_TRID_NOOP"
    )
}

/// Inline a translation function call into `out`, which must be stored as
/// `QString`. Texts must already be strings and plural counts numbers.
pub fn inline_translation(
    r: &TypeResolver<'_>,
    name: &str,
    arguments: &[Argument],
    out_stored: ScopeId,
    out: &str,
) -> Option<Inlined> {
    let b = r.builtins();
    if out_stored != b.string {
        return None;
    }
    let text = |i: usize| -> Option<String> {
        let argument = arguments.get(i)?;
        (argument.stored == b.string).then(|| format!("{}.toUtf8().constData()", argument.expression))
    };
    let optional_text = |i: usize| -> Option<String> {
        if i < arguments.len() {
            text(i)
        } else {
            Some("nullptr".to_string())
        }
    };
    let count = |i: usize| -> Option<String> {
        match arguments.get(i) {
            None => Some("-1".to_string()),
            Some(argument) if r.is_numeric(argument.stored) => {
                Some(convert_stored(r, argument.stored, b.int, &argument.expression))
            }
            Some(_) => None,
        }
    };

    let (value, includes) = match (name, arguments.len()) {
        ("qsTr", 1..=3) => (
            format!(
                "QCoreApplication::translate(aotContext->translationContext().toUtf8().constData(), {}, {}, {})",
                text(0)?,
                optional_text(1)?,
                count(2)?
            ),
            TRANSLATION_INCLUDES,
        ),
        ("qsTranslate", 2..=4) => (
            format!(
                "QCoreApplication::translate({}, {}, {}, {})",
                text(0)?,
                text(1)?,
                optional_text(2)?,
                count(3)?
            ),
            TRANSLATION_INCLUDES,
        ),
        ("qsTrId", 1..=2) => (format!("qtTrId({}, {})", text(0)?, count(1)?), TRANSLATION_INCLUDES),
        ("QT_TR_NOOP" | "QT_TRID_NOOP", 1) | ("QT_TRANSLATE_NOOP", 2) => {
            let argument = arguments.last()?;
            if argument.stored != b.string {
                return None;
            }
            (argument.expression.clone(), NO_INCLUDES)
        }
        _ => return None,
    };
    Some(Inlined {
        code: format!("{} = {};\n", out, value),
        includes,
    })
}

/// Inline `base.<name>(args)` on a list property or a string list.
///
/// `push` appends to a list property and yields the new length. On string
/// lists `includes`, `indexOf` and `join` have inline forms; they write
/// nothing when `out` is `None`. `out` is the stored type and variable of
/// the result.
pub fn inline_list_method(
    r: &TypeResolver<'_>,
    base: &Argument,
    element: ScopeId,
    name: &str,
    arguments: &[Argument],
    out: Option<(ScopeId, &str)>,
) -> Option<Inlined> {
    let b = r.builtins();
    let assign = |from: ScopeId, expression: String| match out {
        Some((stored, variable)) => format!("{} = {};\n", variable, convert_stored(r, from, stored, &expression)),
        None => String::new(),
    };

    let code = if base.stored == b.list_property {
        if name != "push" || arguments.is_empty() {
            return None;
        }
        let mut code = String::new();
        for argument in arguments {
            if !r.is_reference(argument.stored) {
                return None;
            }
            code.push_str(&format!(
                "{base}.append(&{base}, {value});\n",
                base = base.expression,
                value = convert_stored(r, argument.stored, element, &argument.expression)
            ));
        }
        code.push_str(&assign(b.int, format!("{base}.count(&{base})", base = base.expression)));
        code
    } else if base.stored == b.string_list {
        let string_argument = || -> Option<&str> {
            match arguments {
                [argument] if argument.stored == b.string => Some(argument.expression.as_str()),
                _ => None,
            }
        };
        match name {
            "includes" => assign(b.bool, format!("{}.contains({})", base.expression, string_argument()?)),
            "indexOf" => assign(b.int, format!("int({}.indexOf({}))", base.expression, string_argument()?)),
            "join" => {
                let separator = match arguments {
                    [] => "QStringLiteral(\",\")".to_string(),
                    [separator] if r.is_primitive(separator.stored) && separator.stored != b.void => {
                        convert_stored(r, separator.stored, b.string, &separator.expression)
                    }
                    _ => return None,
                };
                assign(b.string, format!("{}.join({})", base.expression, separator))
            }
            _ => return None,
        }
    } else {
        return None;
    };
    Some(Inlined { code, includes: &[] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{BuiltinTypes, ContextualTypes, ScopeArena};

    fn fixture() -> (ScopeArena, BuiltinTypes) {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        (arena, builtins)
    }

    fn arg(stored: ScopeId, expression: &str) -> Argument {
        Argument {
            stored,
            expression: expression.to_string(),
        }
    }

    #[test]
    fn test_math_templates() {
        assert_eq!(math_expression("sqrt", 1).as_deref(), Some("std::sqrt(arg1)"));
        assert!(math_expression("log2", 1).unwrap().starts_with("arg1 < -0.0 ?"));
        assert!(math_expression("pow", 2).is_none());
        assert!(math_expression("sqrt", 2).is_none());
    }

    #[test]
    fn test_signed_zero_and_nan_templates() {
        assert_eq!(
            math_expression("max", 2).unwrap(),
            "(qIsNull(arg2) && qIsNull(arg1) && std::copysign(1.0, arg2) == 1) \
             ? arg2 : ((arg2 > arg1 || std::isnan(arg2)) ? arg2 : arg1)"
        );
        assert_eq!(
            math_expression("min", 2).unwrap(),
            "(qIsNull(arg2) && qIsNull(arg1) && std::copysign(1.0, arg2) == -1) \
             ? arg2 : ((arg2 < arg1 || std::isnan(arg2)) ? arg2 : arg1)"
        );
        assert_eq!(
            math_expression("round", 1).unwrap(),
            "std::isfinite(arg1) ? ((arg1 < 0.5 && arg1 >= -0.5) \
             ? std::copysign(0.0, arg1) : std::floor(arg1 + 0.5)) : arg1"
        );
        assert_eq!(
            math_expression("sign", 1).unwrap(),
            "std::isnan(arg1) ? std::numeric_limits<double>::quiet_NaN() \
             : (qIsNull(arg1) ? arg1 : (std::signbit(arg1) ? -1.0 : 1.0))"
        );
    }

    #[test]
    fn test_inline_math_converts_arguments() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let inlined = inline_math(&r, "max", &[arg(b.int, "r7"), arg(b.real, "r8")], b.real, "r2")
            .expect("max inlines");
        assert!(inlined.code.starts_with("{\nconst double arg1 = double(r7);\nconst double arg2 = r8;\n"));
        assert!(inlined.code.ends_with(";\n}\n"));
        assert_eq!(inlined.includes, MATH_INCLUDES);

        assert!(inline_math(&r, "abs", &[arg(b.real, "r7")], b.var, "r2").is_none());
    }

    #[test]
    fn test_console_joins_arguments() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let inlined = inline_console(&r, "warn", &[arg(b.string, "r7"), arg(b.string, "r8")]).unwrap();
        assert_eq!(
            inlined.code,
            "{\nconst QString message = r7 + QLatin1Char(' ') + r8;\n\
             aotContext->writeToConsole(QtWarningMsg, message);\n}\n"
        );
        assert!(inline_console(&r, "table", &[]).is_none());
    }

    #[test]
    fn test_string_arg() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let inlined = inline_string_arg(&r, &arg(b.string, "r7"), &arg(b.string, "r8"), b.string, "r2")
            .unwrap();
        assert_eq!(inlined.code, "r2 = r7.arg(r8);\n");
    }

    #[test]
    fn test_translations() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);

        let inlined = inline_translation(&r, "qsTr", &[arg(b.string, "r7")], b.string, "r2").unwrap();
        assert_eq!(
            inlined.code,
            "r2 = QCoreApplication::translate(aotContext->translationContext().toUtf8().constData(), \
             r7.toUtf8().constData(), nullptr, -1);\n"
        );
        assert_eq!(inlined.includes, TRANSLATION_INCLUDES);

        let inlined = inline_translation(
            &r,
            "qsTranslate",
            &[arg(b.string, "r7"), arg(b.string, "r8"), arg(b.string, "r9"), arg(b.int, "r10")],
            b.string,
            "r2",
        )
        .unwrap();
        assert_eq!(
            inlined.code,
            "r2 = QCoreApplication::translate(r7.toUtf8().constData(), r8.toUtf8().constData(), \
             r9.toUtf8().constData(), r10);\n"
        );

        let inlined = inline_translation(&r, "qsTrId", &[arg(b.string, "r7")], b.string, "r2").unwrap();
        assert_eq!(inlined.code, "r2 = qtTrId(r7.toUtf8().constData(), -1);\n");

        let inlined =
            inline_translation(&r, "QT_TRANSLATE_NOOP", &[arg(b.string, "r7"), arg(b.string, "r8")], b.string, "r2")
                .unwrap();
        assert_eq!(inlined.code, "r2 = r8;\n");
        assert!(inlined.includes.is_empty());

        assert!(inline_translation(&r, "qsTr", &[arg(b.int, "r7")], b.string, "r2").is_none());
        assert!(inline_translation(&r, "qsTr", &[arg(b.string, "r7")], b.var, "r2").is_none());
        assert!(inline_translation(&r, "qsTr", &[], b.string, "r2").is_none());
        assert!(is_translation_function("qsTrId"));
        assert!(!is_translation_function("tr"));
    }

    #[test]
    fn test_list_property_push() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let base = arg(b.list_property, "r7");
        let pushed = [arg(b.object, "r8"), arg(b.object, "r9")];

        let inlined = inline_list_method(&r, &base, b.object, "push", &pushed, Some((b.int, "r2"))).unwrap();
        assert_eq!(
            inlined.code,
            "r7.append(&r7, r8);\nr7.append(&r7, r9);\nr2 = r7.count(&r7);\n"
        );

        let inlined = inline_list_method(&r, &base, b.object, "push", &pushed[..1], None).unwrap();
        assert_eq!(inlined.code, "r7.append(&r7, r8);\n");

        assert!(inline_list_method(&r, &base, b.object, "push", &[arg(b.int, "r8")], None).is_none());
        assert!(inline_list_method(&r, &base, b.object, "pop", &[], None).is_none());
    }

    #[test]
    fn test_string_list_methods() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let base = arg(b.string_list, "r7");
        let needle = [arg(b.string, "r8")];

        let includes = inline_list_method(&r, &base, b.string, "includes", &needle, Some((b.bool, "r2"))).unwrap();
        assert_eq!(includes.code, "r2 = r7.contains(r8);\n");

        let index = inline_list_method(&r, &base, b.string, "indexOf", &needle, Some((b.int, "r2"))).unwrap();
        assert_eq!(index.code, "r2 = int(r7.indexOf(r8));\n");

        let joined = inline_list_method(&r, &base, b.string, "join", &[], Some((b.string, "r2"))).unwrap();
        assert_eq!(joined.code, "r2 = r7.join(QStringLiteral(\",\"));\n");

        let unused = inline_list_method(&r, &base, b.string, "includes", &needle, None).unwrap();
        assert!(unused.code.is_empty());

        // Strict equality: a number never equals a string element.
        assert!(inline_list_method(&r, &base, b.string, "includes", &[arg(b.int, "r8")], None).is_none());
    }
}
