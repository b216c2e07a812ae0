//! Method overload resolution.
//!
//! Picks the overload the interpreter would call for a given list of
//! argument contents, so compiled and interpreted calls agree:
//!
//! 1. Overloads with more parameters than supplied arguments, or with a
//!    parameter of unknown type, are impossible.
//! 2. Of the rest, those leaving the fewest arguments unused win.
//! 3. Among those, the lowest sum of per-argument match scores wins.
//!    On a tie the earlier candidate in the overload chain is kept, which
//!    is the most derived and last declared one.

use qmlaot_scope::{Method, ScopeId};

use crate::error::Rejection;
use crate::register::RegisterContent;
use crate::resolver::TypeResolver;

/// Score of an argument that converts only through a generic fallback.
const NO_MATCH: u32 = 10;

/// What the argument is at runtime, as far as overload matching cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actual {
    Number,
    String,
    Bool,
    Date,
    Array,
    Null,
    Object(ScopeId),
    Variant,
    Value(ScopeId),
}

fn classify(r: &TypeResolver<'_>, argument: &RegisterContent) -> Actual {
    let b = r.builtins();
    let ty = r.contained_type(argument);
    if r.is_numeric(ty) || r.is_enum(ty) {
        Actual::Number
    } else if ty == b.string {
        Actual::String
    } else if ty == b.bool {
        Actual::Bool
    } else if [b.date_time, b.date, b.time].contains(&ty) {
        Actual::Date
    } else if r.is_list(argument) || ty == b.empty_list {
        Actual::Array
    } else if ty == b.null {
        Actual::Null
    } else if r.is_reference(ty) {
        Actual::Object(ty)
    } else if ty == b.var {
        Actual::Variant
    } else {
        Actual::Value(ty)
    }
}

/// How well `argument` matches a parameter of type `parameter`. Zero is a
/// perfect match, higher is worse.
pub fn match_score(r: &TypeResolver<'_>, argument: &RegisterContent, parameter: ScopeId) -> u32 {
    let name = r.internal_name(parameter);
    match classify(r, argument) {
        Actual::Number => match name {
            "double" => 0,
            "float" => 1,
            "qlonglong" | "qulonglong" | "qint64" | "quint64" => 2,
            "long" | "ulong" => 3,
            "int" | "uint" | "qint32" | "quint32" => 4,
            "short" | "ushort" | "qint16" | "quint16" => 5,
            "char" | "uchar" | "qint8" | "quint8" => 6,
            "QJsonValue" => 5,
            _ => NO_MATCH,
        },
        Actual::String => match name {
            "QString" => 0,
            "QJsonValue" => 5,
            _ => NO_MATCH,
        },
        Actual::Bool => match name {
            "bool" => 0,
            "QJsonValue" => 5,
            _ => NO_MATCH,
        },
        Actual::Date => match name {
            "QDateTime" => 0,
            "QDate" => 1,
            "QTime" => 2,
            _ => NO_MATCH,
        },
        Actual::Array => match name {
            "QJsonArray" => 3,
            "QStringList" | "QVariantList" => 5,
            "QVector4D" | "QMatrix4x4" => 6,
            "QVector3D" => 7,
            _ => NO_MATCH,
        },
        Actual::Null => {
            if r.is_reference(parameter) || name == "QJsonValue" || name.ends_with('*') {
                0
            } else {
                NO_MATCH
            }
        }
        Actual::Object(ty) => {
            let derives = r
                .arena()
                .base_chain(ty)
                .into_iter()
                .any(|base| r.internal_name(base) == name);
            if r.is_reference(parameter) && derives {
                0
            } else {
                NO_MATCH
            }
        }
        Actual::Variant => {
            if parameter == r.builtins().var {
                0
            } else {
                NO_MATCH
            }
        }
        Actual::Value(ty) => {
            if name == r.internal_name(ty) {
                0
            } else if name == "QJsonObject" {
                5
            } else {
                NO_MATCH
            }
        }
    }
}

/// Choose the overload to call with `arguments`.
///
/// `overloads` must be in chain order as produced by
/// [`TypeResolver::overload_chain`].
pub fn resolve_overload<'m>(
    r: &TypeResolver<'_>,
    overloads: &'m [Method],
    arguments: &[RegisterContent],
) -> Result<&'m Method, Rejection> {
    let mut best: Option<(&Method, usize, u32)> = None;

    for candidate in overloads {
        let Some(parameters) = candidate
            .parameters
            .iter()
            .map(|parameter| parameter.ty)
            .collect::<Option<Vec<ScopeId>>>()
        else {
            continue;
        };
        if parameters.len() > arguments.len() {
            continue;
        }

        let unused = arguments.len() - parameters.len();
        if best.is_some_and(|(_, best_unused, _)| unused > best_unused) {
            continue;
        }

        let score: u32 = parameters
            .iter()
            .zip(arguments)
            .map(|(parameter, argument)| match_score(r, argument, *parameter))
            .sum();

        let better = match best {
            None => true,
            Some((_, best_unused, best_score)) => best_unused > unused || best_score > score,
        };
        if better {
            best = Some((candidate, unused, score));
        }
        if matches!(best, Some((_, 0, 0))) {
            break;
        }
    }

    match best {
        Some((method, _, _)) => Ok(method),
        None => {
            let mut message = "Unable to determine callable overload.  Candidates are:".to_string();
            for candidate in overloads {
                message.push_str("\n    ");
                message.push_str(&candidate.signature());
            }
            Err(Rejection::invalid(message))
        }
    }
}
