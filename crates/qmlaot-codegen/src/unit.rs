//! Compilation units
//!
//! Compiles every function of a resolved unit and wraps the ones that
//! succeed into a single native source file: the includes they need, the
//! call wrapper and the `aotBuiltFunctions` table the engine looks compiled
//! functions up in. Rejected functions are left out of the table and keep
//! running in the interpreter.

use std::collections::BTreeSet;
use std::fmt::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::annotation::ResolvedUnit;
use crate::error::RejectedFunction;
use crate::generator::{generate_function, AotFunction, GeneratorOptions};
use crate::resolver::TypeResolver;

const WRAP_CALL: &str = "
template <typename Binding>
void wrapCall(const QQmlPrivate::AOTCompiledContext *aotContext, void *dataPtr, void **argumentsPtr, Binding &&binding)
{
    using return_type = std::invoke_result_t<Binding, const QQmlPrivate::AOTCompiledContext *, void **>;
    if constexpr (std::is_same_v<return_type, void>) {
       Q_UNUSED(dataPtr)
       binding(aotContext, argumentsPtr);
    } else {
        if (dataPtr) {
           new (dataPtr) return_type(binding(aotContext, argumentsPtr));
        } else {
           binding(aotContext, argumentsPtr);
        }
    }
}
";

const FUNCTION_HEADER: &str = "
    [](const QQmlPrivate::AOTCompiledContext *aotContext, void *dataPtr, void **argumentsPtr) {
        wrapCall(aotContext, dataPtr, argumentsPtr, [](const QQmlPrivate::AOTCompiledContext *aotContext, void **argumentsPtr) {
Q_UNUSED(aotContext)
Q_UNUSED(argumentsPtr)
";

/// A function that compiled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledFunction {
    /// Index of the function in the unit
    pub index: usize,
    /// Function name
    pub name: String,
    /// The generated code
    #[serde(flatten)]
    pub function: AotFunction,
}

/// Outcome of compiling all functions of a unit.
#[derive(Debug, Clone, Default)]
pub struct UnitOutput {
    /// Functions that compiled, by index
    pub compiled: Vec<CompiledFunction>,
    /// Functions that were rejected
    pub rejected: Vec<RejectedFunction>,
}

impl UnitOutput {
    /// Whether every function compiled.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Compile every function of `unit`.
pub fn compile_unit(resolver: TypeResolver<'_>, unit: &ResolvedUnit, options: GeneratorOptions) -> UnitOutput {
    let mut output = UnitOutput::default();
    for resolved in &unit.functions {
        match generate_function(resolver, &unit.tables, resolved, options) {
            Ok(function) => output.compiled.push(CompiledFunction {
                index: resolved.function.index,
                name: resolved.function.name.clone(),
                function,
            }),
            Err(rejected) => {
                warn!(function = %rejected.function, offset = rejected.offset, "{}", rejected.rejection);
                output.rejected.push(rejected);
            }
        }
    }
    output.compiled.sort_by_key(|compiled| compiled.index);
    info!(
        compiled = output.compiled.len(),
        rejected = output.rejected.len(),
        "compiled unit"
    );
    output
}

/// Namespace the unit's table lives in, derived from its file name.
pub fn symbol_namespace(file_name: &str) -> String {
    let mut symbol = String::with_capacity(file_name.len() + 1);
    symbol.push('_');
    symbol.extend(
        file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }),
    );
    symbol
}

/// Native source text for the compiled functions of the unit read from
/// `file_name`.
pub fn emit_compilation_unit(file_name: &str, functions: &[CompiledFunction]) -> String {
    let includes: BTreeSet<&str> = functions
        .iter()
        .flat_map(|compiled| compiled.function.includes.iter().map(String::as_str))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "// {}", file_name);
    out.push_str("#include <QtQml/qqmlprivate.h>\n");
    for include in &includes {
        let _ = writeln!(out, "#include <{}>", include);
    }
    out.push('\n');
    out.push_str("namespace QmlCacheGeneratedCode {\n");
    let _ = writeln!(out, "namespace {} {{", symbol_namespace(file_name));
    out.push_str(WRAP_CALL);
    out.push('\n');
    out.push_str("extern const QQmlPrivate::AOTCompiledFunction aotBuiltFunctions[];\n");
    out.push_str("extern const QQmlPrivate::AOTCompiledFunction aotBuiltFunctions[] = {\n");

    for compiled in functions {
        let function = &compiled.function;
        let arguments = if function.argument_types.is_empty() {
            "{}".to_string()
        } else {
            let types = function
                .argument_types
                .iter()
                .map(|ty| format!("QMetaType::fromType<{}>()", ty))
                .collect::<Vec<_>>();
            format!("{{ {} }}", types.join(", "))
        };
        let _ = write!(
            out,
            "{{ {}, QMetaType::fromType<{}>(), {}, {}{}}});}}\n }},\n",
            compiled.index, function.return_type, arguments, FUNCTION_HEADER, function.code
        );
    }

    out.push_str("{ 0, QMetaType::fromType<void>(), {}, nullptr }");
    out.push_str("};\n");
    out.push_str("}\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(index: usize, includes: &[&str]) -> CompiledFunction {
        CompiledFunction {
            index,
            name: format!("f{}", index),
            function: AotFunction {
                code: "return 1;\n".into(),
                includes: includes.iter().map(|include| include.to_string()).collect(),
                argument_types: vec!["int".into()],
                return_type: "int".into(),
            },
        }
    }

    #[test]
    fn test_symbol_namespace() {
        assert_eq!(symbol_namespace("qml/Main.qml"), "_qml_Main_qml");
    }

    #[test]
    fn test_includes_are_sorted_and_unique() {
        let text = emit_compilation_unit(
            "Main.qml",
            &[compiled(0, &["qrandom.h", "cmath"]), compiled(1, &["cmath"])],
        );
        let cmath = text.find("#include <cmath>").unwrap();
        let random = text.find("#include <qrandom.h>").unwrap();
        assert!(cmath < random);
        assert_eq!(text.matches("#include <cmath>").count(), 1);
        assert!(text.starts_with("// Main.qml\n#include <QtQml/qqmlprivate.h>\n"));
    }

    #[test]
    fn test_table_ends_with_null_entry() {
        let text = emit_compilation_unit("Main.qml", &[compiled(3, &[])]);
        assert!(text.contains("namespace QmlCacheGeneratedCode {\nnamespace _Main_qml {\n"));
        assert!(text.contains("{ 3, QMetaType::fromType<int>(), { QMetaType::fromType<int>() }, \n"));
        assert!(text.contains("return 1;\n});}\n },\n"));
        assert!(text.ends_with("{ 0, QMetaType::fromType<void>(), {}, nullptr }};\n}\n}\n"));
    }

    #[test]
    fn test_empty_unit_still_has_table() {
        let text = emit_compilation_unit("Empty.qml", &[]);
        assert!(text.contains("aotBuiltFunctions[] = {\n{ 0, QMetaType::fromType<void>(), {}, nullptr }};"));
    }
}
