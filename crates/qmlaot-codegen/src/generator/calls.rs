//! Method calls.
//!
//! Calls on objects and on the QML context go through call lookups taking
//! an argument vector of pointers plus a parallel vector of meta types.
//! Slot 0 of both receives the return value. Well known library calls on
//! script objects are inlined instead.

use qmlaot_scope::Method;

use super::Generator;
use crate::error::Rejection;
use crate::intrinsics::{
    inline_console, inline_list_method, inline_math, inline_string_arg, inline_translation,
    is_translation_function, math_expression, Argument, Inlined,
};
use crate::overload::resolve_overload;
use crate::register::{ContentVariant, RegisterContent};

impl<'a> Generator<'a> {
    /// Declarations for the `args` and `types` vectors of a call. Returns
    /// the code and whether the call result lands in `callResult`.
    fn arguments_list(
        &mut self,
        argc: u32,
        argv: u32,
        method: Option<&Method>,
    ) -> Result<(String, bool), Rejection> {
        let r = self.resolver;
        let b = r.builtins();
        let mut code = String::new();
        let mut args = Vec::with_capacity(argc as usize + 1);
        let mut types = Vec::with_capacity(argc as usize + 1);

        let result = self
            .state
            .accumulator_out
            .clone()
            .filter(|out| !r.register_contains(out, b.void))
            .filter(|_| !self.state.accumulator_variable_out.is_empty());
        let has_result = result.is_some();
        match result {
            Some(out) => {
                code += r.internal_name(out.stored);
                code += if r.is_reference(out.stored) { " *" } else { " " };
                code += "callResult;\n";
                args.push("&callResult".to_string());
                types.push(self.meta_type_from_type(out.stored));
            }
            None => {
                args.push("nullptr".to_string());
                types.push("QMetaType()".to_string());
            }
        }

        for i in 0..argc {
            let register = argv + i;
            let content = self.register_type(register)?;
            let variable = self.register_variable(register);
            let read = self.use_var(&variable);
            let parameter = method
                .and_then(|method| method.parameters.get(i as usize))
                .and_then(|parameter| parameter.ty)
                .map(|ty| r.global_type(ty));

            match parameter {
                Some(parameter)
                    if parameter.stored != content.stored
                        && parameter.stored != b.var
                        && parameter.stored != b.js_primitive =>
                {
                    let name = format!("arg{}", i);
                    let converted = self.conversion(&content, &parameter, &read)?;
                    code += &format!(
                        "{} {} = {};\n",
                        r.augmented_internal_name(parameter.stored),
                        name,
                        converted
                    );
                    args.push(format!("&{}", name));
                    types.push(self.meta_type_from_type(parameter.stored));
                }
                _ if content.stored == b.js_primitive => {
                    let name = format!("arg{}", i);
                    code += &format!(
                        "QVariant {} = {};\n",
                        name,
                        self.convert(b.js_primitive, b.var, &read)
                    );
                    args.push(format!("{}.data()", name));
                    types.push(format!("{}.metaType()", name));
                }
                _ if content.stored == b.var => {
                    args.push(format!("{}.data()", read));
                    types.push(format!("{}.metaType()", read));
                }
                _ => {
                    args.push(format!("&{}", read));
                    types.push(self.meta_type_from_type(content.stored));
                }
            }
        }

        code += &format!(
            "void *args[] = {{ {} }};\nconst QMetaType types[] = {{ {} }};\n",
            args.join(", "),
            types.join(", ")
        );
        Ok((code, has_result))
    }

    /// Move the call result into the accumulator, in a section of its own
    /// so that an unused result drops only the move.
    fn generate_move_out_var(&mut self, has_result: bool) {
        if !has_result {
            return;
        }
        self.next_section();
        let variable = self.state.accumulator_variable_out.clone();
        self.body += format!("{} = std::move(callResult);\n", variable);
        self.body.set_write_register(variable);
        self.next_section();
    }

    /// The overload a call of `overloads` with the arguments in
    /// `argv..argv + argc` dispatches to.
    fn call_target(
        &self,
        overloads: &[Method],
        argc: u32,
        argv: u32,
    ) -> Result<Option<Method>, Rejection> {
        if overloads.is_empty() {
            return Ok(None);
        }
        let arguments = (0..argc)
            .map(|i| self.register_type(argv + i))
            .collect::<Result<Vec<RegisterContent>, Rejection>>()?;
        resolve_overload(&self.resolver, overloads, &arguments).map(|method| Some(method.clone()))
    }

    fn reject_untyped_call(&self) -> Result<(), Rejection> {
        match &self.state.accumulator_out {
            Some(out) if out.variant == ContentVariant::JavaScriptReturnValue => {
                Err(Rejection::unsupported("call to untyped JavaScript function"))
            }
            _ => Ok(()),
        }
    }

    fn inline_arguments(&mut self, argc: u32, argv: u32) -> Result<Vec<Argument>, Rejection> {
        let mut arguments = Vec::with_capacity(argc as usize);
        for i in 0..argc {
            let stored = self.register_type(argv + i)?.stored;
            let variable = self.register_variable(argv + i);
            let expression = self.use_var(&variable);
            arguments.push(Argument { stored, expression });
        }
        Ok(arguments)
    }

    fn emit_inlined(&mut self, inlined: Inlined) {
        for include in inlined.includes {
            self.add_include(include);
        }
        self.body += inlined.code;
    }

    pub(super) fn generate_call_property_lookup(
        &mut self,
        index: u32,
        base: u32,
        argc: u32,
        argv: u32,
    ) -> Result<(), Rejection> {
        self.reject_untyped_call()?;
        let base_type = self.register_type(base)?;
        let name = self.lookup_name(index)?;
        let r = self.resolver;
        let b = r.builtins();

        if !r.is_reference(base_type.stored) {
            let contained = r.contained_type(&base_type);
            let out_stored = self.state.accumulator_out.as_ref().map_or(b.void, |out| out.stored);
            let out_variable = self.state.accumulator_variable_out.clone();
            let arguments = self.inline_arguments(argc, argv)?;

            if contained == b.math {
                if out_variable.is_empty() && math_expression(name, arguments.len()).is_some() {
                    return Ok(());
                }
                if let Some(inlined) = inline_math(&r, name, &arguments, out_stored, &out_variable) {
                    self.emit_inlined(inlined);
                    return Ok(());
                }
            } else if contained == b.console {
                if let Some(inlined) = inline_console(&r, name, &arguments) {
                    self.body.set_has_side_effects(true);
                    self.emit_inlined(inlined);
                    if !out_variable.is_empty() {
                        let undefined = self.convert(b.void, out_stored, "");
                        self.body += format!("{} = {};\n", out_variable, undefined);
                    }
                    return Ok(());
                }
            } else if contained == b.string && name == "arg" && arguments.len() == 1 {
                if out_variable.is_empty() {
                    return Ok(());
                }
                let variable = self.register_variable(base);
                let expression = self.use_var(&variable);
                let receiver = Argument {
                    stored: base_type.stored,
                    expression,
                };
                if let Some(inlined) =
                    inline_string_arg(&r, &receiver, &arguments[0], out_stored, &out_variable)
                {
                    self.emit_inlined(inlined);
                    return Ok(());
                }
            } else if base_type.stored == b.list_property || base_type.stored == b.string_list {
                let variable = self.register_variable(base);
                let expression = self.use_var(&variable);
                let receiver = Argument {
                    stored: base_type.stored,
                    expression,
                };
                let element = r.value_type(&base_type).stored;
                let out = (!out_variable.is_empty()).then_some((out_stored, out_variable.as_str()));
                if let Some(inlined) = inline_list_method(&r, &receiver, element, name, &arguments, out) {
                    if name == "push" {
                        self.body.set_has_side_effects(true);
                    }
                    self.emit_inlined(inlined);
                    return Ok(());
                }
            }
            return Err(Rejection::unsupported(format!(
                "call to property '{}' of {}",
                name,
                r.descriptive_name(&base_type)
            )));
        }

        let method = match r.member_type(&base_type, name) {
            Some(member) => self.call_target(member.method_overloads(), argc, argv)?,
            None => None,
        };

        self.body.set_write_register("");
        self.body.set_has_side_effects(true);
        self.body += "{\n";
        let (arguments, has_result) = self.arguments_list(argc, argv, method.as_ref())?;
        self.body += arguments;
        let variable = self.register_variable(base);
        let object = self.use_var(&variable);
        let lookup = format!(
            "aotContext->callObjectPropertyLookup({}, {}, args, types, {})",
            index, object, argc
        );
        let initialization = format!("aotContext->initCallObjectPropertyLookup({})", index);
        self.generate_lookup(&lookup, &initialization, "");
        self.generate_move_out_var(has_result);
        self.body.set_has_side_effects(true);
        self.body += "}\n";
        Ok(())
    }

    pub(super) fn generate_call_qml_context_property_lookup(
        &mut self,
        index: u32,
        argc: u32,
        argv: u32,
    ) -> Result<(), Rejection> {
        self.reject_untyped_call()?;
        let name = self.lookup_name(index)?;
        let r = self.resolver;

        let member = r.scoped_type(self.function.qml_scope, name);
        if member.is_none() && is_translation_function(name) {
            return self.generate_translation(name, argc, argv);
        }
        let method = match member {
            Some(member) => self.call_target(member.method_overloads(), argc, argv)?,
            None => None,
        };

        self.body.set_write_register("");
        self.body.set_has_side_effects(true);
        self.body += "{\n";
        let (arguments, has_result) = self.arguments_list(argc, argv, method.as_ref())?;
        self.body += arguments;
        let lookup = format!(
            "aotContext->callQmlContextPropertyLookup({}, args, types, {})",
            index, argc
        );
        let initialization = format!("aotContext->initCallQmlContextPropertyLookup({})", index);
        self.generate_lookup(&lookup, &initialization, "");
        self.generate_move_out_var(has_result);
        self.body.set_has_side_effects(true);
        self.body += "}\n";
        Ok(())
    }

    /// Translation functions that no member of the QML scope shadows.
    fn generate_translation(&mut self, name: &str, argc: u32, argv: u32) -> Result<(), Rejection> {
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let out_stored = self
            .state
            .accumulator_out
            .as_ref()
            .map_or(self.resolver.builtins().void, |out| out.stored);
        let arguments = self.inline_arguments(argc, argv)?;
        let r = self.resolver;
        match inline_translation(&r, name, &arguments, out_stored, &out_variable) {
            Some(inlined) => {
                self.emit_inlined(inlined);
                Ok(())
            }
            None => Err(Rejection::unsupported(format!("{}() with {} arguments", name, argc))),
        }
    }
}
