//! Returns, constants and register moves.

use qmlaot_scope::ScopeId;

use super::Generator;
use crate::error::Rejection;
use crate::instruction::Constant;
use crate::literal::{numeric_literal, string_literal};
use crate::register::is_argument;

impl<'a> Generator<'a> {
    pub(super) fn generate_ret(&mut self) -> Result<(), Rejection> {
        self.body.set_write_register("");
        self.body.set_has_side_effects(true);

        let r = self.resolver;
        let b = r.builtins();
        match self.function.return_type {
            None => self.body += "return;\n",
            Some(ty) if ty == b.void => self.body += "return;\n",
            Some(ty) => {
                let signal_undefined = "aotContext->setReturnValueUndefined();\n";
                if !self.state.accumulator_variable_in.is_empty() {
                    let stored = self.accumulator_in()?.stored;
                    let variable = self.state.accumulator_variable_in.clone();
                    let input = self.use_var(&variable);
                    if stored == b.var {
                        self.body += format!("if (!{}.isValid())\n    {}", input, signal_undefined);
                    } else if stored == b.js_primitive {
                        self.body += format!(
                            "if ({}.type() == QJSPrimitiveValue::Undefined)\n    {}",
                            input, signal_undefined
                        );
                    } else if stored == b.js_value {
                        self.body += format!("if ({}.isUndefined())\n    {}", input, signal_undefined);
                    }
                    let value = self.convert(stored, ty, &input);
                    self.body += format!("return {};\n", value);
                } else {
                    let name = r.internal_name(ty).trim();
                    if r.is_reference(ty) || name.ends_with('*') || name.ends_with('&') {
                        return Err(Rejection::invalid("Not all paths return a value"));
                    }
                    self.body += signal_undefined;
                    self.body += format!("return {}();\n", name);
                }
            }
        }
        self.skip_until_next_label = true;
        Ok(())
    }

    /// Number `literal` of natural type `natural` as a value stored in
    /// `stored`. Numbers and booleans take the literal as is.
    fn number_as(&self, literal: &str, natural: ScopeId, stored: ScopeId) -> String {
        let r = self.resolver;
        if r.is_numeric(stored) || stored == r.builtins().bool {
            literal.to_string()
        } else {
            self.convert(natural, stored, literal)
        }
    }

    /// `null` stored in `stored`.
    fn null_expression(&self, stored: ScopeId) -> Result<String, Rejection> {
        let r = self.resolver;
        let b = r.builtins();
        if stored == b.js_primitive {
            Ok("QJSPrimitiveNull()".to_string())
        } else if stored == b.js_value {
            Ok("QJSValue(QJSValue::NullValue)".to_string())
        } else if stored == b.var {
            Ok("QVariant::fromValue<std::nullptr_t>(nullptr)".to_string())
        } else if r.is_reference(stored) || stored == b.null {
            Ok("nullptr".to_string())
        } else {
            let out = self.accumulator_out()?;
            Err(Rejection::invalid(format!(
                "Cannot load null into {}",
                r.descriptive_name(&out)
            )))
        }
    }

    pub(super) fn generate_load_const(&mut self, index: u32) -> Result<(), Rejection> {
        let constant = self
            .tables
            .constant(index)
            .ok_or_else(|| Rejection::invalid(format!("Invalid constant index {}", index)))?;
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let value = self.constant_value(constant, stored)?;
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    fn constant_value(&self, constant: Constant, stored: ScopeId) -> Result<String, Rejection> {
        let b = self.resolver.builtins();
        Ok(match constant {
            Constant::Null => self.null_expression(stored)?,
            Constant::Bool(value) if stored == b.bool => value.to_string(),
            Constant::Bool(value) => self.number_as(if value { "1" } else { "0" }, b.int, stored),
            Constant::Int(value) => self.number_as(&value.to_string(), b.int, stored),
            Constant::Number(value) => self.number_as(&numeric_literal(value), b.real, stored),
        })
    }

    pub(super) fn generate_load_int(&mut self, value: i32) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let int = self.resolver.builtins().int;
        let value = self.number_as(&value.to_string(), int, stored);
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    pub(super) fn generate_load_bool(&mut self, value: bool) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let value = self.convert(self.resolver.builtins().bool, stored, &value.to_string());
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    pub(super) fn generate_load_null(&mut self) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let value = self.null_expression(stored)?;
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    pub(super) fn generate_load_undefined(&mut self) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let primitive = self.resolver.builtins().js_primitive;
        let value = self.convert(primitive, stored, "QJSPrimitiveValue()");
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    pub(super) fn generate_move_const(&mut self, index: u32, dest: u32) -> Result<(), Rejection> {
        let constant = self
            .tables
            .constant(index)
            .ok_or_else(|| Rejection::invalid(format!("Invalid constant index {}", index)))?;
        let variable = self.register_variable(dest);
        if variable.is_empty() {
            return Ok(());
        }
        self.body.set_write_register(variable.clone());
        let stored = self.register_type(dest)?.stored;
        let value = match constant {
            Constant::Null => self.null_expression(stored).map_err(|_| {
                Rejection::invalid(format!(
                    "Cannot load null into {}",
                    self.resolver.internal_name(stored)
                ))
            })?,
            constant => self.constant_value(constant, stored)?,
        };
        self.body += format!("{} = {};\n", variable, value);
        Ok(())
    }

    pub(super) fn generate_load_reg(&mut self, reg: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let void = self.resolver.builtins().void;
        if self.resolver.register_contains(&out, void) || self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let source = self.register_type(reg)?;
        let variable = self.register_variable(reg);
        let read = self.use_var(&variable);
        let value = self.conversion(&source, &out, &read)?;
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }

    pub(super) fn generate_store_reg(&mut self, reg: u32) -> Result<(), Rejection> {
        let input = self.accumulator_in()?;
        if is_argument(reg, self.function.argument_types.len()) {
            return Err(Rejection::unsupported("writing into a function argument"));
        }
        let variable = self.register_variable(reg);
        self.body.set_write_register(variable.clone());
        if variable.is_empty() {
            return Ok(());
        }
        let target = self.register_type(reg)?;
        let accumulator = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&accumulator);
        let value = self.conversion(&input, &target, &read)?;
        self.body += format!("{} = {};\n", variable, value);
        Ok(())
    }

    pub(super) fn generate_move_reg(&mut self, src: u32, dest: u32) -> Result<(), Rejection> {
        let destination = self.register_variable(dest);
        self.body.set_write_register(destination.clone());
        if destination.is_empty() {
            return Ok(());
        }
        let source_type = self.register_type(src)?;
        let target_type = self.register_type(dest)?;
        let source = self.register_variable(src);
        let read = self.use_var(&source);
        let value = self.conversion(&source_type, &target_type, &read)?;
        self.body += format!("{} = {};\n", destination, value);
        Ok(())
    }

    pub(super) fn generate_load_runtime_string(&mut self, string: u32) -> Result<(), Rejection> {
        let text = self.string(string)?;
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let stored = self.accumulator_out()?.stored;
        let value = self.convert(self.resolver.builtins().string, stored, &string_literal(text));
        let out = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", out, value);
        Ok(())
    }
}
