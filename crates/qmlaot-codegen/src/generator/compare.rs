//! Control flow, comparisons and arithmetic.

use qmlaot_scope::ScopeId;

use super::Generator;
use crate::error::Rejection;
use crate::section::JumpMode;

impl<'a> Generator<'a> {
    // ===== Control flow =====

    pub(super) fn generate_jump(&mut self, offset: i32) -> Result<(), Rejection> {
        self.generate_jump_code_with_type_conversions(offset, JumpMode::Unconditional)?;
        self.body += ";\n";
        self.skip_until_next_label = true;
        Ok(())
    }

    pub(super) fn generate_conditional_jump(&mut self, offset: i32, negate: bool) -> Result<(), Rejection> {
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let boolean = self.resolver.global_type(self.resolver.builtins().bool);
        let condition = self.conversion(&input, &boolean, &read)?;
        self.body.set_has_side_effects(true);
        self.body += format!("if ({}{}) ", if negate { "!" } else { "" }, condition);
        self.generate_jump_code_with_type_conversions(offset, JumpMode::Conditional)
    }

    pub(super) fn generate_jump_no_exception(&mut self, offset: i32) -> Result<(), Rejection> {
        self.body.set_has_side_effects(true);
        self.body += "if (!aotContext->engine->hasError()) ";
        self.generate_jump_code_with_type_conversions(offset, JumpMode::Conditional)
    }

    pub(super) fn generate_check_exception(&mut self) -> Result<(), Rejection> {
        self.body.set_has_side_effects(true);
        self.generate_exception_check();
        Ok(())
    }

    pub(super) fn generate_throw_exception(&mut self) -> Result<(), Rejection> {
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let js_value = self.resolver.global_type(self.resolver.builtins().js_value);
        let error = self.conversion(&input, &js_value, &read)?;
        let statement = self.return_statement();
        self.body.set_has_side_effects(true);
        self.body += format!("aotContext->engine->throwError({});\n", error);
        self.body += statement;
        self.skip_until_next_label = true;
        Ok(())
    }

    pub(super) fn generate_create_call_context(&mut self) -> Result<(), Rejection> {
        self.body.set_has_side_effects(true);
        self.body += "{\n";
        Ok(())
    }

    pub(super) fn generate_pop_context(&mut self) -> Result<(), Rejection> {
        self.body.set_has_side_effects(true);
        // Closes the block opened by CreateCallContext.
        self.body += ";}\n";
        Ok(())
    }

    // ===== Comparisons =====

    /// Assign the boolean expression `value` to the accumulator.
    fn assign_bool(&mut self, value: &str) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let boolean = self.resolver.builtins().bool;
        let converted = self.convert(boolean, out.stored, value);
        let variable = &self.state.accumulator_variable_out;
        self.body += format!("{} = {};\n", variable, converted);
        Ok(())
    }

    pub(super) fn generate_compare_null(&mut self, invert: bool) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let r = self.resolver;
        let b = r.builtins();

        let value = if r.is_reference(input.stored) {
            format!("({} {} nullptr)", read, if invert { "!=" } else { "==" })
        } else if input.stored == b.null {
            (!invert).to_string()
        } else {
            let primitive = self.conversion(&input, &r.global_type(b.js_primitive), &read)?;
            format!(
                "{}QJSPrimitiveValue(QJSPrimitiveNull()).equals({})",
                if invert { "!" } else { "" },
                primitive
            )
        };
        self.assign_bool(&value)
    }

    /// `lhs == accumulator` for an integer constant `lhs`.
    fn eq_int_expression(&mut self, lhs: i32) -> Result<String, Rejection> {
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let r = self.resolver;
        let b = r.builtins();
        if input.stored == b.int {
            return Ok(format!("{} == {}", lhs, read));
        }
        if input.stored == b.bool {
            return Ok(format!("{} == int({})", lhs, read));
        }
        if r.is_numeric(input.stored) {
            return Ok(format!(
                "{} == {}",
                self.convert(b.int, b.real, &lhs.to_string()),
                self.convert(input.stored, b.real, &read)
            ));
        }
        let primitive = self.conversion(&input, &r.global_type(b.js_primitive), &read)?;
        Ok(format!("QJSPrimitiveValue({}).equals({})", lhs, primitive))
    }

    pub(super) fn generate_compare_int(&mut self, lhs: i32, invert: bool) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let expression = self.eq_int_expression(lhs)?;
        if invert {
            self.assign_bool(&format!("!({})", expression))
        } else {
            self.assign_bool(&expression)
        }
    }

    pub(super) fn generate_equality_operation(
        &mut self,
        lhs: u32,
        function: &str,
        invert: bool,
    ) -> Result<(), Rejection> {
        let left = self.register_type(lhs)?;
        let right = self.accumulator_in()?;
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let r = self.resolver;
        let b = r.builtins();
        let left_type = r.contained_type(&left);
        let right_type = r.contained_type(&right);

        let left_variable = self.register_variable(lhs);
        let left_read = self.use_var(&left_variable);
        let right_variable = self.state.accumulator_variable_in.clone();
        let right_read = self.use_var(&right_variable);

        let both = |test: &dyn Fn(ScopeId) -> bool| test(left_type) && test(right_type);
        let operator = if invert { "!=" } else { "==" };

        let value = if both(&|ty| r.is_numeric(ty)) {
            format!(
                "{} {} {}",
                self.convert(left.stored, b.real, &left_read),
                operator,
                self.convert(right.stored, b.real, &right_read)
            )
        } else if both(&|ty| ty == b.bool) {
            format!(
                "{} {} {}",
                self.convert(left.stored, b.bool, &left_read),
                operator,
                self.convert(right.stored, b.bool, &right_read)
            )
        } else if both(&|ty| r.is_reference(ty) || ty == b.null)
            && r.is_reference(left.stored)
            && r.is_reference(right.stored)
        {
            format!(
                "static_cast<QObject *>({}) {} static_cast<QObject *>({})",
                left_read, operator, right_read
            )
        } else if both(&|ty| r.is_primitive(ty)) {
            format!(
                "{}{}.{}({})",
                if invert { "!" } else { "" },
                self.convert(left.stored, b.js_primitive, &left_read),
                function,
                self.convert(right.stored, b.js_primitive, &right_read)
            )
        } else {
            return Err(Rejection::unsupported("equality comparison on non-primitive types"));
        };
        self.assign_bool(&value)
    }

    pub(super) fn generate_compare_operation(&mut self, lhs: u32, operator: &str) -> Result<(), Rejection> {
        let left = self.register_type(lhs)?;
        let right = self.accumulator_in()?;
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let r = self.resolver;
        let b = r.builtins();
        let compare_type = if r.is_numeric(left.stored) && r.is_numeric(right.stored) {
            r.stored_type(r.merge(left.stored, right.stored))
        } else {
            b.js_primitive
        };

        let left_variable = self.register_variable(lhs);
        let left_read = self.use_var(&left_variable);
        let right_variable = self.state.accumulator_variable_in.clone();
        let right_read = self.use_var(&right_variable);
        let value = format!(
            "{} {} {}",
            self.convert(left.stored, compare_type, &left_read),
            operator,
            self.convert(right.stored, compare_type, &right_read)
        );
        self.assign_bool(&value)
    }

    pub(super) fn generate_as(&mut self, lhs: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let variable = self.state.accumulator_variable_out.clone();
        if variable.is_empty() {
            return Ok(());
        }
        let r = self.resolver;
        let b = r.builtins();
        let target = r.contained_type(&out);
        if !r.is_reference(target) {
            return Err(Rejection::unsupported(format!(
                "type assertion to non-object type {}",
                r.internal_name(target)
            )));
        }

        let input = self.register_variable(lhs);
        let input = self.use_var(&input);
        let type_variable = self.state.accumulator_variable_in.clone();
        let in_stored = self.accumulator_in()?.stored;
        let cast = if in_stored == b.meta_object && r.arena()[target].is_composite {
            let meta = self.use_var(&type_variable);
            format!("{}->cast({})", meta, input)
        } else {
            format!("({})->cast({})", self.meta_object(target)?, input)
        };
        let value = self.convert(b.object, out.stored, &cast);
        self.body += format!("{} = {};\n", variable, value);
        Ok(())
    }

    // ===== Arithmetic =====

    pub(super) fn generate_unot(&mut self) -> Result<(), Rejection> {
        if self.state.accumulator_variable_out.is_empty() {
            return Ok(());
        }
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let boolean = self.resolver.global_type(self.resolver.builtins().bool);
        let condition = self.conversion(&input, &boolean, &read)?;
        self.assign_bool(&format!("!{}", condition))
    }

    pub(super) fn generate_unary_sign(&mut self, sign: &str) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let r = self.resolver;
        let value = if r.is_numeric(out.stored) {
            // Sign after widening keeps -0 and INT_MIN intact.
            let operand = self.conversion(&input, &out, &read)?;
            if operand.contains(' ') {
                format!("{}({})", sign, operand)
            } else {
                format!("{}{}", sign, operand)
            }
        } else {
            let number = if r.is_numeric(input.stored) {
                input.stored
            } else {
                r.builtins().real
            };
            let operand = self.convert(input.stored, number, &read);
            self.convert(number, out.stored, &format!("{}{}", sign, operand))
        };
        self.body += format!("{} = {};\n", out_variable, value);
        Ok(())
    }

    pub(super) fn generate_step(&mut self, operator: &str) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let input = self.accumulator_in()?;
        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        let value = self.conversion(&input, &out, &read)?;
        self.body += format!("{} = {};\n", out_variable, value);
        self.body.add_read_register(&out_variable);
        self.body += format!("{}{};\n", operator, out_variable);
        Ok(())
    }

    pub(super) fn generate_arithmetic_operation(&mut self, lhs: u32, operator: &str) -> Result<(), Rejection> {
        let left = self.register_type(lhs)?;
        let right = self.accumulator_in()?;
        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let r = self.resolver;
        if out.stored == r.builtins().var {
            return Err(Rejection::unsupported(format!(
                "arithmetic operation \"{}\" on QVariant",
                operator
            )));
        }

        let left_variable = self.register_variable(lhs);
        let left_read = self.use_var(&left_variable);
        let right_variable = self.state.accumulator_variable_in.clone();
        let right_read = self.use_var(&right_variable);
        let value = format!(
            "{} {} {}",
            self.convert(left.stored, out.stored, &left_read),
            operator,
            self.convert(right.stored, out.stored, &right_read)
        );
        self.body += format!("{} = {};\n", out_variable, value);
        Ok(())
    }

    pub(super) fn generate_mod(&mut self, lhs: u32) -> Result<(), Rejection> {
        let left = self.register_type(lhs)?;
        let right = self.accumulator_in()?;
        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let primitive = self.resolver.builtins().js_primitive;

        let left_variable = self.register_variable(lhs);
        let left_read = self.use_var(&left_variable);
        let right_variable = self.state.accumulator_variable_in.clone();
        let right_read = self.use_var(&right_variable);
        let remainder = format!(
            "({} % {})",
            self.convert(left.stored, primitive, &left_read),
            self.convert(right.stored, primitive, &right_read)
        );
        let value = self.convert(primitive, out.stored, &remainder);
        self.body += format!("{} = {};\n", out_variable, value);
        Ok(())
    }
}
