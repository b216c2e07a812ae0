//! Bytecode to native code lowering
//!
//! Walks one function's instruction stream together with its register
//! annotations and produces the body of a native function. Every register
//! gets one native variable per stored type it is observed with; jumps
//! convert registers into the variables the jump target expects.
//!
//! Instruction handlers live in submodules grouped by what they do. Any
//! construct without a lowering rejects the whole function.

mod calls;
mod compare;
mod guard;
mod loads;
mod lookups;

use std::collections::{BTreeMap, BTreeSet};

use qmlaot_scope::{AccessSemantics, ScopeId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::annotation::{Annotations, InstructionAnnotation, ResolvedFunction};
use crate::conversion::{convert_contained, convert_stored};
use crate::dse::eliminate_dead_stores;
use crate::error::{RejectedFunction, Rejection};
use crate::instruction::{Function, Instruction, Op, UnitTables};
use crate::register::{is_argument, RegisterContent, ACCUMULATOR, FIRST_ARGUMENT};
use crate::resolver::TypeResolver;
use crate::section::{JumpMode, Section};

/// Knobs for the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratorOptions {
    /// Prefix every instruction with a comment naming it
    pub trace_comments: bool,
    /// Emit the source lines an instruction belongs to as comments
    pub source_comments: bool,
    /// Comment out stores nothing reads and drop unused declarations
    pub eliminate_dead_stores: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            trace_comments: false,
            source_comments: true,
            eliminate_dead_stores: true,
        }
    }
}

/// A successfully compiled function.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AotFunction {
    /// Function body, including variable declarations
    pub code: String,
    /// Headers the body needs
    pub includes: Vec<String>,
    /// Native argument type names
    pub argument_types: Vec<String>,
    /// Native return type name
    pub return_type: String,
}

/// Accumulator state around the current instruction.
#[derive(Debug, Default)]
struct State<'a> {
    annotation: Option<&'a InstructionAnnotation>,
    accumulator_in: Option<RegisterContent>,
    accumulator_out: Option<RegisterContent>,
    accumulator_variable_in: String,
    accumulator_variable_out: String,
}

/// Native code generator for one function.
pub struct Generator<'a> {
    /// Type queries
    resolver: TypeResolver<'a>,
    /// String, lookup and constant tables of the compilation unit
    tables: &'a UnitTables,
    /// The function being compiled
    function: &'a Function,
    /// Register contents per instruction offset
    annotations: &'a Annotations,
    /// Output options
    options: GeneratorOptions,
    /// Register index → (stored type, variable name)
    register_variables: BTreeMap<u32, Vec<(ScopeId, String)>>,
    /// Jump target offset → label
    labels: BTreeMap<usize, String>,
    /// Finished sections
    sections: Vec<Section>,
    /// Section being generated
    body: Section,
    /// Headers requested by inlined code
    includes: BTreeSet<String>,
    /// Set after an unconditional jump or return
    skip_until_next_label: bool,
    /// Last source line emitted as a comment
    last_line: Option<u32>,
    /// Index of the current instruction
    position: usize,
    /// Accumulator state of the current instruction
    state: State<'a>,
}

impl<'a> Generator<'a> {
    /// Create a generator for `function`.
    pub fn new(
        resolver: TypeResolver<'a>,
        tables: &'a UnitTables,
        function: &'a Function,
        annotations: &'a Annotations,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            resolver,
            tables,
            function,
            annotations,
            options,
            register_variables: BTreeMap::new(),
            labels: BTreeMap::new(),
            sections: Vec::new(),
            body: Section::default(),
            includes: BTreeSet::new(),
            skip_until_next_label: false,
            last_line: None,
            position: 0,
            state: State::default(),
        }
    }

    /// Generate the function.
    pub fn run(mut self) -> Result<AotFunction, RejectedFunction> {
        let function = self.function;
        debug!(function = %function.name, instructions = function.instructions.len(), "generating");

        self.define_register_variables();
        self.define_labels();

        for (position, instruction) in function.instructions.iter().enumerate() {
            if let Err(rejection) = self.generate_instruction(position, instruction) {
                debug!(function = %function.name, offset = instruction.offset, %rejection, "rejected");
                return Err(RejectedFunction {
                    function: function.name.clone(),
                    offset: instruction.offset,
                    line: function.line_for_offset(instruction.offset),
                    rejection,
                });
            }
        }
        self.next_section();

        let variables: Vec<String> = self
            .register_variables
            .values()
            .flat_map(|types| types.iter().map(|(_, variable)| variable.clone()))
            .collect();
        let used = if self.options.eliminate_dead_stores {
            Some(eliminate_dead_stores(&mut self.sections, &variables))
        } else {
            None
        };

        let r = self.resolver;
        let mut code = String::new();
        for types in self.register_variables.values() {
            for (stored, variable) in types {
                if used.as_ref().is_some_and(|used| !used.contains(variable)) {
                    continue;
                }
                code.push_str(r.internal_name(*stored));
                code.push_str(if r.is_reference(*stored) { " *" } else { " " });
                code.push_str(variable);
                code.push_str(";\n");
            }
        }
        code.push_str(&crate::section::join(&self.sections));

        let argument_types = function
            .argument_types
            .iter()
            .map(|ty| r.augmented_internal_name(*ty))
            .collect();
        let return_type = match function.return_type {
            Some(ty) if r.is_reference(ty) => format!("{}*", r.internal_name(ty)),
            Some(ty) => r.internal_name(ty).to_string(),
            None => "void".to_string(),
        };

        debug!(function = %function.name, sections = self.sections.len(), "generated");
        Ok(AotFunction {
            code,
            includes: self.includes.into_iter().collect(),
            argument_types,
            return_type,
        })
    }

    /// Declare one variable per register and stored type seen anywhere in
    /// the function. Registers holding only `undefined` get none.
    fn define_register_variables(&mut self) {
        let void = self.resolver.builtins().void;
        let argument_count = self.function.argument_types.len();
        let mut names: FxHashSet<String> = FxHashSet::default();

        let mut define = |variables: &mut BTreeMap<u32, Vec<(ScopeId, String)>>,
                          index: u32,
                          stored: ScopeId| {
            if stored == void || is_argument(index, argument_count) {
                return;
            }
            let types = variables.entry(index).or_default();
            if types.iter().any(|(ty, _)| *ty == stored) {
                return;
            }
            let mut name = format!("r{}", index);
            if names.contains(&name) {
                name = format!("{}_{}", name, types.len());
            }
            names.insert(name.clone());
            types.push((stored, name));
        };

        let annotations = self.annotations;
        for annotation in annotations.values() {
            for (index, content) in &annotation.registers {
                define(&mut self.register_variables, *index, content.stored);
            }
            if let Some((index, content)) = &annotation.changed_register {
                define(&mut self.register_variables, *index, content.stored);
            }
            for (index, content) in &annotation.expected_target_types_before_jump {
                define(&mut self.register_variables, *index, content.stored);
            }
        }
    }

    /// Name every jump target up front so backward jumps find their label.
    fn define_labels(&mut self) {
        for (position, instruction) in self.function.instructions.iter().enumerate() {
            let Some(offset) = instruction.op.jump_offset().filter(|offset| *offset != 0) else {
                continue;
            };
            let Some(target) = self.jump_target(position, offset) else {
                continue;
            };
            let count = self.labels.len();
            self.labels
                .entry(target)
                .or_insert_with(|| format!("label_{}", count));
        }
    }

    fn jump_target(&self, position: usize, relative: i32) -> Option<usize> {
        let next = self.function.next_offset(position) as i64;
        usize::try_from(next + i64::from(relative)).ok()
    }

    fn generate_instruction(&mut self, position: usize, instruction: &Instruction) -> Result<(), Rejection> {
        if !self.start_instruction(position, instruction) {
            trace!(offset = instruction.offset, op = instruction.op.name(), "skipped");
            return Ok(());
        }
        self.generate_op(&instruction.op)?;
        self.end_instruction()
    }

    /// Set up state for the instruction at `position`. Returns `false` if
    /// the instruction is unreachable and should be skipped.
    fn start_instruction(&mut self, position: usize, instruction: &Instruction) -> bool {
        self.position = position;
        let annotation = self.annotations.get(&instruction.offset);
        let accumulator_in = annotation.and_then(|a| a.accumulator_in()).cloned();
        let accumulator_out = annotation.and_then(|a| a.accumulator_out()).cloned();
        let accumulator_variable_in = accumulator_in
            .as_ref()
            .and_then(|content| self.variable_for(ACCUMULATOR, content.stored))
            .unwrap_or_default();
        let accumulator_variable_out = accumulator_out
            .as_ref()
            .and_then(|content| self.variable_for(ACCUMULATOR, content.stored))
            .unwrap_or_default();
        self.state = State {
            annotation,
            accumulator_in,
            accumulator_out,
            accumulator_variable_in,
            accumulator_variable_out,
        };

        if let Some(label) = self.labels.get(&instruction.offset).cloned() {
            self.next_section();
            self.body.set_has_side_effects(true);
            self.body += format!("{}:;\n", label);
            self.body.set_label(label);
            self.skip_until_next_label = false;
        } else if self.skip_until_next_label && !instruction.op.manipulates_context() {
            return false;
        }

        self.next_section();
        if !self.state.accumulator_variable_out.is_empty() {
            let variable = self.state.accumulator_variable_out.clone();
            self.body.set_write_register(variable);
        }

        if self.options.source_comments {
            self.generate_source_comments(instruction.offset);
        }
        if self.options.trace_comments {
            self.body += format!("// {}: {}\n", instruction.offset, instruction.op.name());
        }
        true
    }

    fn end_instruction(&mut self) -> Result<(), Rejection> {
        self.generate_jump_code_with_type_conversions(0, JumpMode::None)?;
        self.next_section();
        Ok(())
    }

    /// Comment the source lines from the current instruction's line up to
    /// the next mapped line.
    fn generate_source_comments(&mut self, offset: usize) {
        let function = self.function;
        let Some(line) = function.line_for_offset(offset) else {
            return;
        };
        if self.last_line == Some(line) {
            return;
        }
        let end = function.next_line(line).unwrap_or(line + 1);
        for number in line..end {
            let text = number
                .checked_sub(1)
                .and_then(|index| function.source_lines.get(index as usize))
                .map_or("", |text| text.trim());
            self.body += format!("// {}\n", text);
        }
        self.last_line = Some(line);
    }

    fn next_section(&mut self) {
        let section = std::mem::take(&mut self.body);
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    fn generate_op(&mut self, op: &Op) -> Result<(), Rejection> {
        match *op {
            Op::Ret => self.generate_ret(),
            Op::LoadConst { index } => self.generate_load_const(index),
            Op::LoadZero => self.generate_load_int(0),
            Op::LoadTrue => self.generate_load_bool(true),
            Op::LoadFalse => self.generate_load_bool(false),
            Op::LoadNull => self.generate_load_null(),
            Op::LoadUndefined => self.generate_load_undefined(),
            Op::LoadInt { value } => self.generate_load_int(value),
            Op::MoveConst { index, dest } => self.generate_move_const(index, dest),
            Op::LoadReg { reg } => self.generate_load_reg(reg),
            Op::StoreReg { reg } => self.generate_store_reg(reg),
            Op::MoveReg { src, dest } => self.generate_move_reg(src, dest),
            Op::LoadRuntimeString { string } => self.generate_load_runtime_string(string),

            Op::LoadGlobalLookup { index } => self.generate_load_global_lookup(index),
            Op::LoadQmlContextPropertyLookup { index } => {
                self.generate_load_qml_context_property_lookup(index)
            }
            Op::StoreNameSloppy { name } => self.generate_store_name_sloppy(name),
            Op::LoadElement { base } => self.generate_load_element(base),
            Op::StoreElement { base, index } => self.generate_store_element(base, index),
            Op::GetLookup { index } => self.generate_get_lookup(index),
            Op::SetLookup { index, base } => self.generate_set_lookup(index, base),

            Op::CallPropertyLookup { index, base, argc, argv } => {
                self.generate_call_property_lookup(index, base, argc, argv)
            }
            Op::CallQmlContextPropertyLookup { index, argc, argv } => {
                self.generate_call_qml_context_property_lookup(index, argc, argv)
            }

            Op::ThrowException => self.generate_throw_exception(),
            Op::CreateCallContext => self.generate_create_call_context(),
            Op::PopContext => self.generate_pop_context(),
            Op::Jump { offset } => self.generate_jump(offset),
            Op::JumpTrue { offset } => self.generate_conditional_jump(offset, false),
            Op::JumpFalse { offset } => self.generate_conditional_jump(offset, true),
            Op::JumpNoException { offset } => self.generate_jump_no_exception(offset),
            Op::CheckException => self.generate_check_exception(),

            Op::CmpEqNull => self.generate_compare_null(false),
            Op::CmpNeNull => self.generate_compare_null(true),
            Op::CmpEqInt { lhs } => self.generate_compare_int(lhs, false),
            Op::CmpNeInt { lhs } => self.generate_compare_int(lhs, true),
            Op::CmpEq { lhs } => self.generate_equality_operation(lhs, "equals", false),
            Op::CmpNe { lhs } => self.generate_equality_operation(lhs, "equals", true),
            Op::CmpStrictEqual { lhs } => self.generate_equality_operation(lhs, "strictlyEquals", false),
            Op::CmpStrictNotEqual { lhs } => {
                self.generate_equality_operation(lhs, "strictlyEquals", true)
            }
            Op::CmpGt { lhs } => self.generate_compare_operation(lhs, ">"),
            Op::CmpGe { lhs } => self.generate_compare_operation(lhs, ">="),
            Op::CmpLt { lhs } => self.generate_compare_operation(lhs, "<"),
            Op::CmpLe { lhs } => self.generate_compare_operation(lhs, "<="),
            Op::As { lhs } => self.generate_as(lhs),

            Op::UNot => self.generate_unot(),
            Op::UPlus => self.generate_unary_sign("+"),
            Op::UMinus => self.generate_unary_sign("-"),
            Op::Increment => self.generate_step("++"),
            Op::Decrement => self.generate_step("--"),
            Op::Add { lhs } => self.generate_arithmetic_operation(lhs, "+"),
            Op::Sub { lhs } => self.generate_arithmetic_operation(lhs, "-"),
            Op::Mul { lhs } => self.generate_arithmetic_operation(lhs, "*"),
            Op::Div { lhs } => self.generate_arithmetic_operation(lhs, "/"),
            Op::Mod { lhs } => self.generate_mod(lhs),

            Op::LoadLocal { .. }
            | Op::LoadName { .. }
            | Op::LoadProperty { .. }
            | Op::StoreProperty { .. }
            | Op::CallProperty { .. }
            | Op::CallName { .. }
            | Op::CallGlobalLookup { .. }
            | Op::Construct { .. }
            | Op::UnwindDispatch
            | Op::PushCatchContext { .. }
            | Op::TypeofName { .. }
            | Op::TypeofValue
            | Op::DefineArray { .. }
            | Op::DefineObjectLiteral { .. }
            | Op::Shr { .. }
            | Op::Shl { .. }
            | Op::ShrConst { .. }
            | Op::ShlConst { .. }
            | Op::CmpIn { .. } => Err(Rejection::unsupported(op.name())),
            Op::SetUnwindHandler { .. } => Err(Rejection::unsupported("SetUnwindHandler")),

            _ => Err(Rejection::invalid(format!(
                "Instruction \"{}\" not implemented",
                op.name()
            ))),
        }
    }

    // ===== State access =====

    /// Accumulator entering the instruction.
    fn accumulator_in(&self) -> Result<RegisterContent, Rejection> {
        self.state
            .accumulator_in
            .clone()
            .ok_or_else(|| Rejection::invalid("No type information for the accumulator"))
    }

    /// Accumulator the instruction produces.
    fn accumulator_out(&self) -> Result<RegisterContent, Rejection> {
        self.state
            .accumulator_out
            .clone()
            .ok_or_else(|| Rejection::invalid("No type information for the instruction result"))
    }

    /// Content of register `index` at the current instruction.
    fn register_type(&self, index: u32) -> Result<RegisterContent, Rejection> {
        let argument_count = self.function.argument_types.len();
        if is_argument(index, argument_count) {
            let ty = self.function.argument_types[(index - FIRST_ARGUMENT) as usize];
            return Ok(self.resolver.global_type(ty));
        }
        self.state
            .annotation
            .and_then(|annotation| annotation.register(index))
            .cloned()
            .ok_or_else(|| Rejection::invalid(format!("No type information for register {}", index)))
    }

    /// Variable holding register `index` at the current instruction; empty
    /// if the register holds nothing storable.
    fn register_variable(&self, index: u32) -> String {
        let argument_count = self.function.argument_types.len();
        if is_argument(index, argument_count) {
            let argument = (index - FIRST_ARGUMENT) as usize;
            return format!(
                "(*static_cast<{}*>(argumentsPtr[{}]))",
                self.resolver.augmented_internal_name(self.function.argument_types[argument]),
                argument
            );
        }
        self.register_type(index)
            .ok()
            .and_then(|content| self.variable_for(index, content.stored))
            .unwrap_or_default()
    }

    fn variable_for(&self, index: u32, stored: ScopeId) -> Option<String> {
        self.register_variables
            .get(&index)?
            .iter()
            .find(|(ty, _)| *ty == stored)
            .map(|(_, variable)| variable.clone())
    }

    /// Record a read of `variable` in the current section.
    fn use_var(&mut self, variable: &str) -> String {
        self.body.add_read_register(variable);
        variable.to_string()
    }

    fn add_include(&mut self, include: &str) {
        self.includes.insert(include.to_string());
    }

    // ===== Conversions =====

    fn conversion(
        &self,
        from: &RegisterContent,
        to: &RegisterContent,
        variable: &str,
    ) -> Result<String, Rejection> {
        convert_contained(&self.resolver, from, to, variable)
    }

    fn convert(&self, from: ScopeId, to: ScopeId, variable: &str) -> String {
        convert_stored(&self.resolver, from, to, variable)
    }

    /// What a failing function returns.
    fn error_return_value(&self) -> String {
        let r = self.resolver;
        match self.function.return_type {
            Some(ty) if r.is_reference(ty) => self.convert(r.builtins().void, ty, ""),
            Some(ty) if ty == r.builtins().void => String::new(),
            Some(ty) => format!("{}()", r.internal_name(ty)),
            None => String::new(),
        }
    }

    fn return_statement(&self) -> String {
        let value = self.error_return_value();
        if value.is_empty() {
            "return;\n".to_string()
        } else {
            format!("return {};\n", value)
        }
    }

    // ===== Shared code shapes =====

    fn generate_set_instruction_pointer(&mut self) {
        let next = self.function.next_offset(self.position);
        self.body += format!("aotContext->setInstructionPointer({});\n", next);
    }

    fn generate_exception_check(&mut self) {
        let statement = self.return_statement();
        self.body += "if (aotContext->engine->hasError())\n    ";
        self.body += statement;
    }

    /// Retry `lookup` until it succeeds, initializing it in between.
    fn generate_lookup(&mut self, lookup: &str, initialization: &str, preparation: &str) {
        if !preparation.is_empty() {
            self.body += format!("{};\n", preparation);
        }
        self.body += format!("while (!{}) {{\n", lookup);
        self.generate_set_instruction_pointer();
        self.body += format!("{};\n", initialization);
        self.generate_exception_check();
        if !preparation.is_empty() {
            self.body += format!("{};\n", preparation);
        }
        self.body += "}\n";
    }

    /// Emit the conversions a jump to `relative` needs, then the jump.
    /// With `relative == 0` only the conversions for falling through are
    /// emitted.
    fn generate_jump_code_with_type_conversions(
        &mut self,
        relative: i32,
        mode: JumpMode,
    ) -> Result<(), Rejection> {
        let target = self
            .jump_target(self.position, relative)
            .ok_or_else(|| Rejection::invalid(format!("Jump to negative offset {}", relative)))?;

        let mut conversions = Vec::new();
        if let (Some(expected), Some(current)) = (self.annotations.get(&target), self.state.annotation) {
            let current = current.registers_after();
            for (index, target_type) in &expected.expected_target_types_before_jump {
                let Some(current_type) = current.get(index) else {
                    continue;
                };
                if current_type == target_type {
                    continue;
                }
                let Some(variable) = self.variable_for(*index, target_type.stored) else {
                    continue;
                };
                let old = self.register_variable(*index);
                if variable == old || old.is_empty() {
                    continue;
                }
                conversions.push((variable, current_type.clone(), target_type.clone(), old));
            }
        }

        if relative == 0 && conversions.is_empty() {
            return Ok(());
        }

        self.next_section();
        self.body.set_has_side_effects(true);
        self.body += "{\n";
        for (variable, current_type, target_type, old) in conversions {
            self.next_section();
            let read = self.use_var(&old);
            let converted = self.conversion(&current_type, &target_type, &read)?;
            self.body += format!("{} = {};\n", variable, converted);
            self.body.set_write_register(variable);
        }

        self.next_section();
        self.body.set_has_side_effects(true);
        if relative != 0 {
            let count = self.labels.len();
            let label = self
                .labels
                .entry(target)
                .or_insert_with(|| format!("label_{}", count))
                .clone();
            self.body += format!("    goto {};\n", label);
            self.body.set_jump(label, mode);
        }
        self.body += "}\n";
        Ok(())
    }

    // ===== Meta types =====

    fn meta_type_from_type(&self, ty: ScopeId) -> String {
        format!("QMetaType::fromType<{}>()", self.resolver.augmented_internal_name(ty))
    }

    fn meta_type_from_name(&self, ty: ScopeId) -> String {
        let normalized = self.resolver.augmented_internal_name(ty).replace(" *", "*");
        format!("QMetaType::fromName(\"{}\")", normalized)
    }

    fn meta_object(&self, ty: ScopeId) -> Result<String, Rejection> {
        let scope = &self.resolver.arena()[ty];
        if scope.is_composite {
            return Err(Rejection::unsupported(
                "retrieving the metaObject of a composite type without using an instance.",
            ));
        }
        let name = self.resolver.internal_name(ty);
        if name == "QObject" || name == "QQmlComponent" {
            return Ok(format!("&{}::staticMetaObject", name));
        }
        Ok(format!("{}.metaObject()", self.meta_type_from_name(ty)))
    }

    /// Pointer to the payload of `variable`, holding `content`.
    fn content_pointer(&self, content: &RegisterContent, variable: &str) -> Result<String, Rejection> {
        let r = self.resolver;
        let stored = content.stored;
        if r.contained_type(content) == stored || r.is_reference(stored) {
            Ok(format!("&{}", variable))
        } else if stored == r.builtins().var {
            Ok(format!("{}.data()", variable))
        } else {
            Err(Rejection::unsupported(format!(
                "content pointer of non-QVariant wrapper type {}",
                r.descriptive_name(content)
            )))
        }
    }

    /// Meta type of the payload of `variable`, holding `content`.
    fn content_type(&self, content: &RegisterContent, variable: &str) -> Result<String, Rejection> {
        let r = self.resolver;
        let stored = content.stored;
        let contained = r.contained_type(content);
        let contained = r.arena().non_composite_base_type(contained).unwrap_or(contained);
        if contained == stored {
            Ok(self.meta_type_from_type(stored))
        } else if stored == r.builtins().var {
            Ok(format!("{}.metaType()", variable))
        } else if r.is_reference(stored) {
            Ok(self.meta_type_from_name(contained))
        } else {
            Err(Rejection::unsupported(format!(
                "content type of non-QVariant wrapper type {}",
                r.descriptive_name(content)
            )))
        }
    }

    /// Code making `variable` ready to receive a lookup result.
    fn get_lookup_preparation(&self, content: &RegisterContent, variable: &str, lookup: u32) -> String {
        let r = self.resolver;
        if r.contained_type(content) != content.stored && content.stored == r.builtins().var {
            format!("{} = QVariant(aotContext->lookupResultMetaType({}))", variable, lookup)
        } else {
            String::new()
        }
    }

    /// Code converting `variable` into what a lookup stores.
    fn set_lookup_preparation(&self, content: &RegisterContent, variable: &str, lookup: u32) -> String {
        let r = self.resolver;
        if r.contained_type(content) != content.stored && content.stored == r.builtins().var {
            format!(
                "const QMetaType argType = aotContext->lookupResultMetaType({});\n\
                 if (argType.isValid())\n    {}.convert(argType)",
                lookup, variable
            )
        } else {
            String::new()
        }
    }

    fn lookup_name(&self, index: u32) -> Result<&'a str, Rejection> {
        let tables: &'a UnitTables = self.tables;
        tables
            .lookup_name(index)
            .ok_or_else(|| Rejection::invalid(format!("Invalid lookup index {}", index)))
    }

    fn string(&self, index: u32) -> Result<&'a str, Rejection> {
        let tables: &'a UnitTables = self.tables;
        tables
            .string(index)
            .ok_or_else(|| Rejection::invalid(format!("Invalid string index {}", index)))
    }

    fn access(&self, ty: ScopeId) -> AccessSemantics {
        self.resolver.arena()[ty].access
    }
}

/// Generate native code for a resolved function.
pub fn generate_function(
    resolver: TypeResolver<'_>,
    tables: &UnitTables,
    function: &ResolvedFunction,
    options: GeneratorOptions,
) -> Result<AotFunction, RejectedFunction> {
    Generator::new(resolver, tables, &function.function, &function.annotations, options).run()
}
