//! Property, name, type and element access.
//!
//! Whatever cannot be bound statically goes through a runtime lookup:
//! `while (!lookup) { init; }`. The lookup caches its resolution in the
//! compilation unit's lookup table on first use.

use qmlaot_scope::AccessSemantics;

use super::guard::AccumulatorConverter;
use super::Generator;
use crate::error::Rejection;
use crate::register::{ContentVariant, RegisterContent};

const INVALID_STRING_ID: &str = "QQmlPrivate::AOTCompiledContext::InvalidStringId";

impl<'a> Generator<'a> {
    pub(super) fn generate_load_global_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let variable = self.state.accumulator_variable_out.clone();
        if variable.is_empty() {
            return Ok(());
        }
        let lookup = format!(
            "aotContext->loadGlobalLookup({}, &{}, {})",
            index,
            variable,
            self.meta_type_from_type(out.stored)
        );
        let initialization = format!("aotContext->initLoadGlobalLookup({})", index);
        self.generate_lookup(&lookup, &initialization, "");
        Ok(())
    }

    pub(super) fn generate_load_qml_context_property_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let mut converter = AccumulatorConverter::new(self)?;
        converter.load_qml_context_property(index)
    }

    fn load_qml_context_property(&mut self, index: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let variable = self.state.accumulator_variable_out.clone();
        if variable.is_empty() {
            return Ok(());
        }
        let r = self.resolver;

        match out.variant {
            ContentVariant::JavaScriptGlobal => {
                let name = self
                    .tables
                    .lookup_name_index(index)
                    .ok_or_else(|| Rejection::invalid(format!("Invalid lookup index {}", index)))?;
                let global = format!("aotContext->javaScriptGlobalProperty({})", name);
                let value = self.convert(r.builtins().js_value, out.stored, &global);
                self.body += format!("{} = {};\n", variable, value);
            }
            ContentVariant::ObjectById => {
                let lookup = format!(
                    "aotContext->loadContextIdLookup({}, {})",
                    index,
                    self.content_pointer(&out, &variable)?
                );
                let initialization = format!("aotContext->initLoadContextIdLookup({})", index);
                self.generate_lookup(&lookup, &initialization, "");
            }
            ContentVariant::ScopeProperty | ContentVariant::ExtensionScopeProperty => {
                let lookup = format!(
                    "aotContext->loadScopeObjectPropertyLookup({}, {})",
                    index,
                    self.content_pointer(&out, &variable)?
                );
                let initialization = format!(
                    "aotContext->initLoadScopeObjectPropertyLookup({}, {})",
                    index,
                    self.content_type(&out, &variable)?
                );
                let preparation = self.get_lookup_preparation(&out, &variable, index);
                self.body += "{\n";
                self.generate_lookup(&lookup, &initialization, &preparation);
                self.body += "}\n";
            }
            _ if out.is_type() || out.is_import_namespace() => self.generate_type_lookup(index)?,
            _ => {
                return Err(Rejection::unsupported(format!(
                    "lookup of {}",
                    r.descriptive_name(&out)
                )))
            }
        }
        Ok(())
    }

    /// Import namespace the accumulator refers to, as a string index.
    fn namespace_string(&self) -> String {
        self.state
            .accumulator_in
            .as_ref()
            .and_then(RegisterContent::import_namespace)
            .map_or_else(|| INVALID_STRING_ID.to_string(), |index| index.to_string())
    }

    fn generate_type_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let variable = self.state.accumulator_variable_out.clone();
        let namespace = self.namespace_string();
        let r = self.resolver;

        match out.variant {
            ContentVariant::Singleton => {
                if !r.is_reference(out.stored) {
                    return Err(Rejection::unsupported("non-QObject singleton type"));
                }
                let lookup = format!("aotContext->loadSingletonLookup({}, &{})", index, variable);
                let initialization = format!("aotContext->initLoadSingletonLookup({}, {})", index, namespace);
                self.generate_lookup(&lookup, &initialization, "");
            }
            ContentVariant::ScopeModulePrefix => {
                self.body += format!("{} = aotContext->qmlScopeObject;\n", variable);
            }
            ContentVariant::ScopeAttached => {
                let lookup = format!(
                    "aotContext->loadAttachedLookup({}, aotContext->qmlScopeObject, &{})",
                    index, variable
                );
                let initialization = format!(
                    "aotContext->initLoadAttachedLookup({}, {}, aotContext->qmlScopeObject)",
                    index, namespace
                );
                self.generate_lookup(&lookup, &initialization, "");
            }
            ContentVariant::Script => return Err(Rejection::unsupported("script lookup")),
            ContentVariant::MetaType => {
                if out.stored != r.builtins().meta_object {
                    return Err(Rejection::unsupported("meta-object stored in different type"));
                }
                let lookup = format!("aotContext->loadTypeLookup({}, &{})", index, variable);
                let initialization = format!("aotContext->initLoadTypeLookup({}, {})", index, namespace);
                self.generate_lookup(&lookup, &initialization, "");
            }
            _ => {
                return Err(Rejection::invalid(format!(
                    "Unexpected type lookup of {}",
                    r.descriptive_name(&out)
                )))
            }
        }
        Ok(())
    }

    fn generate_enum_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        let member = out.enum_member();
        if member.is_empty() {
            // The enumeration itself; only its members produce values.
            return Ok(());
        }
        let enumeration = out
            .enumeration()
            .ok_or_else(|| Rejection::invalid("Enum lookup without enumeration"))?;
        let variable = self.state.accumulator_variable_out.clone();

        if let Some(value) = enumeration.value(member) {
            self.body += format!("{} = {};\n", variable, value);
            return Ok(());
        }

        let scope = out
            .scope
            .ok_or_else(|| Rejection::invalid("Enum lookup without owning type"))?;
        let name = match (&enumeration.alias, enumeration.is_flag) {
            (Some(alias), true) => alias.as_str(),
            _ => enumeration.name.as_str(),
        };
        let lookup = format!("aotContext->getEnumLookup({}, &{})", index, variable);
        let initialization = format!(
            "aotContext->initGetEnumLookup({}, {}, \"{}\", \"{}\")",
            index,
            self.meta_object(scope)?,
            name,
            member
        );
        self.generate_lookup(&lookup, &initialization, "");
        Ok(())
    }

    pub(super) fn generate_get_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let out = self.accumulator_out()?;
        if out.is_method() {
            return Err(Rejection::unsupported("lookup of function property."));
        }
        if out.is_enumeration() {
            return self.generate_enum_lookup(index);
        }
        if out.is_import_namespace() {
            // Resolved statically; the next lookup consumes the namespace.
            self.body.set_write_register("");
            return Ok(());
        }
        let mut converter = AccumulatorConverter::new(self)?;
        converter.get_lookup(index)
    }

    fn get_lookup(&mut self, index: u32) -> Result<(), Rejection> {
        let input = self.accumulator_in()?;
        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let in_variable = self.state.accumulator_variable_in.clone();
        let base = self.use_var(&in_variable);
        let r = self.resolver;
        let b = r.builtins();

        match out.variant {
            ContentVariant::ObjectAttached => {
                let namespace = self.namespace_string();
                let lookup = format!(
                    "aotContext->loadAttachedLookup({}, {}, &{})",
                    index, base, out_variable
                );
                let initialization = format!(
                    "aotContext->initLoadAttachedLookup({}, {}, {})",
                    index, namespace, base
                );
                self.generate_lookup(&lookup, &initialization, "");
                return Ok(());
            }
            ContentVariant::Singleton
            | ContentVariant::ScopeModulePrefix
            | ContentVariant::ScopeAttached
            | ContentVariant::Script
            | ContentVariant::MetaType => return self.generate_type_lookup(index),
            _ => {}
        }

        if r.is_reference(input.stored) {
            let preparation = self.get_lookup_preparation(&out, &out_variable, index);
            self.body += "{\n";
            let base = self.protect_accumulator(&input, &base);
            let lookup = format!(
                "aotContext->getObjectLookup({}, {}, {})",
                index,
                base,
                self.content_pointer(&out, &out_variable)?
            );
            let initialization = format!(
                "aotContext->initGetObjectLookup({}, {}, {})",
                index,
                base,
                self.content_type(&out, &out_variable)?
            );
            self.generate_lookup(&lookup, &initialization, &preparation);
            self.body += "}\n";
            return Ok(());
        }

        let name = self.lookup_name(index)?;
        if name == "length" && r.contained_type(&input) == b.string {
            let length = self.convert(b.int, out.stored, &format!("{}.length()", base));
            self.body += format!("{} = {};\n", out_variable, length);
            return Ok(());
        }
        if name == "length" && r.is_list(&input) {
            let count = if input.stored == b.list_property {
                format!("{}.count(&{})", base, base)
            } else {
                format!("{}.count()", base)
            };
            let length = self.convert(b.int, out.stored, &count);
            self.body += format!("{} = {};\n", out_variable, length);
            return Ok(());
        }

        if input.stored == b.js_value {
            return Err(Rejection::unsupported("lookup in QJSValue"));
        }

        let scope = out
            .scope
            .ok_or_else(|| Rejection::invalid(format!("Lookup of {} without owning type", name)))?;
        self.body += "{\n";
        let base = self.protect_accumulator(&input, &base);
        let lookup = format!(
            "aotContext->getValueLookup({}, {}, {})",
            index,
            self.content_pointer(&input, &base)?,
            self.content_pointer(&out, &out_variable)?
        );
        let initialization = format!(
            "aotContext->initGetValueLookup({}, {}, {})",
            index,
            self.meta_object(scope)?,
            self.content_type(&out, &out_variable)?
        );
        let preparation = self.get_lookup_preparation(&out, &out_variable, index);
        self.generate_lookup(&lookup, &initialization, &preparation);
        self.body += "}\n";
        Ok(())
    }

    /// When the lookup writes the variable it reads from, move the input
    /// aside first. Returns the variable to read from.
    fn protect_accumulator(&mut self, input: &RegisterContent, variable: &str) -> String {
        if variable.is_empty() || variable != self.state.accumulator_variable_out {
            return variable.to_string();
        }
        let moved = format!("{}_moved", variable);
        let stored = self.resolver.augmented_internal_name(input.stored);
        self.body += format!("{} {} = std::move({});\n", stored, moved, variable);
        moved
    }

    /// Value to store, as a pointer and meta type. Declares `converted`
    /// if the value needs converting to the target's representation.
    fn store_argument(
        &mut self,
        value: &RegisterContent,
        variable: &str,
        target: &RegisterContent,
    ) -> Result<(String, String), Rejection> {
        if value.stored == target.stored {
            return Ok((
                self.content_pointer(value, variable)?,
                self.content_type(value, variable)?,
            ));
        }
        let converted = self.conversion(value, target, variable)?;
        let declaration = format!(
            "{} converted = {};\n",
            self.resolver.augmented_internal_name(target.stored),
            converted
        );
        self.body += declaration;
        Ok(("&converted".to_string(), self.meta_type_from_type(target.stored)))
    }

    pub(super) fn generate_set_lookup(&mut self, index: u32, base: u32) -> Result<(), Rejection> {
        let value = self.accumulator_in()?;
        let base_type = self.register_type(base)?;
        let name = self.lookup_name(index)?;
        let r = self.resolver;
        let b = r.builtins();

        let value_variable = self.state.accumulator_variable_in.clone();
        let value_read = self.use_var(&value_variable);
        let object = self.register_variable(base);
        let object = self.use_var(&object);
        self.body.set_has_side_effects(true);

        if r.is_reference(base_type.stored) {
            let target = r.member_type(&base_type, name).ok_or_else(|| {
                Rejection::invalid(format!(
                    "Unknown property {} of {}",
                    name,
                    r.descriptive_name(&base_type)
                ))
            })?;
            if !target.is_property() {
                return Err(Rejection::unsupported(format!(
                    "assignment to non-property {} of {}",
                    name,
                    r.descriptive_name(&base_type)
                )));
            }
            self.body += "{\n";
            let (pointer, meta_type) = self.store_argument(&value, &value_read, &target)?;
            let preparation = self.set_lookup_preparation(&value, &value_read, index);
            let lookup = format!("aotContext->setObjectLookup({}, {}, {})", index, object, pointer);
            let initialization =
                format!("aotContext->initSetObjectLookup({}, {}, {})", index, object, meta_type);
            self.generate_lookup(&lookup, &initialization, &preparation);
            self.body += "}\n";
        } else if self.access(base_type.stored) == AccessSemantics::Sequence {
            if name != "length" {
                return Err(Rejection::unsupported(format!(
                    "setting non-length property {} of a list",
                    name
                )));
            }
            if base_type.stored != b.list_property {
                return Err(Rejection::unsupported(
                    "resizing sequence types (because of missing write-back)",
                ));
            }
            let length = self.convert(value.stored, b.int, &value_read);
            self.body += format!(
                "{{\n\
                 const int begin = {object}.count(&{object});\n\
                 const int end = {length};\n\
                 for (int i = begin; i < end; ++i)\n    {object}.append(&{object}, nullptr);\n\
                 for (int i = begin; i > end; --i)\n    {object}.removeLast(&{object});\n\
                 }}\n"
            );
        } else {
            return Err(Rejection::unsupported(format!(
                "setting property {} of value type {}",
                name,
                r.descriptive_name(&base_type)
            )));
        }
        Ok(())
    }

    pub(super) fn generate_store_name_sloppy(&mut self, name: u32) -> Result<(), Rejection> {
        let text = self.string(name)?;
        let value = self.accumulator_in()?;
        let r = self.resolver;
        let target = r.scoped_type(self.function.qml_scope, text).ok_or_else(|| {
            Rejection::invalid(format!("Cannot assign to unknown name {}", text))
        })?;
        if target.is_method() {
            return Err(Rejection::unsupported("assignment to scope method"));
        }
        if !target.is_property() {
            return Err(Rejection::unsupported(format!(
                "assignment to {}",
                r.descriptive_name(&target)
            )));
        }

        let variable = self.state.accumulator_variable_in.clone();
        let read = self.use_var(&variable);
        self.body.set_has_side_effects(true);
        self.body += "{\n";
        let (pointer, meta_type) = self.store_argument(&value, &read, &target)?;
        self.body += format!(
            "aotContext->storeNameSloppy({}, {}, {});\n",
            name, pointer, meta_type
        );
        self.generate_exception_check();
        self.body += "}\n";
        Ok(())
    }

    /// Index expression for element access, converted to `int`, and a guard
    /// rejecting non-integral numbers when the index is not an integer type.
    fn element_index(&mut self, index: &RegisterContent, variable: &str) -> (String, Option<String>) {
        let r = self.resolver;
        let int = r.builtins().int;
        if index.stored == int {
            return (variable.to_string(), None);
        }
        let converted = self.convert(index.stored, int, variable);
        if r.is_integral(index.stored) {
            (converted, None)
        } else {
            let real = self.convert(index.stored, r.builtins().real, variable);
            (converted, Some(format!("QJSNumberCoercion::isInteger({})", real)))
        }
    }

    pub(super) fn generate_load_element(&mut self, base: u32) -> Result<(), Rejection> {
        let base_type = self.register_type(base)?;
        let index = self.accumulator_in()?;
        let r = self.resolver;
        let b = r.builtins();
        if !r.is_list(&base_type) || !r.is_numeric(index.stored) {
            return Err(Rejection::unsupported(
                "LoadElement with non-list base type or non-numeric arguments",
            ));
        }
        if base_type.stored != b.list_property && !r.is_sequence(base_type.stored) {
            return Err(Rejection::unsupported("indirect LoadElement"));
        }

        let out = self.accumulator_out()?;
        let out_variable = self.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(());
        }
        let index_variable = self.state.accumulator_variable_in.clone();
        let index_read = self.use_var(&index_variable);
        let base_variable = self.register_variable(base);
        let base_read = self.use_var(&base_variable);
        let (index_name, guard) = self.element_index(&index, &index_read);
        let void_value = self.conversion(&r.global_type(b.void), &out, "")?;
        let void_assignment = format!("    {} = {};\n", out_variable, void_value);

        if let Some(guard) = guard {
            self.body += format!("if (!{})\n{}else ", guard, void_assignment);
        }
        let element = r.value_type(&base_type);
        if base_type.stored == b.list_property {
            let value = self.conversion(
                &element,
                &out,
                &format!("{}.at(&{}, {})", base_read, base_read, index_name),
            )?;
            self.body += format!(
                "if ({index} >= 0 && {index} < {base}.count(&{base}))\n    {out} = {value};\nelse\n{void}",
                index = index_name,
                base = base_read,
                out = out_variable,
                value = value,
                void = void_assignment
            );
        } else {
            let value = self.conversion(&element, &out, &format!("{}.at({})", base_read, index_name))?;
            self.body += format!(
                "if ({index} >= 0 && {index} < {base}.length())\n    {out} = {value};\nelse\n{void}",
                index = index_name,
                base = base_read,
                out = out_variable,
                value = value,
                void = void_assignment
            );
        }
        Ok(())
    }

    pub(super) fn generate_store_element(&mut self, base: u32, index: u32) -> Result<(), Rejection> {
        let base_type = self.register_type(base)?;
        let index_type = self.register_type(index)?;
        let r = self.resolver;
        let b = r.builtins();
        if !r.is_list(&base_type) || !r.is_numeric(index_type.stored) {
            return Err(Rejection::unsupported(
                "StoreElement with non-list base type or non-numeric arguments",
            ));
        }
        if base_type.stored != b.list_property {
            return Err(Rejection::unsupported("indirect StoreElement"));
        }

        let value = self.accumulator_in()?;
        let value_variable = self.state.accumulator_variable_in.clone();
        let value_read = self.use_var(&value_variable);
        let base_variable = self.register_variable(base);
        let base_read = self.use_var(&base_variable);
        let index_variable = self.register_variable(index);
        let index_read = self.use_var(&index_variable);
        let (index_name, guard) = self.element_index(&index_type, &index_read);
        let element = r.value_type(&base_type);
        let converted = self.conversion(&value, &element, &value_read)?;

        self.body.set_has_side_effects(true);
        if let Some(guard) = guard {
            self.body += format!("if ({}) ", guard);
        }
        self.body += format!(
            "if ({index} >= 0 && {index} < {base}.count(&{base}))\n    {base}.replace(&{base}, {index}, {value});\n",
            index = index_name,
            base = base_read,
            value = converted
        );
        Ok(())
    }
}
