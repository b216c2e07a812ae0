//! Accumulator conversion guard.
//!
//! Lookups write their result through a pointer and so need a variable of
//! the property's natural type. When the annotation stores the result in a
//! different type, the guard redirects the accumulator to a temporary
//! `retrieved` of the natural type and converts it into the real output
//! variable when dropped.

use std::ops::{Deref, DerefMut};

use qmlaot_scope::ScopeId;

use super::Generator;
use crate::conversion::convert_contained;
use crate::error::Rejection;
use crate::register::RegisterContent;

/// Redirects the accumulator output for the lifetime of the guard.
pub(super) struct AccumulatorConverter<'g, 'a> {
    generator: &'g mut Generator<'a>,
    saved: Option<(RegisterContent, String)>,
    closing: String,
}

impl<'g, 'a> AccumulatorConverter<'g, 'a> {
    pub(super) fn new(generator: &'g mut Generator<'a>) -> Result<Self, Rejection> {
        let mut converter = Self {
            generator,
            saved: None,
            closing: String::new(),
        };

        let Some(out) = converter.state.accumulator_out.clone() else {
            return Ok(converter);
        };
        let out_variable = converter.state.accumulator_variable_out.clone();
        if out_variable.is_empty() {
            return Ok(converter);
        }
        let Some(natural) = converter.natural_stored_type(&out) else {
            return Ok(converter);
        };
        let b = converter.resolver.builtins();
        if natural == out.stored || natural == b.void || out.stored == b.var {
            return Ok(converter);
        }

        let retrieved = out.stored_in(natural);
        let assignment = convert_contained(&converter.resolver, &retrieved, &out, "std::move(retrieved)")?;
        let declaration = format!("{{\n{} retrieved;\n", converter.resolver.augmented_internal_name(natural));
        converter.body += declaration;
        converter.closing = format!("{} = {};\n}}\n", out_variable, assignment);
        converter.state.accumulator_out = Some(retrieved);
        converter.state.accumulator_variable_out = "retrieved".to_string();
        converter.saved = Some((out, out_variable));
        Ok(converter)
    }

    /// Type a lookup of `content` naturally produces.
    fn natural_stored_type(&self, content: &RegisterContent) -> Option<ScopeId> {
        let property = content.property()?;
        if property.is_list {
            Some(self.resolver.builtins().list_property)
        } else {
            Some(self.resolver.stored_type(property.ty))
        }
    }
}

impl<'a> Deref for AccumulatorConverter<'_, 'a> {
    type Target = Generator<'a>;

    fn deref(&self) -> &Self::Target {
        self.generator
    }
}

impl<'a> DerefMut for AccumulatorConverter<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.generator
    }
}

impl Drop for AccumulatorConverter<'_, '_> {
    fn drop(&mut self) {
        let closing = std::mem::take(&mut self.closing);
        self.generator.body += closing;
        if let Some((content, variable)) = self.saved.take() {
            self.generator.state.accumulator_out = Some(content);
            self.generator.state.accumulator_variable_out = variable;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{BuiltinTypes, ContextualTypes, ScopeArena};

    use crate::annotation::Annotations;
    use crate::generator::GeneratorOptions;
    use crate::instruction::{Function, UnitTables};
    use crate::register::{ContentVariant, PropertyContent};
    use crate::resolver::TypeResolver;

    fn fixture() -> (ScopeArena, BuiltinTypes) {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        (arena, builtins)
    }

    fn function(b: &BuiltinTypes) -> Function {
        Function {
            name: "f".into(),
            index: 0,
            qml_scope: b.object,
            argument_types: Vec::new(),
            return_type: None,
            instructions: Vec::new(),
            source_lines: Vec::new(),
            line_mapping: Vec::new(),
        }
    }

    fn property(b: &BuiltinTypes, stored: ScopeId) -> RegisterContent {
        let property = PropertyContent {
            name: "width".into(),
            ty: b.real,
            is_list: false,
        };
        RegisterContent::of_property(stored, property, ContentVariant::ScopeProperty, b.object)
    }

    #[test]
    fn test_redirects_and_converts_on_drop() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let tables = UnitTables::default();
        let function = function(&b);
        let annotations = Annotations::new();
        let mut generator = Generator::new(r, &tables, &function, &annotations, GeneratorOptions::default());
        generator.state.accumulator_out = Some(property(&b, b.js_primitive));
        generator.state.accumulator_variable_out = "r2".into();

        {
            let mut converter = AccumulatorConverter::new(&mut generator).unwrap();
            assert_eq!(converter.state.accumulator_variable_out, "retrieved");
            assert_eq!(converter.state.accumulator_out.as_ref().unwrap().stored, b.real);
            converter.body += "lookup(&retrieved);\n";
        }

        assert_eq!(
            generator.body.code(),
            "{\ndouble retrieved;\nlookup(&retrieved);\nr2 = QJSPrimitiveValue(std::move(retrieved));\n}\n"
        );
        assert_eq!(generator.state.accumulator_variable_out, "r2");
    }

    #[test]
    fn test_matching_types_pass_through() {
        let (arena, b) = fixture();
        let r = TypeResolver::new(&arena, &b);
        let tables = UnitTables::default();
        let function = function(&b);
        let annotations = Annotations::new();
        let mut generator = Generator::new(r, &tables, &function, &annotations, GeneratorOptions::default());
        generator.state.accumulator_out = Some(property(&b, b.real));
        generator.state.accumulator_variable_out = "r2".into();

        drop(AccumulatorConverter::new(&mut generator).unwrap());
        assert!(generator.body.is_empty());
        assert_eq!(generator.state.accumulator_variable_out, "r2");
    }
}
