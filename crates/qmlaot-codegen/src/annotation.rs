//! Per-instruction register annotations.
//!
//! The type propagation pass that runs before code generation records, for
//! every instruction offset, the contents of the registers entering the
//! instruction, the register the instruction writes and the types a jump
//! target expects. [`InstructionAnnotation`] holds that in resolved form.
//!
//! Annotations, functions and the unit tables can also be read from JSON in
//! which types are referred to by name ([`RawUnit`]). Names resolve through
//! a [`TypeNames`] table:
//!
//! - `#id` names an object of the document by its id
//! - the document's component name and inline component names name their
//!   root scopes
//! - anything else goes through the contextual type table

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use qmlaot_scope::visitor::IdTable;
use qmlaot_scope::{ContextualTypes, ScopeId, TypeLookup, VisitResult};

use crate::error::AnnotationError;
use crate::instruction::{Function, Instruction, UnitTables};
use crate::register::{Content, ContentVariant, RegisterContent, ACCUMULATOR};
use crate::resolver::TypeResolver;

/// Register state around one instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionAnnotation {
    /// Contents of the live registers entering the instruction
    pub registers: BTreeMap<u32, RegisterContent>,
    /// The register the instruction writes and its new content
    pub changed_register: Option<(u32, RegisterContent)>,
    /// Contents a jump to this instruction must establish first
    pub expected_target_types_before_jump: BTreeMap<u32, RegisterContent>,
}

impl InstructionAnnotation {
    /// Accumulator entering the instruction.
    pub fn accumulator_in(&self) -> Option<&RegisterContent> {
        self.registers.get(&ACCUMULATOR)
    }

    /// Accumulator written by the instruction.
    pub fn accumulator_out(&self) -> Option<&RegisterContent> {
        match &self.changed_register {
            Some((index, content)) if *index == ACCUMULATOR => Some(content),
            _ => None,
        }
    }

    /// Content of register `index` as the instruction sees it: the written
    /// content for the changed register, the entering content otherwise.
    pub fn register(&self, index: u32) -> Option<&RegisterContent> {
        match &self.changed_register {
            Some((changed, content)) if *changed == index => Some(content),
            _ => self.registers.get(&index),
        }
    }

    /// Register contents after the instruction ran.
    pub fn registers_after(&self) -> BTreeMap<u32, RegisterContent> {
        let mut after = self.registers.clone();
        if let Some((index, content)) = &self.changed_register {
            after.insert(*index, content.clone());
        }
        after
    }
}

/// Annotations of one function by instruction offset.
pub type Annotations = BTreeMap<usize, InstructionAnnotation>;

// ── Raw (JSON) form ──────────────────────────────────────────────────────

/// What a raw register content refers to.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawContentKind {
    /// A value of a named type
    Type {
        /// Type name
        name: String,
    },
    /// A property of a named type
    Property {
        /// Type the property is looked up on
        owner: String,
        /// Property name
        name: String,
    },
    /// An enumeration or enum member of a named type
    Enum {
        /// Type the enumeration is looked up on
        owner: String,
        /// Enumeration name
        name: String,
        /// Member, empty to refer to the enumeration itself
        #[serde(default)]
        member: String,
    },
    /// A method of a named type
    Method {
        /// Type the method is looked up on
        owner: String,
        /// Method name
        name: String,
    },
    /// An import namespace by string index
    ImportNamespace {
        /// String table index of the qualifier
        index: u32,
    },
    /// The merge of several types
    Conversion {
        /// Types flowing into the merge
        origins: Vec<String>,
        /// Resulting type
        result: String,
    },
}

/// A register content with types given by name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawContent {
    /// Name of the stored type
    pub stored: String,
    /// Logical content
    #[serde(flatten)]
    pub content: RawContentKind,
    /// How the content was produced; derived from the content if absent
    #[serde(default)]
    pub variant: ContentVariant,
    /// Scope type; derived from the content if absent
    #[serde(default)]
    pub scope: Option<String>,
}

/// The written register of a raw annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChanged {
    /// Register index, or `acc`
    pub register: String,
    /// New content
    pub content: RawContent,
}

/// An annotation with types given by name. Register keys are register
/// numbers or `acc` for the accumulator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnnotation {
    /// Entering contents
    #[serde(default)]
    pub registers: BTreeMap<String, RawContent>,
    /// Written register
    #[serde(default)]
    pub changed: Option<RawChanged>,
    /// Contents jumps to this instruction must establish
    #[serde(default)]
    pub jump_targets: BTreeMap<String, RawContent>,
}

/// A function with types given by name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFunction {
    /// Name
    pub name: String,
    /// Index in the compilation unit; defaults to the position in the list
    #[serde(default)]
    pub index: Option<usize>,
    /// The QML object the function runs in; defaults to the document root
    #[serde(default)]
    pub scope: Option<String>,
    /// Argument type names
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Return type name
    #[serde(default)]
    pub return_type: Option<String>,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
    /// (offset, line) pairs
    #[serde(default)]
    pub lines: Vec<(usize, u32)>,
    /// Annotations by instruction offset
    #[serde(default)]
    pub annotations: BTreeMap<usize, RawAnnotation>,
}

/// A compilation unit with types given by name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUnit {
    /// String, lookup and constant tables
    #[serde(flatten)]
    pub tables: UnitTables,
    /// Source text of the document, for line comments
    #[serde(default)]
    pub source: Option<String>,
    /// Functions
    #[serde(default)]
    pub functions: Vec<RawFunction>,
}

/// A function together with its annotations.
#[derive(Debug, Clone)]
pub struct ResolvedFunction {
    /// The function
    pub function: Function,
    /// Its annotations
    pub annotations: Annotations,
}

/// A compilation unit ready for code generation.
#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    /// String, lookup and constant tables
    pub tables: UnitTables,
    /// Functions in unit order
    pub functions: Vec<ResolvedFunction>,
}

/// Resolves the type names used in raw annotations.
pub struct TypeNames<'a> {
    resolver: TypeResolver<'a>,
    types: &'a ContextualTypes,
    ids: Option<&'a IdTable>,
    components: FxHashMap<String, ScopeId>,
    root: Option<ScopeId>,
}

impl<'a> TypeNames<'a> {
    /// Names from the contextual type table only.
    pub fn new(resolver: TypeResolver<'a>, types: &'a ContextualTypes) -> Self {
        Self {
            resolver,
            types,
            ids: None,
            components: FxHashMap::default(),
            root: None,
        }
    }

    /// Add the ids and components of a visited document.
    pub fn with_document(mut self, visit: &'a VisitResult, component_name: &str) -> Self {
        self.ids = Some(&visit.ids);
        self.root = Some(visit.root);
        self.components.insert(component_name.to_string(), visit.root);
        for (name, scope) in &visit.inline_components {
            self.components.insert(name.clone(), *scope);
        }
        self
    }

    /// Resolve a type name.
    pub fn resolve(&self, name: &str) -> Option<ScopeId> {
        if let Some(id) = name.strip_prefix('#') {
            return self.ids?.get(id);
        }
        if let Some(scope) = self.components.get(name) {
            return Some(*scope);
        }
        match self.types.lookup(name) {
            TypeLookup::Found(scope) => Some(scope),
            TypeLookup::FailedImport | TypeLookup::NotFound => None,
        }
    }

    fn require(&self, name: &str, offset: usize) -> Result<ScopeId, AnnotationError> {
        self.resolve(name).ok_or_else(|| AnnotationError::UnknownType {
            name: name.to_string(),
            offset,
        })
    }

    /// Resolve a raw register content.
    pub fn content(&self, raw: &RawContent, offset: usize) -> Result<RegisterContent, AnnotationError> {
        let r = &self.resolver;
        let stored = self.require(&raw.stored, offset)?;
        let unknown_member = |owner: &str, kind: &'static str, name: &str| AnnotationError::UnknownMember {
            owner: owner.to_string(),
            kind,
            name: name.to_string(),
            offset,
        };

        let mut content = match &raw.content {
            RawContentKind::Type { name } => {
                RegisterContent::of_type(stored, self.require(name, offset)?, ContentVariant::Unknown)
            }
            RawContentKind::Property { owner, name } => {
                let owner_id = self.require(owner, offset)?;
                r.member_type(&r.global_type(owner_id), name)
                    .filter(RegisterContent::is_property)
                    .or_else(|| r.scoped_type(owner_id, name).filter(RegisterContent::is_property))
                    .ok_or_else(|| unknown_member(owner, "property", name))?
            }
            RawContentKind::Enum {
                owner,
                name,
                member,
            } => {
                let owner_id = self.require(owner, offset)?;
                let (scope, enumeration) = r
                    .arena()
                    .enumeration(owner_id, name)
                    .ok_or_else(|| unknown_member(owner, "enum", name))?;
                if !member.is_empty() && !enumeration.has_key(member) {
                    return Err(unknown_member(owner, "enum", &format!("{}.{}", name, member)));
                }
                RegisterContent {
                    stored,
                    content: Content::Enumeration {
                        enumeration: enumeration.clone(),
                        member: member.clone(),
                    },
                    variant: ContentVariant::ObjectEnum,
                    scope: Some(scope),
                }
            }
            RawContentKind::Method { owner, name } => {
                let owner_id = self.require(owner, offset)?;
                let overloads = r.overload_chain(owner_id, name);
                if overloads.is_empty() {
                    return Err(unknown_member(owner, "method", name));
                }
                RegisterContent {
                    stored,
                    content: Content::Method {
                        name: name.clone(),
                        overloads,
                    },
                    variant: ContentVariant::ObjectMethod,
                    scope: Some(owner_id),
                }
            }
            RawContentKind::ImportNamespace { index } => RegisterContent {
                stored,
                content: Content::ImportNamespace(*index),
                variant: ContentVariant::ObjectModulePrefix,
                scope: None,
            },
            RawContentKind::Conversion { origins, result } => {
                let origins = origins
                    .iter()
                    .map(|origin| self.require(origin, offset))
                    .collect::<Result<Vec<_>, _>>()?;
                RegisterContent {
                    stored,
                    content: Content::Conversion {
                        origins,
                        result: self.require(result, offset)?,
                    },
                    variant: ContentVariant::Unknown,
                    scope: None,
                }
            }
        };

        content.stored = stored;
        if raw.variant != ContentVariant::Unknown {
            content.variant = raw.variant;
        }
        if let Some(scope) = &raw.scope {
            content.scope = Some(self.require(scope, offset)?);
        }
        Ok(content)
    }

    fn register_map(
        &self,
        raw: &BTreeMap<String, RawContent>,
        offset: usize,
    ) -> Result<BTreeMap<u32, RegisterContent>, AnnotationError> {
        raw.iter()
            .map(|(key, content)| Ok((register_index(key, offset)?, self.content(content, offset)?)))
            .collect()
    }

    /// Resolve a raw annotation of the instruction at `offset`.
    pub fn annotation(
        &self,
        raw: &RawAnnotation,
        offset: usize,
    ) -> Result<InstructionAnnotation, AnnotationError> {
        let changed_register = match &raw.changed {
            Some(changed) => Some((
                register_index(&changed.register, offset)?,
                self.content(&changed.content, offset)?,
            )),
            None => None,
        };
        Ok(InstructionAnnotation {
            registers: self.register_map(&raw.registers, offset)?,
            changed_register,
            expected_target_types_before_jump: self.register_map(&raw.jump_targets, offset)?,
        })
    }

    /// Resolve a raw function. `position` is its index in the unit.
    pub fn function(
        &self,
        raw: &RawFunction,
        position: usize,
        source_lines: &[String],
    ) -> Result<ResolvedFunction, AnnotationError> {
        let qml_scope = match &raw.scope {
            Some(scope) => self.require(scope, 0)?,
            None => self
                .root
                .unwrap_or(self.resolver.builtins().object),
        };
        let argument_types = raw
            .arguments
            .iter()
            .map(|name| self.require(name, 0))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = match &raw.return_type {
            Some(name) => Some(self.require(name, 0)?),
            None => None,
        };

        let mut annotations = Annotations::new();
        for (offset, annotation) in &raw.annotations {
            annotations.insert(*offset, self.annotation(annotation, *offset)?);
        }

        let mut instructions = raw.instructions.clone();
        instructions.sort_by_key(|instruction| instruction.offset);
        let mut line_mapping = raw.lines.clone();
        line_mapping.sort_by_key(|(offset, _)| *offset);

        Ok(ResolvedFunction {
            function: Function {
                name: raw.name.clone(),
                index: raw.index.unwrap_or(position),
                qml_scope,
                argument_types,
                return_type,
                instructions,
                source_lines: source_lines.to_vec(),
                line_mapping,
            },
            annotations,
        })
    }
}

impl RawUnit {
    /// Parse a unit from JSON.
    pub fn from_json(text: &str) -> Result<Self, AnnotationError> {
        serde_json::from_str(text).map_err(|source| AnnotationError::Json {
            what: "compilation unit",
            source,
        })
    }

    /// Resolve every function of the unit.
    pub fn resolve(self, names: &TypeNames<'_>) -> Result<ResolvedUnit, AnnotationError> {
        let source_lines: Vec<String> = self
            .source
            .as_deref()
            .map(|source| source.lines().map(str::to_string).collect())
            .unwrap_or_default();
        let functions = self
            .functions
            .iter()
            .enumerate()
            .map(|(position, raw)| names.function(raw, position, &source_lines))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedUnit {
            tables: self.tables,
            functions,
        })
    }
}

fn register_index(key: &str, offset: usize) -> Result<u32, AnnotationError> {
    if key == "acc" {
        return Ok(ACCUMULATOR);
    }
    key.parse().map_err(|_| AnnotationError::InvalidRegister {
        key: key.to_string(),
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlaot_scope::{AccessSemantics, BuiltinTypes, Property, ScopeArena};

    fn setup() -> (ScopeArena, ContextualTypes, BuiltinTypes, ScopeId) {
        let mut arena = ScopeArena::new();
        let mut types = ContextualTypes::new();
        let builtins = qmlaot_scope::builtins::install(&mut arena, &mut types);
        let item = arena.create_type("QQuickItem", AccessSemantics::Reference);
        arena[item].file_path = Some("qquickitem.h".into());
        let mut width = Property::new("width", "double");
        width.ty = Some(builtins.real);
        arena[item].insert_property(width);
        types.insert_type("Item", item, None);
        (arena, types, builtins, item)
    }

    #[test]
    fn test_resolve_property_content() {
        let (arena, types, builtins, item) = setup();
        let names = TypeNames::new(TypeResolver::new(&arena, &builtins), &types);
        let raw: RawContent = serde_json::from_str(
            r#"{"stored": "double", "kind": "property", "owner": "Item", "name": "width",
                "variant": "ScopeProperty"}"#,
        )
        .unwrap();
        let content = names.content(&raw, 4).unwrap();
        assert_eq!(content.stored, builtins.real);
        assert_eq!(content.variant, ContentVariant::ScopeProperty);
        assert_eq!(content.scope, Some(item));
        assert_eq!(content.property().map(|p| p.name.as_str()), Some("width"));
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let (arena, types, builtins, _) = setup();
        let names = TypeNames::new(TypeResolver::new(&arena, &builtins), &types);
        let raw: RawContent =
            serde_json::from_str(r#"{"stored": "Nope", "kind": "type", "name": "int"}"#).unwrap();
        assert!(matches!(
            names.content(&raw, 2),
            Err(AnnotationError::UnknownType { offset: 2, .. })
        ));

        let raw: RawContent = serde_json::from_str(
            r#"{"stored": "double", "kind": "property", "owner": "Item", "name": "height"}"#,
        )
        .unwrap();
        let error = names.content(&raw, 0).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Type 'Item' has no property 'height' (annotation at offset 0)"
        );
    }

    #[test]
    fn test_annotation_registers() {
        let (arena, types, builtins, _) = setup();
        let names = TypeNames::new(TypeResolver::new(&arena, &builtins), &types);
        let raw: RawAnnotation = serde_json::from_str(
            r#"{
                "registers": {"acc": {"stored": "int", "kind": "type", "name": "int"}},
                "changed": {"register": "7", "content": {"stored": "double", "kind": "type", "name": "double"}}
            }"#,
        )
        .unwrap();
        let annotation = names.annotation(&raw, 0).unwrap();
        assert_eq!(annotation.accumulator_in().map(|c| c.stored), Some(builtins.int));
        assert!(annotation.accumulator_out().is_none());
        assert_eq!(annotation.register(7).map(|c| c.stored), Some(builtins.real));
        assert_eq!(annotation.registers_after().len(), 2);

        let bad: RawAnnotation = serde_json::from_str(
            r#"{"registers": {"x": {"stored": "int", "kind": "type", "name": "int"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            names.annotation(&bad, 3),
            Err(AnnotationError::InvalidRegister { .. })
        ));
    }

    #[test]
    fn test_resolve_unit() {
        let (arena, types, builtins, _) = setup();
        let names = TypeNames::new(TypeResolver::new(&arena, &builtins), &types);
        let unit = RawUnit::from_json(
            r#"{
                "strings": [], "constants": [],
                "source": "Item {\n  width: 3\n}",
                "functions": [{
                    "name": "width", "return_type": "double",
                    "instructions": [{"offset": 2, "op": "Ret"}, {"offset": 0, "op": "LoadInt", "value": 3}],
                    "lines": [[0, 2]]
                }]
            }"#,
        )
        .unwrap()
        .resolve(&names)
        .unwrap();
        let function = &unit.functions[0].function;
        assert_eq!(function.return_type, Some(builtins.real));
        assert_eq!(function.qml_scope, builtins.object);
        assert_eq!(function.instructions[0].offset, 0);
        assert_eq!(function.source_lines.len(), 3);
    }
}
