//! The instruction stream the generator consumes.
//!
//! Instructions mirror the interpreter's bytecode. Register operands are
//! register indices, jump operands (the `jump` key) are relative to the
//! offset of the next instruction. Name, lookup and constant operands index into the
//! [`UnitTables`] shared by all functions of a compilation unit.

use serde::{Deserialize, Serialize};

use qmlaot_scope::ScopeId;

/// A bytecode instruction and its operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
#[allow(missing_docs)]
pub enum Op {
    // ===== Constants and registers =====
    Ret,
    Debug,
    LoadConst { index: u32 },
    LoadZero,
    LoadTrue,
    LoadFalse,
    LoadNull,
    LoadUndefined,
    LoadInt { value: i32 },
    MoveConst { index: u32, dest: u32 },
    LoadReg { reg: u32 },
    StoreReg { reg: u32 },
    MoveReg { src: u32, dest: u32 },
    LoadImport { index: u32 },
    LoadLocal { index: u32 },
    StoreLocal { index: u32 },
    LoadScopedLocal { scope: u32, index: u32 },
    StoreScopedLocal { scope: u32, index: u32 },
    LoadRuntimeString { string: u32 },
    MoveRegExp { regexp: u32, dest: u32 },
    LoadClosure { value: u32 },

    // ===== Names, properties and elements =====
    LoadName { name: u32 },
    LoadGlobalLookup { index: u32 },
    LoadQmlContextPropertyLookup { index: u32 },
    StoreNameSloppy { name: u32 },
    StoreNameStrict { name: u32 },
    LoadElement { base: u32 },
    StoreElement { base: u32, index: u32 },
    LoadProperty { name: u32 },
    LoadOptionalProperty { name: u32, #[serde(rename = "jump")] offset: i32 },
    GetLookup { index: u32 },
    GetOptionalLookup { index: u32, #[serde(rename = "jump")] offset: i32 },
    StoreProperty { name: u32, base: u32 },
    SetLookup { index: u32, base: u32 },
    LoadSuperProperty { property: u32 },
    StoreSuperProperty { property: u32 },

    // ===== Generators =====
    Yield,
    YieldStar,
    Resume { #[serde(rename = "jump")] offset: i32 },

    // ===== Calls =====
    CallValue { name: u32, argc: u32, argv: u32 },
    CallWithReceiver { name: u32, this_object: u32, argc: u32, argv: u32 },
    CallProperty { name: u32, base: u32, argc: u32, argv: u32 },
    CallPropertyLookup { index: u32, base: u32, argc: u32, argv: u32 },
    CallElement { base: u32, index: u32, argc: u32, argv: u32 },
    CallName { name: u32, argc: u32, argv: u32 },
    CallPossiblyDirectEval { argc: u32, argv: u32 },
    CallGlobalLookup { index: u32, argc: u32, argv: u32 },
    CallQmlContextPropertyLookup { index: u32, argc: u32, argv: u32 },
    CallWithSpread { func: u32, this_object: u32, argc: u32, argv: u32 },
    TailCall { func: u32, this_object: u32, argc: u32, argv: u32 },
    Construct { func: u32, argc: u32, argv: u32 },
    ConstructWithSpread { func: u32, argc: u32, argv: u32 },

    // ===== Exceptions and contexts =====
    SetUnwindHandler { #[serde(rename = "jump")] offset: i32 },
    UnwindDispatch,
    UnwindToLabel { level: u32, #[serde(rename = "jump")] offset: i32 },
    DeadTemporalZoneCheck { name: u32 },
    ThrowException,
    GetException,
    SetException,
    CreateCallContext,
    PushCatchContext { index: u32, name: u32 },
    PushWithContext,
    PushBlockContext { index: u32 },
    CloneBlockContext,
    PushScriptContext { index: u32 },
    PopScriptContext,
    PopContext,

    // ===== Iterators and object model =====
    GetIterator { iterator: u32 },
    IteratorNext { value: u32, done: u32 },
    IteratorNextForYieldStar { iterator: u32, object: u32 },
    IteratorClose { done: u32 },
    DestructureRestElement,
    DeleteProperty { base: u32, index: u32 },
    DeleteName { name: u32 },
    TypeofName { name: u32 },
    TypeofValue,
    DeclareVar { name: u32, is_deletable: bool },
    DefineArray { argc: u32, args: u32 },
    DefineObjectLiteral { internal_class: u32, argc: u32, args: u32 },
    CreateClass { class_index: u32, heritage: u32, computed_names: u32 },
    CreateMappedArgumentsObject,
    CreateUnmappedArgumentsObject,
    CreateRestParameter { arg_index: u32 },
    ConvertThisToObject,
    LoadSuperConstructor,
    ToObject,

    // ===== Control flow =====
    Jump {
        #[serde(rename = "jump")]
        offset: i32,
    },
    JumpTrue {
        #[serde(rename = "jump")]
        offset: i32,
    },
    JumpFalse {
        #[serde(rename = "jump")]
        offset: i32,
    },
    JumpNoException {
        #[serde(rename = "jump")]
        offset: i32,
    },
    JumpNotUndefined {
        #[serde(rename = "jump")]
        offset: i32,
    },
    CheckException,

    // ===== Comparisons =====
    CmpEqNull,
    CmpNeNull,
    CmpEqInt { lhs: i32 },
    CmpNeInt { lhs: i32 },
    CmpEq { lhs: u32 },
    CmpNe { lhs: u32 },
    CmpGt { lhs: u32 },
    CmpGe { lhs: u32 },
    CmpLt { lhs: u32 },
    CmpLe { lhs: u32 },
    CmpStrictEqual { lhs: u32 },
    CmpStrictNotEqual { lhs: u32 },
    CmpIn { lhs: u32 },
    CmpInstanceOf { lhs: u32 },
    As { lhs: u32 },

    // ===== Arithmetic =====
    UNot,
    UPlus,
    UMinus,
    UCompl,
    Increment,
    Decrement,
    Add { lhs: u32 },
    BitAnd { lhs: u32 },
    BitOr { lhs: u32 },
    BitXor { lhs: u32 },
    UShr { lhs: u32 },
    Shr { lhs: u32 },
    Shl { lhs: u32 },
    BitAndConst { rhs: i32 },
    BitOrConst { rhs: i32 },
    BitXorConst { rhs: i32 },
    UShrConst { rhs: i32 },
    ShrConst { rhs: i32 },
    ShlConst { rhs: i32 },
    Exp { lhs: u32 },
    Mul { lhs: u32 },
    Div { lhs: u32 },
    Mod { lhs: u32 },
    Sub { lhs: u32 },

    // ===== Misc =====
    InitializeBlockDeadTemporalZone { first_reg: u32, count: u32 },
    ThrowOnNullOrUndefined,
    GetTemplateObject { index: u32 },
}

impl Op {
    /// Bytecode name of the instruction.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Ret => "Ret",
            Op::Debug => "Debug",
            Op::LoadConst { .. } => "LoadConst",
            Op::LoadZero => "LoadZero",
            Op::LoadTrue => "LoadTrue",
            Op::LoadFalse => "LoadFalse",
            Op::LoadNull => "LoadNull",
            Op::LoadUndefined => "LoadUndefined",
            Op::LoadInt { .. } => "LoadInt",
            Op::MoveConst { .. } => "MoveConst",
            Op::LoadReg { .. } => "LoadReg",
            Op::StoreReg { .. } => "StoreReg",
            Op::MoveReg { .. } => "MoveReg",
            Op::LoadImport { .. } => "LoadImport",
            Op::LoadLocal { .. } => "LoadLocal",
            Op::StoreLocal { .. } => "StoreLocal",
            Op::LoadScopedLocal { .. } => "LoadScopedLocal",
            Op::StoreScopedLocal { .. } => "StoreScopedLocal",
            Op::LoadRuntimeString { .. } => "LoadRuntimeString",
            Op::MoveRegExp { .. } => "MoveRegExp",
            Op::LoadClosure { .. } => "LoadClosure",
            Op::LoadName { .. } => "LoadName",
            Op::LoadGlobalLookup { .. } => "LoadGlobalLookup",
            Op::LoadQmlContextPropertyLookup { .. } => "LoadQmlContextPropertyLookup",
            Op::StoreNameSloppy { .. } => "StoreNameSloppy",
            Op::StoreNameStrict { .. } => "StoreNameStrict",
            Op::LoadElement { .. } => "LoadElement",
            Op::StoreElement { .. } => "StoreElement",
            Op::LoadProperty { .. } => "LoadProperty",
            Op::LoadOptionalProperty { .. } => "LoadOptionalProperty",
            Op::GetLookup { .. } => "GetLookup",
            Op::GetOptionalLookup { .. } => "GetOptionalLookup",
            Op::StoreProperty { .. } => "StoreProperty",
            Op::SetLookup { .. } => "SetLookup",
            Op::LoadSuperProperty { .. } => "LoadSuperProperty",
            Op::StoreSuperProperty { .. } => "StoreSuperProperty",
            Op::Yield => "Yield",
            Op::YieldStar => "YieldStar",
            Op::Resume { .. } => "Resume",
            Op::CallValue { .. } => "CallValue",
            Op::CallWithReceiver { .. } => "CallWithReceiver",
            Op::CallProperty { .. } => "CallProperty",
            Op::CallPropertyLookup { .. } => "CallPropertyLookup",
            Op::CallElement { .. } => "CallElement",
            Op::CallName { .. } => "CallName",
            Op::CallPossiblyDirectEval { .. } => "CallPossiblyDirectEval",
            Op::CallGlobalLookup { .. } => "CallGlobalLookup",
            Op::CallQmlContextPropertyLookup { .. } => "CallQmlContextPropertyLookup",
            Op::CallWithSpread { .. } => "CallWithSpread",
            Op::TailCall { .. } => "TailCall",
            Op::Construct { .. } => "Construct",
            Op::ConstructWithSpread { .. } => "ConstructWithSpread",
            Op::SetUnwindHandler { .. } => "SetUnwindHandler",
            Op::UnwindDispatch => "UnwindDispatch",
            Op::UnwindToLabel { .. } => "UnwindToLabel",
            Op::DeadTemporalZoneCheck { .. } => "DeadTemporalZoneCheck",
            Op::ThrowException => "ThrowException",
            Op::GetException => "GetException",
            Op::SetException => "SetException",
            Op::CreateCallContext => "CreateCallContext",
            Op::PushCatchContext { .. } => "PushCatchContext",
            Op::PushWithContext => "PushWithContext",
            Op::PushBlockContext { .. } => "PushBlockContext",
            Op::CloneBlockContext => "CloneBlockContext",
            Op::PushScriptContext { .. } => "PushScriptContext",
            Op::PopScriptContext => "PopScriptContext",
            Op::PopContext => "PopContext",
            Op::GetIterator { .. } => "GetIterator",
            Op::IteratorNext { .. } => "IteratorNext",
            Op::IteratorNextForYieldStar { .. } => "IteratorNextForYieldStar",
            Op::IteratorClose { .. } => "IteratorClose",
            Op::DestructureRestElement => "DestructureRestElement",
            Op::DeleteProperty { .. } => "DeleteProperty",
            Op::DeleteName { .. } => "DeleteName",
            Op::TypeofName { .. } => "TypeofName",
            Op::TypeofValue => "TypeofValue",
            Op::DeclareVar { .. } => "DeclareVar",
            Op::DefineArray { .. } => "DefineArray",
            Op::DefineObjectLiteral { .. } => "DefineObjectLiteral",
            Op::CreateClass { .. } => "CreateClass",
            Op::CreateMappedArgumentsObject => "CreateMappedArgumentsObject",
            Op::CreateUnmappedArgumentsObject => "CreateUnmappedArgumentsObject",
            Op::CreateRestParameter { .. } => "CreateRestParameter",
            Op::ConvertThisToObject => "ConvertThisToObject",
            Op::LoadSuperConstructor => "LoadSuperConstructor",
            Op::ToObject => "ToObject",
            Op::Jump { .. } => "Jump",
            Op::JumpTrue { .. } => "JumpTrue",
            Op::JumpFalse { .. } => "JumpFalse",
            Op::JumpNoException { .. } => "JumpNoException",
            Op::JumpNotUndefined { .. } => "JumpNotUndefined",
            Op::CheckException => "CheckException",
            Op::CmpEqNull => "CmpEqNull",
            Op::CmpNeNull => "CmpNeNull",
            Op::CmpEqInt { .. } => "CmpEqInt",
            Op::CmpNeInt { .. } => "CmpNeInt",
            Op::CmpEq { .. } => "CmpEq",
            Op::CmpNe { .. } => "CmpNe",
            Op::CmpGt { .. } => "CmpGt",
            Op::CmpGe { .. } => "CmpGe",
            Op::CmpLt { .. } => "CmpLt",
            Op::CmpLe { .. } => "CmpLe",
            Op::CmpStrictEqual { .. } => "CmpStrictEqual",
            Op::CmpStrictNotEqual { .. } => "CmpStrictNotEqual",
            Op::CmpIn { .. } => "CmpIn",
            Op::CmpInstanceOf { .. } => "CmpInstanceOf",
            Op::As { .. } => "As",
            Op::UNot => "UNot",
            Op::UPlus => "UPlus",
            Op::UMinus => "UMinus",
            Op::UCompl => "UCompl",
            Op::Increment => "Increment",
            Op::Decrement => "Decrement",
            Op::Add { .. } => "Add",
            Op::BitAnd { .. } => "BitAnd",
            Op::BitOr { .. } => "BitOr",
            Op::BitXor { .. } => "BitXor",
            Op::UShr { .. } => "UShr",
            Op::Shr { .. } => "Shr",
            Op::Shl { .. } => "Shl",
            Op::BitAndConst { .. } => "BitAndConst",
            Op::BitOrConst { .. } => "BitOrConst",
            Op::BitXorConst { .. } => "BitXorConst",
            Op::UShrConst { .. } => "UShrConst",
            Op::ShrConst { .. } => "ShrConst",
            Op::ShlConst { .. } => "ShlConst",
            Op::Exp { .. } => "Exp",
            Op::Mul { .. } => "Mul",
            Op::Div { .. } => "Div",
            Op::Mod { .. } => "Mod",
            Op::Sub { .. } => "Sub",
            Op::InitializeBlockDeadTemporalZone { .. } => "InitializeBlockDeadTemporalZone",
            Op::ThrowOnNullOrUndefined => "ThrowOnNullOrUndefined",
            Op::GetTemplateObject { .. } => "GetTemplateObject",
        }
    }

    /// Whether the instruction opens or closes an execution context.
    ///
    /// Those are still generated after an unconditional jump or return so
    /// that the braces they emit stay balanced.
    pub fn manipulates_context(&self) -> bool {
        matches!(
            self,
            Op::PopContext
                | Op::PopScriptContext
                | Op::CreateCallContext
                | Op::PushCatchContext { .. }
                | Op::PushWithContext
                | Op::PushBlockContext { .. }
                | Op::CloneBlockContext
                | Op::PushScriptContext { .. }
        )
    }

    /// Relative target of a jump instruction.
    pub fn jump_offset(&self) -> Option<i32> {
        match self {
            Op::Jump { offset }
            | Op::JumpTrue { offset }
            | Op::JumpFalse { offset }
            | Op::JumpNoException { offset }
            | Op::JumpNotUndefined { offset } => Some(*offset),
            _ => None,
        }
    }
}

/// An instruction at a bytecode offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Bytecode offset
    pub offset: usize,
    /// The instruction
    #[serde(flatten)]
    pub op: Op,
}

impl Instruction {
    /// Create an instruction.
    pub fn new(offset: usize, op: Op) -> Self {
        Self { offset, op }
    }
}

/// A constant of the compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    /// `null`
    Null,
    /// A boolean
    Bool(bool),
    /// An integer
    Int(i32),
    /// Any other number
    Number(f64),
}

impl Constant {
    /// Numeric value; `null` has none.
    pub fn as_number(self) -> Option<f64> {
        match self {
            Constant::Null => None,
            Constant::Bool(value) => Some(if value { 1.0 } else { 0.0 }),
            Constant::Int(value) => Some(f64::from(value)),
            Constant::Number(value) => Some(value),
        }
    }
}

/// Tables shared by every function of a compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitTables {
    /// String table
    #[serde(default)]
    pub strings: Vec<String>,
    /// Lookup index → index of the looked up name in `strings`
    #[serde(default)]
    pub lookups: Vec<u32>,
    /// Constant table
    #[serde(default)]
    pub constants: Vec<Constant>,
}

impl UnitTables {
    /// String at `index`.
    pub fn string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// String table index of the name lookup `index` resolves.
    pub fn lookup_name_index(&self, index: u32) -> Option<u32> {
        self.lookups.get(index as usize).copied()
    }

    /// Name lookup `index` resolves.
    pub fn lookup_name(&self, index: u32) -> Option<&str> {
        self.lookup_name_index(index).and_then(|name| self.string(name))
    }

    /// Constant at `index`.
    pub fn constant(&self, index: u32) -> Option<Constant> {
        self.constants.get(index as usize).copied()
    }
}

/// One function to compile.
#[derive(Debug, Clone)]
pub struct Function {
    /// Name, for diagnostics
    pub name: String,
    /// Index of the function in the compilation unit
    pub index: usize,
    /// The QML object the function runs in
    pub qml_scope: ScopeId,
    /// Argument types
    pub argument_types: Vec<ScopeId>,
    /// Return type; `None` for functions whose result is discarded
    pub return_type: Option<ScopeId>,
    /// The instruction stream, ordered by offset
    pub instructions: Vec<Instruction>,
    /// Source text, one entry per line
    pub source_lines: Vec<String>,
    /// (offset, line) pairs ordered by offset; lines are 1-based
    pub line_mapping: Vec<(usize, u32)>,
}

impl Function {
    /// Source line the instruction at `offset` belongs to.
    pub fn line_for_offset(&self, offset: usize) -> Option<u32> {
        self.line_mapping
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map(|(_, line)| *line)
    }

    /// First mapped line after `line`.
    pub fn next_line(&self, line: u32) -> Option<u32> {
        self.line_mapping
            .iter()
            .map(|(_, mapped)| *mapped)
            .find(|mapped| *mapped > line)
    }

    /// Offset of the instruction following the one at `position`.
    pub fn next_offset(&self, position: usize) -> usize {
        match self.instructions.get(position + 1) {
            Some(next) => next.offset,
            None => self
                .instructions
                .get(position)
                .map_or(0, |current| current.offset + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_tagged_instructions() {
        let json = r#"[
            {"offset": 0, "op": "LoadInt", "value": 5},
            {"offset": 2, "op": "StoreReg", "reg": 7},
            {"offset": 4, "op": "Ret"}
        ]"#;
        let instructions: Vec<Instruction> = serde_json::from_str(json).unwrap();
        assert_eq!(instructions[0].op, Op::LoadInt { value: 5 });
        assert_eq!(instructions[1].op, Op::StoreReg { reg: 7 });
        assert_eq!(instructions[2].offset, 4);
        assert_eq!(instructions[2].op.name(), "Ret");
    }

    #[test]
    fn test_context_instructions() {
        assert!(Op::PopContext.manipulates_context());
        assert!(Op::PushBlockContext { index: 0 }.manipulates_context());
        assert!(!Op::Ret.manipulates_context());
        assert_eq!(Op::JumpFalse { offset: -4 }.jump_offset(), Some(-4));
        assert_eq!(Op::CheckException.jump_offset(), None);
    }

    #[test]
    fn test_constants_from_json() {
        let tables: UnitTables = serde_json::from_str(
            r#"{"strings": ["width"], "lookups": [0], "constants": [null, true, 3, 2.5]}"#,
        )
        .unwrap();
        assert_eq!(tables.lookup_name(0), Some("width"));
        assert_eq!(tables.constant(0), Some(Constant::Null));
        assert_eq!(tables.constant(1), Some(Constant::Bool(true)));
        assert_eq!(tables.constant(2), Some(Constant::Int(3)));
        assert_eq!(tables.constant(3).and_then(Constant::as_number), Some(2.5));
        assert_eq!(tables.lookup_name(1), None);
    }

    #[test]
    fn test_line_mapping() {
        let function = Function {
            name: "f".into(),
            index: 0,
            qml_scope: qmlaot_scope::ScopeArena::new().create_type("Root", Default::default()),
            argument_types: Vec::new(),
            return_type: None,
            instructions: vec![Instruction::new(0, Op::LoadZero), Instruction::new(3, Op::Ret)],
            source_lines: Vec::new(),
            line_mapping: vec![(0, 4), (3, 6)],
        };
        assert_eq!(function.line_for_offset(0), Some(4));
        assert_eq!(function.line_for_offset(2), Some(4));
        assert_eq!(function.line_for_offset(3), Some(6));
        assert_eq!(function.next_line(4), Some(6));
        assert_eq!(function.next_line(6), None);
        assert_eq!(function.next_offset(0), 3);
        assert_eq!(function.next_offset(1), 4);
    }
}
