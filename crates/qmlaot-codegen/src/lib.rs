//! QML ahead-of-time code generator
//!
//! Lowers the bytecode of QML bindings and functions to native code, using
//! the register types inferred by a preceding type propagation pass.
//!
//! This crate provides:
//! - Register contents and the type queries the lowering needs
//! - The conversion matrix between native representations
//! - Method overload resolution
//! - Per-instruction lowering with runtime lookups as fallback
//! - Inlined `Math`, `console` and `string.arg()` calls
//! - Dead-store elimination on the generated code
//! - The compilation unit emitter
//!
//! # Usage
//!
//! ```ignore
//! use qmlaot_codegen::{compile_unit, emit_compilation_unit, GeneratorOptions, RawUnit, TypeNames, TypeResolver};
//!
//! let resolver = TypeResolver::new(&arena, &builtins);
//! let unit = RawUnit::from_json(&json)?.resolve(&TypeNames::new(resolver, &types))?;
//! let output = compile_unit(resolver, &unit, GeneratorOptions::default());
//! for rejected in &output.rejected {
//!     eprintln!("{}: {}", rejected.function, rejected.rejection);
//! }
//! let source = emit_compilation_unit("Main.qml", &output.compiled);
//! ```

#![warn(missing_docs)]

pub mod annotation;
pub mod conversion;
pub mod dse;
pub mod error;
pub mod generator;
pub mod instruction;
pub mod intrinsics;
pub mod literal;
pub mod overload;
pub mod register;
pub mod resolver;
pub mod section;
pub mod unit;

// Re-export main types
pub use annotation::{Annotations, InstructionAnnotation, RawUnit, ResolvedFunction, ResolvedUnit, TypeNames};
pub use error::{AnnotationError, RejectedFunction, Rejection};
pub use generator::{generate_function, AotFunction, Generator, GeneratorOptions};
pub use instruction::{Constant, Function, Instruction, Op, UnitTables};
pub use register::{Content, ContentVariant, PropertyContent, RegisterContent};
pub use resolver::TypeResolver;
pub use unit::{compile_unit, emit_compilation_unit, CompiledFunction, UnitOutput};
