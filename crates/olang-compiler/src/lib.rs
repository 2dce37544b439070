//! Code generation for the O compiler.
//!
//! This crate lowers the validated (and usually optimised) AST onto the
//! stack machine defined by `olang-bytecode`.
//!
//! # Architecture
//!
//! The compilation pipeline is:
//! 1. AST + ProgramInfo (from `olang-parser`) -> class descriptors
//! 2. constructors and method bodies -> instruction streams
//! 3. entry synthesis -> the module's static `Main`
//!
//! The emitter holds exclusive ownership of the mutable class, method, and
//! constructor descriptor tables for the duration of one compile; nothing
//! crosses compiles.

pub mod context;
pub mod emit;
pub mod entry;
pub mod error;
pub mod module_builder;

pub use context::{resolve_storage, type_tag, BuildContext, FieldRef, MethodRef};
pub use emit::Emitter;
pub use error::{EmitError, EmitResult};
pub use module_builder::{MethodAssembler, ModuleBuilder};

use olang_bytecode::Module;
use olang_parser::ast::Program;
use olang_parser::checker::ProgramInfo;

/// Options for one compile session.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Module name, usually the source basename
    pub module_name: String,
    /// Entry class; the first declared class when absent
    pub start_class: Option<String>,
}

/// A successfully emitted module plus non-fatal emitter diagnostics.
#[derive(Debug)]
pub struct CompileOutput {
    pub module: Module,
    pub warnings: Vec<String>,
}

/// Compile a checked program into a module.
///
/// `info` must come from analysing exactly this `program`; when the
/// optimise pass ran in between, re-analyse so the registry matches the
/// rewritten AST.
pub fn compile(
    program: &Program,
    info: &ProgramInfo,
    options: &CompileOptions,
) -> EmitResult<CompileOutput> {
    let emitter = Emitter::new(info, &options.module_name);
    let (module, warnings) = emitter.emit_program(program, options)?;
    Ok(CompileOutput { module, warnings })
}
