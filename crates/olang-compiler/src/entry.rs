//! Entry synthesis.
//!
//! A synthetic static class hosts the zero-argument entry point: it
//! constructs the designated start class and invokes `main` (or `run`),
//! discarding any result, then returns a zero exit status.

use crate::context::{resolve_storage, BuildContext};
use crate::emit::Emitter;
use crate::error::{EmitError, EmitResult};
use crate::module_builder::MethodAssembler;
use crate::CompileOptions;
use olang_bytecode::{MethodDef, Opcode, StorageType};

/// Name of the synthetic entry class; `$` keeps it out of the source
/// namespace.
pub const ENTRY_CLASS: &str = "$Entry";

/// Name of the entry method registered as the module's entry point.
pub const ENTRY_METHOD: &str = "Main";

pub(crate) fn synthesize_entry(
    emitter: &mut Emitter,
    options: &CompileOptions,
) -> EmitResult<()> {
    let start = match &options.start_class {
        Some(name) => {
            if emitter.info.class(name).is_none() {
                return Err(EmitError::UnknownStartClass { name: name.clone() });
            }
            Some(name.clone())
        }
        None => emitter.info.order.first().cloned(),
    };

    let mut asm = MethodAssembler::new();

    match start {
        Some(start_name) => emit_start_invocation(emitter, &start_name, &mut asm)?,
        None => emitter
            .warnings
            .push("program declares no classes; entry exits with status 0".to_string()),
    }

    asm.emit_const_i64(0);
    asm.emit(Opcode::Return);
    let (code, locals) = asm.finish();

    let entry_id = emitter.builder.declare_class(ENTRY_CLASS);
    let method = emitter.builder.add_method(
        entry_id,
        MethodDef {
            name: ENTRY_METHOD.to_string(),
            params: vec![],
            ret: StorageType::I64,
            is_static: true,
            vslot: 0,
            local_count: locals,
            code,
        },
    );
    emitter.builder.set_entry(entry_id, method);
    Ok(())
}

fn emit_start_invocation(
    emitter: &mut Emitter,
    start_name: &str,
    asm: &mut MethodAssembler,
) -> EmitResult<()> {
    let class_id = emitter
        .builder
        .class_id(start_name)
        .ok_or_else(|| EmitError::UnknownStartClass {
            name: start_name.to_string(),
        })?;
    let start_info = emitter
        .info
        .class(start_name)
        .expect("start class checked by the caller");

    // A zero-argument constructor when one exists (declared, or the
    // synthesised default), else the cheapest one with synthesised default
    // values for each parameter.
    let (ctor_index, ctor_params) = if start_info.ctors.is_empty() {
        (0u16, Vec::new())
    } else if let Some(index) = start_info.ctors.iter().position(|c| c.params.is_empty()) {
        (index as u16, Vec::new())
    } else {
        let (index, ctor) = start_info
            .ctors
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.params.len(), *i))
            .expect("constructor list is non-empty");
        (index as u16, ctor.params.clone())
    };

    for param in &ctor_params {
        emitter.emit_default(resolve_storage(param), asm);
    }
    asm.emit_call(Opcode::NewObject, class_id, ctor_index);

    // `main` first, `run` as the fallback, both zero-argument.
    let ctx = BuildContext::new(emitter.info, ENTRY_CLASS);
    let main = ctx
        .find_method(start_name, "main", &[])
        .or_else(|| ctx.find_method(start_name, "run", &[]));

    match main {
        Some(method) => {
            let owner_id = emitter.builder.class_id(&method.owner).ok_or_else(|| {
                EmitError::UnknownClass {
                    name: method.owner.clone(),
                }
            })?;
            let name = if ctx.find_method(start_name, "main", &[]).is_some() {
                "main"
            } else {
                "run"
            };
            let slot = emitter.vslot(&method.owner, name, &method.params);
            asm.emit_call(Opcode::CallVirt, owner_id, slot);
            if method.ret.is_some() {
                asm.emit(Opcode::Pop);
            }
        }
        None => {
            asm.emit(Opcode::Pop);
            emitter.warnings.push(format!(
                "start class `{}` has no zero-argument `main` or `run`; entry exits with status 0",
                start_name
            ));
        }
    }
    Ok(())
}
