//! Builders for modules and method code.
//!
//! [`ModuleBuilder`] owns the class descriptor tables for one compile
//! session: class ids in declaration order, the string constant pool, and
//! the entry-point registration. Method descriptors are defined with empty
//! bodies first so that forward references and mutual recursion resolve;
//! code is attached afterwards.
//!
//! [`MethodAssembler`] writes one method's instruction stream, with local
//! slot allocation and label back-patching for the branch instructions.

use crate::error::{EmitError, EmitResult};
use olang_bytecode::{ClassDef, ClassId, EntryPoint, FieldDef, MethodDef, Module, Opcode};
use rustc_hash::FxHashMap;

/// Module under construction.
pub struct ModuleBuilder {
    name: String,
    classes: Vec<ClassDef>,
    class_ids: FxHashMap<String, ClassId>,
    constants: Vec<String>,
    constant_map: FxHashMap<String, u32>,
    entry: Option<EntryPoint>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            class_ids: FxHashMap::default(),
            constants: Vec::new(),
            constant_map: FxHashMap::default(),
            entry: None,
        }
    }

    /// Create a class descriptor, returning its id. Base links are patched
    /// separately so that a class may extend one declared after it.
    pub fn declare_class(&mut self, name: impl Into<String>) -> ClassId {
        let name = name.into();
        let id = self.classes.len() as ClassId;
        self.classes.push(ClassDef::new(name.clone(), None));
        self.class_ids.insert(name, id);
        id
    }

    pub fn set_base(&mut self, class: ClassId, base: ClassId) {
        self.classes[class as usize].base = Some(base);
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_ids.get(name).copied()
    }

    pub fn add_field(&mut self, class: ClassId, field: FieldDef) {
        self.classes[class as usize].fields.push(field);
    }

    /// Define a constructor descriptor, returning its index.
    pub fn add_ctor(&mut self, class: ClassId, ctor: MethodDef) -> u16 {
        let defs = &mut self.classes[class as usize].ctors;
        defs.push(ctor);
        (defs.len() - 1) as u16
    }

    /// Define a method descriptor (body deferred), returning its index.
    pub fn add_method(&mut self, class: ClassId, method: MethodDef) -> u16 {
        let defs = &mut self.classes[class as usize].methods;
        defs.push(method);
        (defs.len() - 1) as u16
    }

    /// Attach a method body emitted after descriptor definition.
    pub fn set_method_code(&mut self, class: ClassId, index: u16, code: Vec<u8>, locals: u16) {
        let method = &mut self.classes[class as usize].methods[index as usize];
        method.code = code;
        method.local_count = locals;
    }

    /// Intern a string constant, returning its pool index.
    pub fn add_string(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.constant_map.get(value) {
            return index;
        }
        let index = self.constants.len() as u32;
        self.constant_map.insert(value.to_string(), index);
        self.constants.push(value.to_string());
        index
    }

    pub fn set_entry(&mut self, class: ClassId, method: u16) {
        self.entry = Some(EntryPoint { class, method });
    }

    /// Verify that every declared method received a body.
    ///
    /// A forward declaration that was never defined surfaces here, after
    /// all bodies and the entry synthesis are in place.
    pub fn finalize(&self) -> EmitResult<()> {
        for class in &self.classes {
            for method in &class.methods {
                if method.code.is_empty() {
                    return Err(EmitError::MissingBody {
                        name: format!("{}.{}", class.name, method.name),
                    });
                }
            }
        }
        Ok(())
    }

    /// Build the final module.
    pub fn build(self) -> Module {
        let mut module = Module::new(self.name);
        module.classes = self.classes;
        module.constants = self.constants;
        module.entry = self.entry;
        module
    }
}

/// Writer for one method's instruction stream.
pub struct MethodAssembler {
    code: Vec<u8>,
    next_local: u16,
}

impl MethodAssembler {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            next_local: 0,
        }
    }

    /// Allocate a fresh local slot.
    pub fn alloc_local(&mut self) -> EmitResult<u16> {
        if self.next_local == u16::MAX {
            return Err(EmitError::TooManyLocals);
        }
        let slot = self.next_local;
        self.next_local += 1;
        Ok(slot)
    }

    pub fn local_count(&self) -> u16 {
        self.next_local
    }

    /// Current code position, used as a backward jump target.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, opcode: Opcode) {
        self.code.push(opcode.to_u8());
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn emit_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_i64(&mut self, value: i64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f64(&mut self, value: f64) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_const_i64(&mut self, value: i64) {
        self.emit(Opcode::ConstI64);
        self.emit_i64(value);
    }

    pub fn emit_const_f64(&mut self, value: f64) {
        self.emit(Opcode::ConstF64);
        self.emit_f64(value);
    }

    pub fn emit_load_arg(&mut self, index: u16) {
        self.emit(Opcode::LoadArg);
        self.emit_u16(index);
    }

    pub fn emit_store_arg(&mut self, index: u16) {
        self.emit(Opcode::StoreArg);
        self.emit_u16(index);
    }

    pub fn emit_load_local(&mut self, slot: u16) {
        self.emit(Opcode::LoadLocal);
        self.emit_u16(slot);
    }

    pub fn emit_store_local(&mut self, slot: u16) {
        self.emit(Opcode::StoreLocal);
        self.emit_u16(slot);
    }

    pub fn emit_load_field(&mut self, offset: u16) {
        self.emit(Opcode::LoadField);
        self.emit_u16(offset);
    }

    pub fn emit_store_field(&mut self, offset: u16) {
        self.emit(Opcode::StoreField);
        self.emit_u16(offset);
    }

    /// Emit a call-family instruction with its (class, slot) operands.
    pub fn emit_call(&mut self, opcode: Opcode, class: ClassId, slot: u16) {
        self.emit(opcode);
        self.emit_u32(class);
        self.emit_u16(slot);
    }

    /// Emit a forward jump with a placeholder offset; returns the patch
    /// position to hand to [`Self::patch_jump`].
    pub fn emit_forward_jump(&mut self, opcode: Opcode) -> usize {
        self.emit(opcode);
        let at = self.code.len();
        self.emit_u32(0);
        at
    }

    /// Patch a forward jump to land at the current position. Offsets are
    /// relative to the end of the jump instruction.
    pub fn patch_jump(&mut self, at: usize) {
        let offset = (self.code.len() as i64 - (at as i64 + 4)) as i32;
        self.code[at..at + 4].copy_from_slice(&offset.to_le_bytes());
    }

    /// Emit a backward jump to an already-known target position.
    pub fn emit_backward_jump(&mut self, opcode: Opcode, target: usize) {
        self.emit(opcode);
        let after = self.code.len() as i64 + 4;
        let offset = (target as i64 - after) as i32;
        self.code.extend_from_slice(&offset.to_le_bytes());
    }

    /// Whether the stream currently ends with a return instruction.
    pub fn ends_with_return(&self) -> bool {
        matches!(
            self.code.last().copied(),
            Some(b) if b == Opcode::Return.to_u8() || b == Opcode::ReturnVoid.to_u8()
        )
    }

    pub fn finish(self) -> (Vec<u8>, u16) {
        (self.code, self.next_local)
    }
}

impl Default for MethodAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olang_bytecode::StorageType;

    #[test]
    fn test_declare_and_look_up_classes() {
        let mut builder = ModuleBuilder::new("m");
        let a = builder.declare_class("A");
        let b = builder.declare_class("B");
        builder.set_base(b, a);

        assert_eq!(builder.class_id("A"), Some(0));
        assert_eq!(builder.class_id("B"), Some(1));
        assert_eq!(builder.class_id("C"), None);

        let module = builder.build();
        assert_eq!(module.classes[1].base, Some(0));
    }

    #[test]
    fn test_string_pool_interns() {
        let mut builder = ModuleBuilder::new("m");
        let a = builder.add_string("hello");
        let b = builder.add_string("world");
        let c = builder.add_string("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(builder.build().constants, vec!["hello", "world"]);
    }

    #[test]
    fn test_deferred_method_bodies() {
        let mut builder = ModuleBuilder::new("m");
        let class = builder.declare_class("A");
        let index = builder.add_method(
            class,
            MethodDef {
                name: "f".to_string(),
                params: vec![],
                ret: StorageType::Void,
                is_static: false,
                vslot: 0,
                local_count: 0,
                code: vec![],
            },
        );

        assert!(matches!(
            builder.finalize(),
            Err(EmitError::MissingBody { .. })
        ));

        builder.set_method_code(class, index, vec![Opcode::ReturnVoid.to_u8()], 0);
        assert!(builder.finalize().is_ok());
    }

    #[test]
    fn test_forward_jump_patching() {
        let mut asm = MethodAssembler::new();
        let patch = asm.emit_forward_jump(Opcode::BranchFalse);
        asm.emit(Opcode::Nop);
        asm.emit(Opcode::Nop);
        asm.patch_jump(patch);

        let (code, _) = asm.finish();
        // offset covers the two nops
        let offset = i32::from_le_bytes([code[1], code[2], code[3], code[4]]);
        assert_eq!(offset, 2);
    }

    #[test]
    fn test_backward_jump_offset() {
        let mut asm = MethodAssembler::new();
        let start = asm.position();
        asm.emit(Opcode::Nop);
        asm.emit_backward_jump(Opcode::Jump, start);

        let (code, _) = asm.finish();
        let offset = i32::from_le_bytes([code[2], code[3], code[4], code[5]]);
        // jumps back over the nop, the opcode, and its own operand
        assert_eq!(offset, -6);
    }

    #[test]
    fn test_local_allocation() {
        let mut asm = MethodAssembler::new();
        assert_eq!(asm.alloc_local().unwrap(), 0);
        assert_eq!(asm.alloc_local().unwrap(), 1);
        assert_eq!(asm.local_count(), 2);
    }
}
