//! Code generation: one pass over the AST per class.
//!
//! Order within a class: (a) class descriptor with its base; (b) field
//! descriptors; (c) method descriptors with signatures, bodies deferred so
//! forward references and mutual recursion resolve; (d) constructors, with
//! a parameterless default synthesised when none is declared; (e) method
//! bodies; (f) finalisation (after the entry synthesis is in place).

mod expr;
mod stmt;

use crate::context::{resolve_storage, BuildContext};
use crate::entry;
use crate::error::{EmitError, EmitResult};
use crate::module_builder::{MethodAssembler, ModuleBuilder};
use crate::CompileOptions;
use olang_bytecode::{FieldDef, MethodDef, Opcode, StorageType};
use olang_parser::ast::*;
use olang_parser::checker::ProgramInfo;
use rustc_hash::FxHashMap;

/// Key of a method signature within a class: name plus canonical parameter
/// type names.
pub(crate) type MethodKey = (String, Vec<String>);

/// The AST walker producing stack-machine code.
pub struct Emitter<'a> {
    pub(crate) info: &'a ProgramInfo,
    pub(crate) builder: ModuleBuilder,
    /// Per class: signature -> virtual dispatch slot. A method overrides
    /// when an ancestor carries the same signature; otherwise it occupies
    /// a fresh slot.
    vslots: FxHashMap<String, FxHashMap<MethodKey, u16>>,
    pub(crate) warnings: Vec<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(info: &'a ProgramInfo, module_name: &str) -> Self {
        let vslots = compute_vslots(info);
        Self {
            info,
            builder: ModuleBuilder::new(module_name),
            vslots,
            warnings: Vec::new(),
        }
    }

    /// Virtual slot of a signature as seen from `class`.
    pub(crate) fn vslot(&self, class: &str, name: &str, params: &[String]) -> u16 {
        self.vslots
            .get(class)
            .and_then(|m| m.get(&(name.to_string(), params.to_vec())))
            .copied()
            .unwrap_or(0)
    }

    /// Emit the whole program plus the synthetic entry class.
    pub fn emit_program(
        mut self,
        program: &Program,
        options: &CompileOptions,
    ) -> EmitResult<(olang_bytecode::Module, Vec<String>)> {
        // Class ids are assigned up front so forward references resolve.
        for class in &program.classes {
            self.builder.declare_class(&class.name.name);
        }
        for class in &program.classes {
            if let Some(base) = &class.base {
                if let Some(base_id) = self.builder.class_id(&base.name) {
                    let id = self
                        .builder
                        .class_id(&class.name.name)
                        .expect("class was declared above");
                    self.builder.set_base(id, base_id);
                }
            }
        }

        for class in &program.classes {
            self.emit_class(class)?;
        }

        entry::synthesize_entry(&mut self, options)?;

        self.builder.finalize()?;
        Ok((self.builder.build(), self.warnings))
    }

    fn emit_class(&mut self, class: &ClassDecl) -> EmitResult<()> {
        let class_name = class.name.name.clone();
        let class_id = self
            .builder
            .class_id(&class_name)
            .ok_or_else(|| EmitError::UnknownClass {
                name: class_name.clone(),
            })?;
        let class_info = self
            .info
            .class(&class_name)
            .ok_or_else(|| EmitError::UnknownClass {
                name: class_name.clone(),
            })?
            .clone();

        // (b) field descriptors
        for field in &class_info.fields {
            self.builder.add_field(
                class_id,
                FieldDef {
                    name: field.name.clone(),
                    ty: resolve_storage(&field.ty),
                },
            );
        }

        // (c) method descriptors, bodies deferred
        for method in &class_info.methods {
            self.builder.add_method(
                class_id,
                MethodDef {
                    name: method.name.clone(),
                    params: method.params.iter().map(|p| resolve_storage(p)).collect(),
                    ret: method
                        .ret
                        .as_deref()
                        .map(resolve_storage)
                        .unwrap_or(StorageType::Void),
                    is_static: false,
                    vslot: self.vslot(&class_name, &method.name, &method.params),
                    local_count: 0,
                    code: Vec::new(),
                },
            );
        }

        // (d) constructors; a parameterless default when none is declared
        let ctors: Vec<&ConstructorDecl> = class.constructors().collect();
        if ctors.is_empty() {
            let (code, locals) = self.emit_ctor(class, &[], None)?;
            self.builder.add_ctor(
                class_id,
                MethodDef {
                    name: ".ctor".to_string(),
                    params: vec![],
                    ret: StorageType::Void,
                    is_static: false,
                    vslot: 0,
                    local_count: locals,
                    code,
                },
            );
        } else {
            for ctor in ctors {
                let (code, locals) = self.emit_ctor(class, &ctor.params, Some(&ctor.body))?;
                self.builder.add_ctor(
                    class_id,
                    MethodDef {
                        name: ".ctor".to_string(),
                        params: ctor
                            .params
                            .iter()
                            .map(|p| resolve_storage(&p.type_name.name))
                            .collect(),
                        ret: StorageType::Void,
                        is_static: false,
                        vslot: 0,
                        local_count: locals,
                        code,
                    },
                );
            }
        }

        // (e) method bodies
        for (index, method) in class_info.methods.iter().enumerate() {
            let Some(decl) = find_method_decl(class, &method.name, &method.params) else {
                continue;
            };
            if matches!(decl.body, MethodBody::Forward) {
                // Declared forward and never defined; finalisation reports it.
                continue;
            }
            let (code, locals) = self.emit_method_body(class, method, decl)?;
            self.builder
                .set_method_code(class_id, index as u16, code, locals);
        }

        Ok(())
    }

    /// Emit one constructor following the construction protocol: load the
    /// receiver, call the base constructor, store each declared field's
    /// initialiser in source order, run the user body, return.
    fn emit_ctor(
        &mut self,
        class: &ClassDecl,
        params: &[Parameter],
        body: Option<&Block>,
    ) -> EmitResult<(Vec<u8>, u16)> {
        let class_name = class.name.name.clone();
        let mut asm = MethodAssembler::new();
        let mut ctx = BuildContext::new(self.info, class_name.clone());
        for (i, param) in params.iter().enumerate() {
            ctx.define_parameter(&param.name.name, (i + 1) as u16, &param.type_name.name);
        }

        // (1) receiver
        asm.emit_load_arg(0);

        // (2) base-class constructor
        self.emit_base_ctor_call(class, params, &mut asm);

        // (3) field initialisers, in source order
        for field in class.fields() {
            let field_ref = ctx.find_field(&class_name, &field.name.name)?;
            asm.emit_load_arg(0);
            match &field.init {
                Some(init) => {
                    let ty = self.emit_expr(init, &mut ctx, &mut asm)?;
                    self.coerce_value(ty.as_deref(), field_ref.storage, &mut asm);
                }
                None => self.emit_default(field_ref.storage, &mut asm),
            }
            asm.emit_store_field(field_ref.offset);
        }

        // (4) user body
        if let Some(block) = body {
            self.emit_block(block, &mut ctx, &mut asm)?;
        }

        // (5) return
        if !asm.ends_with_return() {
            asm.emit(Opcode::ReturnVoid);
        }

        Ok(asm.finish())
    }

    /// Call the base-class constructor: prefer the one whose parameter-type
    /// list equals the current constructor's (passing the parameters
    /// along), else the parameterless one, else the root object's default.
    fn emit_base_ctor_call(
        &mut self,
        class: &ClassDecl,
        params: &[Parameter],
        asm: &mut MethodAssembler,
    ) {
        let base = class
            .base
            .as_ref()
            .and_then(|b| self.info.class(&b.name))
            .map(|b| b.name.clone());

        let Some(base_name) = base else {
            asm.emit(Opcode::CallObjectCtor);
            return;
        };
        let base_id = self
            .builder
            .class_id(&base_name)
            .expect("program classes are declared up front");
        let base_info = self.info.class(&base_name).expect("base resolved above");

        let my_params: Vec<String> = params.iter().map(|p| p.type_name.name.clone()).collect();

        if base_info.ctors.is_empty() {
            // synthesised parameterless default
            asm.emit_call(Opcode::CallCtor, base_id, 0);
        } else if let Some(index) = base_info.ctors.iter().position(|c| c.params == my_params) {
            for i in 1..=params.len() {
                asm.emit_load_arg(i as u16);
            }
            asm.emit_call(Opcode::CallCtor, base_id, index as u16);
        } else if let Some(index) = base_info.ctors.iter().position(|c| c.params.is_empty()) {
            asm.emit_call(Opcode::CallCtor, base_id, index as u16);
        } else {
            asm.emit(Opcode::CallObjectCtor);
        }
    }

    fn emit_method_body(
        &mut self,
        class: &ClassDecl,
        method: &olang_parser::checker::MethodInfo,
        decl: &MethodDecl,
    ) -> EmitResult<(Vec<u8>, u16)> {
        let mut asm = MethodAssembler::new();
        let mut ctx = BuildContext::new(self.info, class.name.name.clone());
        ctx.return_type = method.ret.clone();
        for (i, param) in decl.params.iter().enumerate() {
            ctx.define_parameter(&param.name.name, (i + 1) as u16, &param.type_name.name);
        }

        match &decl.body {
            MethodBody::Block(block) => {
                self.emit_block(block, &mut ctx, &mut asm)?;
                if !asm.ends_with_return() {
                    match &method.ret {
                        Some(ret) => {
                            // Fell off the end of a typed method: produce
                            // the return type's default.
                            self.emit_default(resolve_storage(ret), &mut asm);
                            asm.emit(Opcode::Return);
                        }
                        None => asm.emit(Opcode::ReturnVoid),
                    }
                }
            }
            MethodBody::Arrow(expr) => {
                let ty = self.emit_expr(expr, &mut ctx, &mut asm)?;
                match &method.ret {
                    Some(ret) => {
                        self.coerce_value(ty.as_deref(), resolve_storage(ret), &mut asm);
                        asm.emit(Opcode::Return);
                    }
                    None => {
                        if ty.is_some() {
                            asm.emit(Opcode::Pop);
                        }
                        asm.emit(Opcode::ReturnVoid);
                    }
                }
            }
            MethodBody::Forward => unreachable!("forward bodies are skipped by the caller"),
        }

        Ok(asm.finish())
    }

    /// Emit a block in its interleaved source order. Local bindings are
    /// restored on exit so inner declarations stay scoped to their block.
    pub(crate) fn emit_block(
        &mut self,
        block: &Block,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        let saved = ctx.save_locals();
        for item in &block.body {
            match item {
                BlockItem::Var(decl) => self.emit_local_decl(decl, ctx, asm)?,
                BlockItem::Stmt(stmt) => self.emit_stmt(stmt, ctx, asm)?,
            }
        }
        ctx.restore_locals(saved);
        Ok(())
    }

    fn emit_local_decl(
        &mut self,
        decl: &VarDecl,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        let slot = asm.alloc_local()?;
        let real = decl
            .declared_type
            .as_ref()
            .map(|t| t.name.clone())
            .or_else(|| decl.init.as_ref().and_then(|e| self.infer_expr(e, ctx)))
            .unwrap_or_else(|| "Object".to_string());

        match &decl.init {
            Some(init) => {
                let ty = self.emit_expr(init, ctx, asm)?;
                self.coerce_value(ty.as_deref(), resolve_storage(&real), asm);
            }
            None => self.emit_default(resolve_storage(&real), asm),
        }
        ctx.define_local(&decl.name.name, slot, &real);
        asm.emit_store_local(slot);
        Ok(())
    }

    /// Push the default value of a storage type (Table D).
    pub(crate) fn emit_default(&mut self, storage: StorageType, asm: &mut MethodAssembler) {
        match storage {
            StorageType::I64 => asm.emit_const_i64(0),
            StorageType::F64 => asm.emit_const_f64(0.0),
            StorageType::Bool => asm.emit(Opcode::ConstFalse),
            StorageType::Str
            | StorageType::Object
            | StorageType::ObjArray
            | StorageType::List => asm.emit(Opcode::ConstNull),
            StorageType::Void => {}
        }
    }
}

/// Locate the AST declaration backing an analysed method signature,
/// preferring a bodied declaration over its forward twin.
fn find_method_decl<'p>(
    class: &'p ClassDecl,
    name: &str,
    params: &[String],
) -> Option<&'p MethodDecl> {
    let mut fallback = None;
    for method in class.methods() {
        if method.name.name != name {
            continue;
        }
        let decl_params: Vec<String> = method
            .params
            .iter()
            .map(|p| p.type_name.name.clone())
            .collect();
        if decl_params != params {
            continue;
        }
        if !matches!(method.body, MethodBody::Forward) {
            return Some(method);
        }
        fallback = Some(method);
    }
    fallback
}

/// Assign virtual dispatch slots: a signature inherits its slot from the
/// nearest ancestor declaring it, otherwise takes the next free one.
fn compute_vslots(info: &ProgramInfo) -> FxHashMap<String, FxHashMap<MethodKey, u16>> {
    let mut result: FxHashMap<String, FxHashMap<MethodKey, u16>> = FxHashMap::default();
    for name in &info.order {
        assign_vslots(name, info, &mut result);
    }
    result
}

fn assign_vslots(
    class_name: &str,
    info: &ProgramInfo,
    result: &mut FxHashMap<String, FxHashMap<MethodKey, u16>>,
) {
    if result.contains_key(class_name) {
        return;
    }
    let Some(class) = info.class(class_name) else {
        return;
    };

    let mut map = match class.base.as_deref() {
        Some(base) if info.class(base).is_some() => {
            assign_vslots(base, info, result);
            result.get(base).cloned().unwrap_or_default()
        }
        _ => FxHashMap::default(),
    };
    let mut next = map.values().max().map(|&v| v + 1).unwrap_or(0);

    for method in &class.methods {
        let key = (method.name.clone(), method.params.clone());
        if !map.contains_key(&key) {
            map.insert(key, next);
            next += 1;
        }
    }
    result.insert(class_name.to_string(), map);
}

#[cfg(test)]
mod tests {
    use super::*;
    use olang_parser::{analyze, parse_source};

    fn info_for(source: &str) -> ProgramInfo {
        analyze(&parse_source(source).unwrap()).unwrap().info
    }

    #[test]
    fn test_vslots_override_shares_slot() {
        let info = info_for(
            "class A is method f(): Integer => Integer(1) method g() is end end \
             class B extends A is method f(): Integer => Integer(2) method h() is end end",
        );
        let slots = compute_vslots(&info);

        let a = &slots["A"];
        let b = &slots["B"];
        let f_key = ("f".to_string(), vec![]);
        let g_key = ("g".to_string(), vec![]);
        let h_key = ("h".to_string(), vec![]);

        // override keeps the ancestor's slot
        assert_eq!(a[&f_key], b[&f_key]);
        // a fresh method gets a fresh slot
        assert_ne!(b[&h_key], b[&f_key]);
        assert_ne!(b[&h_key], b[&g_key]);
    }

    #[test]
    fn test_vslots_overloads_get_distinct_slots() {
        let info = info_for(
            "class A is method f(): Integer => Integer(1) method f(x: Integer): Integer => x end",
        );
        let slots = compute_vslots(&info);
        let a = &slots["A"];
        assert_ne!(
            a[&("f".to_string(), vec![])],
            a[&("f".to_string(), vec!["Integer".to_string()])]
        );
    }

    #[test]
    fn test_vslots_base_declared_after_derived() {
        let info = info_for(
            "class B extends A is method f(): Integer => Integer(2) end \
             class A is method f(): Integer => Integer(1) end",
        );
        let slots = compute_vslots(&info);
        assert_eq!(
            slots["A"][&("f".to_string(), vec![])],
            slots["B"][&("f".to_string(), vec![])]
        );
    }
}
