//! Statement lowering.

use super::Emitter;
use crate::context::{resolve_storage, BuildContext};
use crate::error::EmitResult;
use crate::module_builder::MethodAssembler;
use olang_bytecode::Opcode;
use olang_parser::ast::*;

impl<'a> Emitter<'a> {
    pub(crate) fn emit_stmt(
        &mut self,
        stmt: &Statement,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        match stmt {
            Statement::Assign(assign) => self.emit_assign(assign, ctx, asm),
            Statement::Expression(stmt) => {
                let ty = self.emit_expr(&stmt.expression, ctx, asm)?;
                if ty.is_some() {
                    asm.emit(Opcode::Pop);
                }
                Ok(())
            }
            Statement::While(stmt) => self.emit_while(stmt, ctx, asm),
            Statement::If(stmt) => self.emit_if(stmt, ctx, asm),
            Statement::Return(stmt) => self.emit_return(stmt, ctx, asm),
        }
    }

    fn emit_assign(
        &mut self,
        assign: &AssignStatement,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        match &assign.target {
            AssignTarget::Name(id) => {
                if let Some(local) = ctx.lookup_local(&id.name).cloned() {
                    let ty = self.emit_expr(&assign.value, ctx, asm)?;
                    self.coerce_value(ty.as_deref(), local.storage, asm);
                    asm.emit_store_local(local.slot);
                    return Ok(());
                }
                if let Some(param) = ctx.lookup_param(&id.name).cloned() {
                    let ty = self.emit_expr(&assign.value, ctx, asm)?;
                    self.coerce_value(ty.as_deref(), param.storage, asm);
                    asm.emit_store_arg(param.index);
                    return Ok(());
                }
                // A bare name resolving past locals and parameters is a
                // field of the current class.
                let current = ctx.current_class.clone();
                let field = ctx.find_field(&current, &id.name)?;
                asm.emit_load_arg(0);
                let ty = self.emit_expr(&assign.value, ctx, asm)?;
                self.coerce_value(ty.as_deref(), field.storage, asm);
                asm.emit_store_field(field.offset);
                Ok(())
            }
            AssignTarget::ThisField(id) => {
                let current = ctx.current_class.clone();
                let field = ctx.find_field(&current, &id.name)?;
                asm.emit_load_arg(0);
                let ty = self.emit_expr(&assign.value, ctx, asm)?;
                self.coerce_value(ty.as_deref(), field.storage, asm);
                asm.emit_store_field(field.offset);
                Ok(())
            }
        }
    }

    /// `start: cond; brfalse end; body; jmp start; end:`
    fn emit_while(
        &mut self,
        stmt: &WhileStatement,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        let start = asm.position();
        self.emit_expr(&stmt.condition, ctx, asm)?;
        let exit = asm.emit_forward_jump(Opcode::BranchFalse);
        self.emit_block(&stmt.body, ctx, asm)?;
        asm.emit_backward_jump(Opcode::Jump, start);
        asm.patch_jump(exit);
        Ok(())
    }

    /// `cond; brfalse else; then; (jmp end unless then returns); else; end:`
    fn emit_if(
        &mut self,
        stmt: &IfStatement,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        self.emit_expr(&stmt.condition, ctx, asm)?;
        let else_jump = asm.emit_forward_jump(Opcode::BranchFalse);
        self.emit_block(&stmt.then_block, ctx, asm)?;

        match &stmt.else_block {
            Some(else_block) => {
                let end_jump = if stmt.then_block.ends_with_return() {
                    None
                } else {
                    Some(asm.emit_forward_jump(Opcode::Jump))
                };
                asm.patch_jump(else_jump);
                self.emit_block(else_block, ctx, asm)?;
                if let Some(end) = end_jump {
                    asm.patch_jump(end);
                }
            }
            None => asm.patch_jump(else_jump),
        }
        Ok(())
    }

    fn emit_return(
        &mut self,
        stmt: &ReturnStatement,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<()> {
        let return_type = ctx.return_type.clone();
        match (&return_type, &stmt.value) {
            (Some(ret), Some(value)) => {
                let ty = self.emit_expr(value, ctx, asm)?;
                self.coerce_value(ty.as_deref(), resolve_storage(ret), asm);
                asm.emit(Opcode::Return);
            }
            (Some(ret), None) => {
                // Rejected by the analyzer; keep the stack balanced anyway.
                self.emit_default(resolve_storage(ret), asm);
                asm.emit(Opcode::Return);
            }
            (None, Some(value)) => {
                let ty = self.emit_expr(value, ctx, asm)?;
                if ty.is_some() {
                    asm.emit(Opcode::Pop);
                }
                asm.emit(Opcode::ReturnVoid);
            }
            (None, None) => asm.emit(Opcode::ReturnVoid),
        }
        Ok(())
    }
}
