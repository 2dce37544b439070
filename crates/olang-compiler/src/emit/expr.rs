//! Expression lowering.
//!
//! The inferred type of every sub-expression drives opcode selection:
//! primitive receivers dispatch onto intrinsic instructions through a fixed
//! table, user-class receivers go through overload resolution and a virtual
//! call, and container accesses box or unbox primitive elements at the
//! single point of access.

use super::Emitter;
use crate::context::{resolve_storage, type_tag, BuildContext};
use crate::error::{EmitError, EmitResult};
use crate::module_builder::MethodAssembler;
use olang_bytecode::{Opcode, StorageType, TypeTag};
use olang_parser::ast::*;
use olang_parser::checker::builtins::{self, BuiltinReceiver};

impl<'a> Emitter<'a> {
    pub(crate) fn emit_expr(
        &mut self,
        expr: &Expression,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        match expr {
            Expression::IntLiteral(lit) => {
                asm.emit_const_i64(lit.value);
                Ok(Some("Integer".to_string()))
            }
            Expression::RealLiteral(lit) => {
                asm.emit_const_f64(lit.value);
                Ok(Some("Real".to_string()))
            }
            Expression::BoolLiteral(lit) => {
                asm.emit(if lit.value {
                    Opcode::ConstTrue
                } else {
                    Opcode::ConstFalse
                });
                Ok(Some("Boolean".to_string()))
            }
            Expression::StringLiteral(lit) => {
                let index = self.builder.add_string(&lit.value);
                asm.emit(Opcode::ConstStr);
                asm.emit_u32(index);
                Ok(Some("String".to_string()))
            }
            Expression::This(_) => {
                asm.emit_load_arg(0);
                Ok(Some(ctx.current_class.clone()))
            }
            Expression::Identifier(id) => self.emit_identifier(id, ctx, asm),
            Expression::New(new) => self.emit_new(&new.class_name, &new.args, ctx, asm),
            Expression::Member(member) => self.emit_member_access(member, ctx, asm),
            Expression::Call(call) => self.emit_call_expr(call, ctx, asm),
        }
    }

    fn emit_identifier(
        &mut self,
        id: &Identifier,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        if let Some(local) = ctx.lookup_local(&id.name).cloned() {
            asm.emit_load_local(local.slot);
            return Ok(Some(local.real));
        }
        if let Some(param) = ctx.lookup_param(&id.name).cloned() {
            asm.emit_load_arg(param.index);
            return Ok(Some(param.real));
        }
        let current = ctx.current_class.clone();
        if let Ok(field) = ctx.find_field(&current, &id.name) {
            asm.emit_load_arg(0);
            asm.emit_load_field(field.offset);
            return Ok(Some(field.real));
        }
        Err(EmitError::UnresolvedName {
            name: id.name.clone(),
        })
    }

    /// Lower `New`. Built-in class names are value-coercions or container
    /// allocations; user classes resolve a constructor and instantiate.
    pub(crate) fn emit_new(
        &mut self,
        class_name: &TypeName,
        args: &[Expression],
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        let head = class_name.head().to_string();
        match head.as_str() {
            "Integer" => match args {
                [] => {
                    asm.emit_const_i64(0);
                    Ok(Some("Integer".to_string()))
                }
                [arg] => {
                    let ty = self.emit_expr(arg, ctx, asm)?;
                    match ty.as_deref() {
                        Some("Real") => asm.emit(Opcode::ConvF2I),
                        Some("Boolean") => asm.emit(Opcode::ConvB2I),
                        _ => {}
                    }
                    Ok(Some("Integer".to_string()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: "Integer".to_string(),
                }),
            },
            "Real" => match args {
                [] => {
                    asm.emit_const_f64(0.0);
                    Ok(Some("Real".to_string()))
                }
                [arg] => {
                    let ty = self.emit_expr(arg, ctx, asm)?;
                    if ty.as_deref() == Some("Integer") {
                        asm.emit(Opcode::ConvI2F);
                    }
                    Ok(Some("Real".to_string()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: "Real".to_string(),
                }),
            },
            "Boolean" => match args {
                [] => {
                    asm.emit(Opcode::ConstFalse);
                    Ok(Some("Boolean".to_string()))
                }
                [arg] => {
                    let ty = self.emit_expr(arg, ctx, asm)?;
                    if ty.as_deref() == Some("Integer") {
                        asm.emit(Opcode::ConvI2B);
                    }
                    Ok(Some("Boolean".to_string()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: "Boolean".to_string(),
                }),
            },
            "String" => match args {
                [] => {
                    asm.emit(Opcode::ConstNull);
                    Ok(Some("String".to_string()))
                }
                [arg] => {
                    self.emit_expr(arg, ctx, asm)?;
                    Ok(Some("String".to_string()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: "String".to_string(),
                }),
            },
            "Array" => match args {
                [len] => {
                    self.emit_expr(len, ctx, asm)?;
                    asm.emit(Opcode::NewArray);
                    Ok(Some(class_name.name.clone()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: class_name.name.clone(),
                }),
            },
            "List" => match args {
                [] => {
                    asm.emit(Opcode::NewList);
                    Ok(Some(class_name.name.clone()))
                }
                [arg] => {
                    let arg_ty = self.infer_expr(arg, ctx);
                    if let Some(arg_ty) = &arg_ty {
                        if generic_head(arg_ty) == "List" {
                            // The argument already is a list: the original
                            // is returned, no allocation happens.
                            self.emit_expr(arg, ctx, asm)?;
                            return Ok(Some(arg_ty.clone()));
                        }
                    }
                    asm.emit(Opcode::NewList);
                    let element = class_name.element().unwrap_or("Object").to_string();
                    let ty = self.emit_expr(arg, ctx, asm)?;
                    self.box_element(ty.as_deref(), &element, asm);
                    asm.emit(Opcode::ListAppend);
                    Ok(Some(class_name.name.clone()))
                }
                _ => Err(EmitError::UnresolvedConstructor {
                    class: class_name.name.clone(),
                }),
            },
            _ => {
                let class_id =
                    self.builder
                        .class_id(&head)
                        .ok_or_else(|| EmitError::UnknownClass {
                            name: head.clone(),
                        })?;
                let arg_types: Vec<Option<String>> =
                    args.iter().map(|a| self.infer_expr(a, ctx)).collect();
                let ctor = ctx.find_constructor(&head, &arg_types).ok_or_else(|| {
                    EmitError::UnresolvedConstructor {
                        class: head.clone(),
                    }
                })?;
                let params: Vec<String> = self
                    .info
                    .class(&head)
                    .and_then(|c| c.ctors.get(ctor as usize))
                    .map(|c| c.params.clone())
                    .unwrap_or_default();

                for (i, arg) in args.iter().enumerate() {
                    let ty = self.emit_expr(arg, ctx, asm)?;
                    if let Some(param) = params.get(i) {
                        self.coerce_value(ty.as_deref(), resolve_storage(param), asm);
                    }
                }
                asm.emit_call(Opcode::NewObject, class_id, ctor);
                Ok(Some(head))
            }
        }
    }

    /// Member access without a call: a built-in property, a zero-argument
    /// user method, or a field, tried in that order.
    fn emit_member_access(
        &mut self,
        member: &MemberExpr,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        let receiver_ty = self
            .infer_expr(&member.target, ctx)
            .unwrap_or_else(|| "Object".to_string());

        if let Some(recv) = builtins::classify(&receiver_ty) {
            self.emit_expr(&member.target, ctx, asm)?;
            return self.emit_builtin_zero(&recv, &receiver_ty, &member.member.name, asm);
        }

        if let Some(method) = ctx.find_method(&receiver_ty, &member.member.name, &[]) {
            self.emit_expr(&member.target, ctx, asm)?;
            let owner_id =
                self.builder
                    .class_id(&method.owner)
                    .ok_or_else(|| EmitError::UnknownClass {
                        name: method.owner.clone(),
                    })?;
            let slot = self.vslot(&method.owner, &member.member.name, &method.params);
            asm.emit_call(Opcode::CallVirt, owner_id, slot);
            return Ok(method.ret);
        }

        let field = ctx.find_field(&receiver_ty, &member.member.name)?;
        self.emit_expr(&member.target, ctx, asm)?;
        asm.emit_load_field(field.offset);
        Ok(Some(field.real))
    }

    /// Zero-argument built-in intrinsics; the receiver is already on the
    /// stack.
    fn emit_builtin_zero(
        &mut self,
        recv: &BuiltinReceiver,
        receiver_ty: &str,
        member: &str,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        match (recv, member) {
            (BuiltinReceiver::Integer, "UnaryMinus") => {
                asm.emit(Opcode::Ineg);
                Ok(Some("Integer".to_string()))
            }
            (BuiltinReceiver::Real, "UnaryMinus") => {
                asm.emit(Opcode::Fneg);
                Ok(Some("Real".to_string()))
            }
            (BuiltinReceiver::Integer, "toReal") => {
                asm.emit(Opcode::ConvI2F);
                Ok(Some("Real".to_string()))
            }
            (BuiltinReceiver::Integer, "toBoolean") => {
                asm.emit(Opcode::ConvI2B);
                Ok(Some("Boolean".to_string()))
            }
            (BuiltinReceiver::Real, "toInteger") => {
                asm.emit(Opcode::ConvF2I);
                Ok(Some("Integer".to_string()))
            }
            (BuiltinReceiver::Boolean, "Not") => {
                asm.emit(Opcode::BNot);
                Ok(Some("Boolean".to_string()))
            }
            (BuiltinReceiver::Boolean, "toInteger") => {
                asm.emit(Opcode::ConvB2I);
                Ok(Some("Integer".to_string()))
            }
            (BuiltinReceiver::Array(_), "Length") => {
                asm.emit(Opcode::ArrayLen);
                Ok(Some("Integer".to_string()))
            }
            (BuiltinReceiver::List(_), "Length") => {
                asm.emit(Opcode::ListLen);
                Ok(Some("Integer".to_string()))
            }
            (BuiltinReceiver::List(element), "head") => {
                asm.emit_const_i64(0);
                asm.emit(Opcode::ListGet);
                let element = element.clone();
                self.unbox_element(&element, asm);
                Ok(Some(element))
            }
            (BuiltinReceiver::List(_), "tail") => {
                // list.range(1, length - 1)
                asm.emit(Opcode::Dup);
                asm.emit_const_i64(1);
                asm.emit(Opcode::Swap);
                asm.emit(Opcode::ListLen);
                asm.emit_const_i64(1);
                asm.emit(Opcode::Isub);
                asm.emit(Opcode::ListRange);
                Ok(Some(receiver_ty.to_string()))
            }
            _ => Err(EmitError::UnresolvedMethod {
                class: receiver_ty.to_string(),
                name: member.to_string(),
            }),
        }
    }

    fn emit_call_expr(
        &mut self,
        call: &CallExpr,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        match call.callee.as_ref() {
            Expression::Member(member) => {
                // `print` is reachable through any member.
                if member.member.name == "print" && call.args.len() == 1 {
                    return self.emit_print(&call.args[0], ctx, asm);
                }
                // `this.Name(args)` where Name is a class in scope
                // instantiates that class.
                if matches!(member.target.as_ref(), Expression::This(_))
                    && self.info.class(&member.member.name).is_some()
                {
                    let class_name =
                        TypeName::new(member.member.name.clone(), member.member.span);
                    return self.emit_new(&class_name, &call.args, ctx, asm);
                }

                let receiver_ty = self
                    .infer_expr(&member.target, ctx)
                    .unwrap_or_else(|| "Object".to_string());

                if let Some(recv) = builtins::classify(&receiver_ty) {
                    if call.args.is_empty() {
                        self.emit_expr(&member.target, ctx, asm)?;
                        return self.emit_builtin_zero(
                            &recv,
                            &receiver_ty,
                            &member.member.name,
                            asm,
                        );
                    }
                    return self.emit_builtin_call(
                        &recv,
                        &receiver_ty,
                        &member.member.name,
                        &member.target,
                        &call.args,
                        ctx,
                        asm,
                    );
                }

                self.emit_user_call(
                    &receiver_ty,
                    &member.member.name,
                    Some(&member.target),
                    &call.args,
                    ctx,
                    asm,
                )
            }
            Expression::Identifier(id) => {
                if id.name == "print" && call.args.len() == 1 {
                    return self.emit_print(&call.args[0], ctx, asm);
                }
                // An implicit-`this` call when the name is a method of the
                // current class; a class instantiation when it is a class.
                let arg_types: Vec<Option<String>> =
                    call.args.iter().map(|a| self.infer_expr(a, ctx)).collect();
                let current = ctx.current_class.clone();
                if ctx.find_method(&current, &id.name, &arg_types).is_some() {
                    return self.emit_user_call(&current, &id.name, None, &call.args, ctx, asm);
                }
                if self.info.class(&id.name).is_some() {
                    let class_name = TypeName::new(id.name.clone(), id.span);
                    return self.emit_new(&class_name, &call.args, ctx, asm);
                }
                Err(EmitError::UnresolvedName {
                    name: id.name.clone(),
                })
            }
            other => Err(EmitError::UnsupportedShape {
                detail: format!("call on {:?}", other.span()),
            }),
        }
    }

    /// Built-in method call with arguments on a primitive or container
    /// receiver.
    #[allow(clippy::too_many_arguments)]
    fn emit_builtin_call(
        &mut self,
        recv: &BuiltinReceiver,
        receiver_ty: &str,
        member: &str,
        target: &Expression,
        args: &[Expression],
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        match recv {
            BuiltinReceiver::Integer | BuiltinReceiver::Real => {
                self.emit_numeric_op(receiver_ty, member, target, &args[0], ctx, asm)
            }
            BuiltinReceiver::Boolean => {
                let opcode = match member {
                    "And" => Opcode::BAnd,
                    "Or" => Opcode::BOr,
                    "Xor" => Opcode::BXor,
                    _ => {
                        return Err(EmitError::UnresolvedMethod {
                            class: receiver_ty.to_string(),
                            name: member.to_string(),
                        })
                    }
                };
                self.emit_expr(target, ctx, asm)?;
                self.emit_expr(&args[0], ctx, asm)?;
                asm.emit(opcode);
                Ok(Some("Boolean".to_string()))
            }
            BuiltinReceiver::Array(element) => {
                let element = element.clone();
                match member {
                    "get" => {
                        self.emit_expr(target, ctx, asm)?;
                        self.emit_expr(&args[0], ctx, asm)?;
                        asm.emit(Opcode::LoadElem);
                        self.unbox_element(&element, asm);
                        Ok(Some(element))
                    }
                    "set" => {
                        self.emit_expr(target, ctx, asm)?;
                        self.emit_expr(&args[0], ctx, asm)?;
                        let value_ty = self.emit_expr(&args[1], ctx, asm)?;
                        self.box_element(value_ty.as_deref(), &element, asm);
                        asm.emit(Opcode::StoreElem);
                        Ok(None)
                    }
                    _ => Err(EmitError::UnresolvedMethod {
                        class: receiver_ty.to_string(),
                        name: member.to_string(),
                    }),
                }
            }
            BuiltinReceiver::List(element) => {
                let element = element.clone();
                match member {
                    "get" => {
                        self.emit_expr(target, ctx, asm)?;
                        self.emit_expr(&args[0], ctx, asm)?;
                        asm.emit(Opcode::ListGet);
                        self.unbox_element(&element, asm);
                        Ok(Some(element))
                    }
                    "append" => {
                        self.emit_expr(target, ctx, asm)?;
                        let value_ty = self.emit_expr(&args[0], ctx, asm)?;
                        self.box_element(value_ty.as_deref(), &element, asm);
                        asm.emit(Opcode::ListAppend);
                        Ok(Some(receiver_ty.to_string()))
                    }
                    _ => Err(EmitError::UnresolvedMethod {
                        class: receiver_ty.to_string(),
                        name: member.to_string(),
                    }),
                }
            }
        }
    }

    /// Binary arithmetic and comparison on `Integer`/`Real` receivers, with
    /// numeric promotion when receiver and argument differ.
    fn emit_numeric_op(
        &mut self,
        receiver_ty: &str,
        member: &str,
        target: &Expression,
        arg: &Expression,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        let arg_ty = self
            .infer_expr(arg, ctx)
            .unwrap_or_else(|| receiver_ty.to_string());
        let promoted_real = receiver_ty == "Real" || arg_ty == "Real";

        self.emit_expr(target, ctx, asm)?;
        if receiver_ty == "Integer" && promoted_real {
            asm.emit(Opcode::ConvI2F);
        }
        self.emit_expr(arg, ctx, asm)?;
        if arg_ty == "Integer" && promoted_real {
            asm.emit(Opcode::ConvI2F);
        }

        let result = if promoted_real { "Real" } else { "Integer" };
        match member {
            "Plus" => {
                asm.emit(if promoted_real { Opcode::Fadd } else { Opcode::Iadd });
                Ok(Some(result.to_string()))
            }
            "Minus" => {
                asm.emit(if promoted_real { Opcode::Fsub } else { Opcode::Isub });
                Ok(Some(result.to_string()))
            }
            "Mult" => {
                asm.emit(if promoted_real { Opcode::Fmul } else { Opcode::Imul });
                Ok(Some(result.to_string()))
            }
            "Div" => {
                asm.emit(if promoted_real { Opcode::Fdiv } else { Opcode::Idiv });
                Ok(Some(result.to_string()))
            }
            "Rem" => {
                asm.emit(Opcode::Irem);
                Ok(Some("Integer".to_string()))
            }
            "Less" => {
                asm.emit(if promoted_real { Opcode::Fclt } else { Opcode::Iclt });
                Ok(Some("Boolean".to_string()))
            }
            "Greater" => {
                asm.emit(if promoted_real { Opcode::Fcgt } else { Opcode::Icgt });
                Ok(Some("Boolean".to_string()))
            }
            "Equal" => {
                asm.emit(if promoted_real { Opcode::Fceq } else { Opcode::Iceq });
                Ok(Some("Boolean".to_string()))
            }
            // a <= b  ==  (a > b) == 0, and likewise for >=
            "LessEqual" => {
                asm.emit(if promoted_real { Opcode::Fcgt } else { Opcode::Icgt });
                asm.emit_const_i64(0);
                asm.emit(Opcode::Iceq);
                Ok(Some("Boolean".to_string()))
            }
            "GreaterEqual" => {
                asm.emit(if promoted_real { Opcode::Fclt } else { Opcode::Iclt });
                asm.emit_const_i64(0);
                asm.emit(Opcode::Iceq);
                Ok(Some("Boolean".to_string()))
            }
            _ => Err(EmitError::UnresolvedMethod {
                class: receiver_ty.to_string(),
                name: member.to_string(),
            }),
        }
    }

    /// Dispatch on a user class: receiver first, then arguments, then a
    /// virtual call through the resolved overload's slot.
    fn emit_user_call(
        &mut self,
        owner: &str,
        name: &str,
        target: Option<&Expression>,
        args: &[Expression],
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        let arg_types: Vec<Option<String>> =
            args.iter().map(|a| self.infer_expr(a, ctx)).collect();
        let method = ctx.find_method(owner, name, &arg_types).ok_or_else(|| {
            EmitError::UnresolvedMethod {
                class: owner.to_string(),
                name: name.to_string(),
            }
        })?;

        match target {
            Some(expr) => {
                self.emit_expr(expr, ctx, asm)?;
            }
            None => asm.emit_load_arg(0),
        }
        for (i, arg) in args.iter().enumerate() {
            let ty = self.emit_expr(arg, ctx, asm)?;
            if let Some(param) = method.params.get(i) {
                self.coerce_value(ty.as_deref(), resolve_storage(param), asm);
            }
        }

        let owner_id =
            self.builder
                .class_id(&method.owner)
                .ok_or_else(|| EmitError::UnknownClass {
                    name: method.owner.clone(),
                })?;
        let slot = self.vslot(&method.owner, name, &method.params);
        asm.emit_call(Opcode::CallVirt, owner_id, slot);
        Ok(method.ret)
    }

    /// The `print` intrinsic: evaluate the argument and route it to the
    /// output sink matching its type. Leaves nothing on the stack.
    fn emit_print(
        &mut self,
        arg: &Expression,
        ctx: &mut BuildContext,
        asm: &mut MethodAssembler,
    ) -> EmitResult<Option<String>> {
        let ty = self.emit_expr(arg, ctx, asm)?;
        let tag = ty.as_deref().map(type_tag).unwrap_or(TypeTag::Object);
        asm.emit(Opcode::Print);
        asm.emit_u8(tag.to_u8());
        Ok(None)
    }

    // ========================================================================
    // Coercions and boxing
    // ========================================================================

    /// Adjust the value on top of the stack to the target storage type:
    /// numeric conversion between `Integer` and `Real`, boxing of a
    /// primitive stored into an opaque reference.
    pub(crate) fn coerce_value(
        &mut self,
        from: Option<&str>,
        to: StorageType,
        asm: &mut MethodAssembler,
    ) {
        let Some(from) = from else { return };
        match (resolve_storage(from), to) {
            (StorageType::I64, StorageType::F64) => asm.emit(Opcode::ConvI2F),
            (StorageType::F64, StorageType::I64) => asm.emit(Opcode::ConvF2I),
            (s, StorageType::Object) if s.is_primitive() => {
                asm.emit(Opcode::Box);
                asm.emit_u8(type_tag(from).to_u8());
            }
            _ => {}
        }
    }

    /// Box the value on top of the stack when the container's element type
    /// is primitive.
    fn box_element(&mut self, value_ty: Option<&str>, element: &str, asm: &mut MethodAssembler) {
        if resolve_storage(element).is_primitive() {
            if let Some(value_ty) = value_ty {
                match (resolve_storage(value_ty), resolve_storage(element)) {
                    (StorageType::I64, StorageType::F64) => asm.emit(Opcode::ConvI2F),
                    (StorageType::F64, StorageType::I64) => asm.emit(Opcode::ConvF2I),
                    _ => {}
                }
            }
            asm.emit(Opcode::Box);
            asm.emit_u8(type_tag(element).to_u8());
        }
    }

    /// Unbox the element just loaded from a container when its recorded
    /// element type is primitive.
    fn unbox_element(&mut self, element: &str, asm: &mut MethodAssembler) {
        if resolve_storage(element).is_primitive() {
            asm.emit(Opcode::Unbox);
            asm.emit_u8(type_tag(element).to_u8());
        }
    }

    // ========================================================================
    // Type inference (no emission)
    // ========================================================================

    /// Infer the type of an expression against the build context; `None`
    /// when unknown or void. This is the same rule set the analyzer uses,
    /// applied to the emitter's bindings, and it is what opcode selection
    /// keys off.
    pub(crate) fn infer_expr(&self, expr: &Expression, ctx: &BuildContext) -> Option<String> {
        match expr {
            Expression::IntLiteral(_) => Some("Integer".to_string()),
            Expression::RealLiteral(_) => Some("Real".to_string()),
            Expression::BoolLiteral(_) => Some("Boolean".to_string()),
            Expression::StringLiteral(_) => Some("String".to_string()),
            Expression::This(_) => Some(ctx.current_class.clone()),
            Expression::Identifier(id) => {
                if let Some(local) = ctx.lookup_local(&id.name) {
                    return Some(local.real.clone());
                }
                if let Some(param) = ctx.lookup_param(&id.name) {
                    return Some(param.real.clone());
                }
                ctx.find_field(&ctx.current_class, &id.name)
                    .ok()
                    .map(|f| f.real)
            }
            Expression::New(new) => {
                if new.class_name.head() == "List" && new.args.len() == 1 {
                    if let Some(arg_ty) = self.infer_expr(&new.args[0], ctx) {
                        if generic_head(&arg_ty) == "List" {
                            return Some(arg_ty);
                        }
                    }
                }
                match new.class_name.head() {
                    "Integer" | "Real" | "Boolean" | "String" => {
                        Some(new.class_name.head().to_string())
                    }
                    "Array" | "List" => Some(new.class_name.name.clone()),
                    head => Some(head.to_string()),
                }
            }
            Expression::Member(member) => {
                let receiver = self.infer_expr(&member.target, ctx)?;
                self.infer_member(&receiver, &member.member.name, None, 0, ctx)
            }
            Expression::Call(call) => match call.callee.as_ref() {
                Expression::Member(member) => {
                    if member.member.name == "print" {
                        return None;
                    }
                    if matches!(member.target.as_ref(), Expression::This(_))
                        && self.info.class(&member.member.name).is_some()
                    {
                        return Some(member.member.name.clone());
                    }
                    let receiver = self.infer_expr(&member.target, ctx)?;
                    let arg_ty = call.args.first().and_then(|a| self.infer_expr(a, ctx));
                    self.infer_member(
                        &receiver,
                        &member.member.name,
                        arg_ty.as_deref(),
                        call.args.len(),
                        ctx,
                    )
                }
                Expression::Identifier(id) => {
                    if id.name == "print" {
                        return None;
                    }
                    let arg_types: Vec<Option<String>> =
                        call.args.iter().map(|a| self.infer_expr(a, ctx)).collect();
                    if let Some(method) = ctx.find_method(&ctx.current_class, &id.name, &arg_types)
                    {
                        return method.ret;
                    }
                    if self.info.class(&id.name).is_some() {
                        return Some(id.name.clone());
                    }
                    None
                }
                _ => None,
            },
        }
    }

    fn infer_member(
        &self,
        receiver: &str,
        member: &str,
        arg_ty: Option<&str>,
        arity: usize,
        ctx: &BuildContext,
    ) -> Option<String> {
        if let Some(recv) = builtins::classify(receiver) {
            let sig = builtins::signature_of(&recv, member)?;
            return builtins::resolve_return(receiver, arg_ty, sig.ret);
        }
        let args = vec![None; arity];
        if let Some(method) = ctx.find_method(receiver, member, &args) {
            return method.ret;
        }
        if arity == 0 {
            if let Ok(field) = ctx.find_field(receiver, member) {
                return Some(field.real);
            }
        }
        None
    }
}
