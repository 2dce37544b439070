//! Semantic analyzer: the non-mutating check pass.
//!
//! Three class-level traversals, in order:
//! 1. register every class name in the global scope (duplicates fail);
//! 2. resolve declared bases and verify the inheritance chain is acyclic;
//! 3. per class, enter a class scope, inject inherited fields, collect
//!    member signatures with the duplicate rules, then re-walk member
//!    bodies validating expressions and statements.
//!
//! The pass produces a [`ProgramInfo`] registry for the emitter plus the
//! collected warnings. Any violation raises a [`CheckError`] immediately.

use super::builtins::{self, BuiltinReceiver};
use super::error::{CheckError, CheckWarning};
use super::info::{ClassInfo, CtorInfo, FieldInfo, MethodInfo, ProgramInfo};
use super::symbols::{ScopeId, ScopeKind, Symbol, SymbolKind, SymbolTable};
use crate::ast::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// Result of a successful check pass.
#[derive(Debug)]
pub struct Analysis {
    pub info: ProgramInfo,
    pub warnings: Vec<CheckWarning>,
}

/// Run the check pass over a parsed program.
pub fn analyze(program: &Program) -> Result<Analysis, CheckError> {
    let mut analyzer = Analyzer::new(program);
    analyzer.run()?;
    Ok(Analysis {
        info: analyzer.info,
        warnings: analyzer.warnings,
    })
}

struct Analyzer<'a> {
    program: &'a Program,
    symbols: SymbolTable,
    info: ProgramInfo,
    warnings: Vec<CheckWarning>,
    ast_index: FxHashMap<String, &'a ClassDecl>,
    current_class: Option<String>,
    class_scope: Option<ScopeId>,
    /// `None` outside bodies; `Some(ret)` inside a method or constructor,
    /// where `ret` is the declared return type (constructors are type-less).
    return_context: Option<Option<String>>,
    /// Name of the method under validation, for diagnostics.
    current_method: Option<String>,
}

impl<'a> Analyzer<'a> {
    fn new(program: &'a Program) -> Self {
        Self {
            program,
            symbols: SymbolTable::new(),
            info: ProgramInfo::default(),
            warnings: Vec::new(),
            ast_index: FxHashMap::default(),
            current_class: None,
            class_scope: None,
            return_context: None,
            current_method: None,
        }
    }

    fn run(&mut self) -> Result<(), CheckError> {
        self.register_classes()?;
        self.check_inheritance()?;
        for class in &self.program.classes {
            self.check_class(class)?;
        }
        Ok(())
    }

    // ========================================================================
    // Traversal 1: registration
    // ========================================================================

    fn register_classes(&mut self) -> Result<(), CheckError> {
        for class in &self.program.classes {
            let name = class.name.name.clone();
            self.symbols
                .define(Symbol::new(
                    name.clone(),
                    SymbolKind::Class,
                    None,
                    class.name.span,
                ))
                .map_err(|_| CheckError::DuplicateClass { name: name.clone() })?;
            self.ast_index.insert(name.clone(), class);
            self.info.order.push(name);
        }
        Ok(())
    }

    // ========================================================================
    // Traversal 2: inheritance validation
    // ========================================================================

    fn check_inheritance(&mut self) -> Result<(), CheckError> {
        for class in &self.program.classes {
            let Some(base) = &class.base else { continue };

            let symbol =
                self.symbols
                    .resolve(&base.name)
                    .ok_or_else(|| CheckError::UnknownBase {
                        class: class.name.name.clone(),
                        base: base.name.clone(),
                    })?;
            if symbol.kind != SymbolKind::Class {
                return Err(CheckError::BaseNotClass {
                    class: class.name.name.clone(),
                    base: base.name.clone(),
                });
            }

            // Walk the chain with a visited set to detect cycles.
            let mut visited = FxHashSet::default();
            visited.insert(class.name.name.as_str());
            let mut cur = Some(base.name.as_str());
            while let Some(name) = cur {
                if !visited.insert(name) {
                    return Err(CheckError::CyclicInheritance {
                        class: class.name.name.clone(),
                    });
                }
                cur = self
                    .ast_index
                    .get(name)
                    .copied()
                    .and_then(|decl| decl.base.as_ref())
                    .map(|b| b.name.as_str());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Traversal 3: members and bodies
    // ========================================================================

    fn check_class(&mut self, class: &ClassDecl) -> Result<(), CheckError> {
        let class_name = class.name.name.clone();
        self.current_class = Some(class_name.clone());
        let scope = self.symbols.push_scope(ScopeKind::Class);
        self.class_scope = Some(scope);

        self.inject_inherited_fields(class);
        self.collect_members(class)?;
        self.validate_bodies(class)?;

        self.symbols.pop_scope();
        self.class_scope = None;
        self.current_class = None;
        Ok(())
    }

    /// Define every field inherited from the full base chain in the class
    /// scope. Nearer declarations win; there is no override.
    fn inject_inherited_fields(&mut self, class: &ClassDecl) {
        let mut chain = Vec::new();
        let mut cur = class.base.as_ref().map(|b| b.name.clone());
        while let Some(name) = cur {
            match self.ast_index.get(name.as_str()) {
                Some(decl) => {
                    chain.push(*decl);
                    cur = decl.base.as_ref().map(|b| b.name.clone());
                }
                None => break,
            }
        }

        for ancestor in chain {
            for field in ancestor.fields() {
                let ty = self.field_type(field);
                // Already present: defined by a nearer ancestor.
                let _ = self.symbols.define(Symbol::new(
                    field.name.name.clone(),
                    SymbolKind::Variable,
                    Some(ty),
                    field.name.span,
                ));
            }
        }
    }

    fn field_type(&self, field: &VarDecl) -> String {
        if let Some(tn) = &field.declared_type {
            return tn.name.clone();
        }
        field
            .init
            .as_ref()
            .map(|init| self.infer_initializer(init))
            .unwrap_or_else(|| "Object".to_string())
    }

    /// Lightweight inference for field initialisers, which are constructor
    /// calls with literal arguments.
    fn infer_initializer(&self, init: &Expression) -> String {
        match init {
            Expression::IntLiteral(_) => "Integer".to_string(),
            Expression::RealLiteral(_) => "Real".to_string(),
            Expression::BoolLiteral(_) => "Boolean".to_string(),
            Expression::StringLiteral(_) => "String".to_string(),
            Expression::New(new) => new.class_name.name.clone(),
            Expression::Call(call) => match call.callee.as_ref() {
                Expression::Identifier(id)
                    if self
                        .symbols
                        .resolve(&id.name)
                        .map(|s| s.kind == SymbolKind::Class)
                        .unwrap_or(false) =>
                {
                    id.name.clone()
                }
                _ => "Object".to_string(),
            },
            _ => "Object".to_string(),
        }
    }

    fn collect_members(&mut self, class: &ClassDecl) -> Result<(), CheckError> {
        let class_name = class.name.name.clone();
        let mut fields = Vec::new();
        let mut ctors: Vec<CtorInfo> = Vec::new();
        let mut methods: Vec<MethodInfo> = Vec::new();

        for member in &class.members {
            match member {
                Member::Field(field) => {
                    let ty = self.field_type(field);
                    self.symbols
                        .define(Symbol::new(
                            field.name.name.clone(),
                            SymbolKind::Variable,
                            Some(ty.clone()),
                            field.name.span,
                        ))
                        .map_err(|_| CheckError::DuplicateField {
                            class: class_name.clone(),
                            name: field.name.name.clone(),
                        })?;
                    fields.push(FieldInfo {
                        name: field.name.name.clone(),
                        ty,
                    });
                }
                Member::Constructor(ctor) => {
                    let params: Vec<String> =
                        ctor.params.iter().map(|p| p.type_name.name.clone()).collect();
                    if ctors.iter().any(|c| c.params == params) {
                        return Err(CheckError::DuplicateConstructor {
                            class: class_name.clone(),
                            params: params.join(","),
                        });
                    }
                    ctors.push(CtorInfo { params });
                }
                Member::Method(method) => {
                    let name = method.name.name.clone();
                    let params: Vec<String> = method
                        .params
                        .iter()
                        .map(|p| p.type_name.name.clone())
                        .collect();
                    let is_forward = matches!(method.body, MethodBody::Forward);
                    let ret = method.return_type.as_ref().map(|t| t.name.clone());

                    if let Some(existing) = methods
                        .iter_mut()
                        .find(|m| m.name == name && m.params == params)
                    {
                        // Identical signatures may coexist only when one of
                        // the pair is a forward declaration.
                        if existing.is_forward && !is_forward {
                            existing.is_forward = false;
                            existing.ret = ret;
                        } else if !existing.is_forward && is_forward {
                            // Forward after the definition: nothing to add.
                        } else {
                            return Err(CheckError::DuplicateMethod {
                                class: class_name.clone(),
                                name,
                            });
                        }
                    } else {
                        // Overloading is permitted when the parameter-type
                        // sequences differ; the shared name is defined once.
                        match self.symbols.current().symbols.get(&name) {
                            Some(symbol) if symbol.kind != SymbolKind::Method => {
                                return Err(CheckError::DuplicateMember {
                                    class: class_name.clone(),
                                    name,
                                });
                            }
                            Some(_) => {}
                            None => {
                                self.symbols
                                    .define(Symbol::new(
                                        name.clone(),
                                        SymbolKind::Method,
                                        ret.clone(),
                                        method.name.span,
                                    ))
                                    .map_err(|_| CheckError::DuplicateMember {
                                        class: class_name.clone(),
                                        name: name.clone(),
                                    })?;
                            }
                        }
                        methods.push(MethodInfo {
                            name,
                            params,
                            ret,
                            is_forward,
                        });
                    }
                }
            }
        }

        self.info.classes.insert(
            class_name.clone(),
            ClassInfo {
                name: class_name,
                base: class.base.as_ref().map(|b| b.name.clone()),
                fields,
                ctors,
                methods,
            },
        );
        Ok(())
    }

    fn validate_bodies(&mut self, class: &ClassDecl) -> Result<(), CheckError> {
        for member in &class.members {
            match member {
                Member::Field(field) => {
                    if let Some(tn) = &field.declared_type {
                        self.resolve_type_str(&tn.name)?;
                    }
                    if let Some(init) = &field.init {
                        self.validate_expr(init)?;
                    }
                }
                Member::Constructor(ctor) => {
                    self.current_method = Some("this".to_string());
                    self.return_context = Some(None);
                    self.symbols.push_scope(ScopeKind::Method);
                    self.define_params(&ctor.params)?;
                    self.validate_block(&ctor.body)?;
                    self.symbols.pop_scope();
                    self.return_context = None;
                    self.current_method = None;
                }
                Member::Method(method) => {
                    if let Some(ret) = &method.return_type {
                        self.resolve_type_str(&ret.name)?;
                    }
                    self.current_method = Some(method.name.name.clone());
                    self.return_context =
                        Some(method.return_type.as_ref().map(|t| t.name.clone()));
                    self.symbols.push_scope(ScopeKind::Method);
                    self.define_params(&method.params)?;
                    match &method.body {
                        MethodBody::Forward => {}
                        MethodBody::Block(block) => self.validate_block(block)?,
                        MethodBody::Arrow(expr) => self.validate_expr(expr)?,
                    }
                    self.symbols.pop_scope();
                    self.return_context = None;
                    self.current_method = None;
                }
            }
        }
        Ok(())
    }

    fn define_params(&mut self, params: &[Parameter]) -> Result<(), CheckError> {
        for param in params {
            self.resolve_type_str(&param.type_name.name)?;
            self.symbols
                .define(Symbol::new(
                    param.name.name.clone(),
                    SymbolKind::Parameter,
                    Some(param.type_name.name.clone()),
                    param.name.span,
                ))
                .map_err(|_| CheckError::Duplicate {
                    name: param.name.name.clone(),
                })?;
        }
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn validate_block(&mut self, block: &Block) -> Result<(), CheckError> {
        self.symbols.push_scope(ScopeKind::Block);

        for item in &block.body {
            match item {
                BlockItem::Var(decl) => {
                    if let Some(tn) = &decl.declared_type {
                        self.resolve_type_str(&tn.name)?;
                    }
                    if let Some(init) = &decl.init {
                        self.validate_expr(init)?;
                    }
                    let ty = decl
                        .declared_type
                        .as_ref()
                        .map(|t| t.name.clone())
                        .or_else(|| decl.init.as_ref().and_then(|e| self.infer_expr(e)));
                    self.symbols
                        .define(Symbol::new(
                            decl.name.name.clone(),
                            SymbolKind::Variable,
                            ty,
                            decl.name.span,
                        ))
                        .map_err(|_| CheckError::Duplicate {
                            name: decl.name.name.clone(),
                        })?;
                }
                BlockItem::Stmt(stmt) => self.validate_statement(stmt)?,
            }
        }

        // Unused-variable warnings at scope exit.
        let scope = self.symbols.current();
        let mut unused = Vec::new();
        for symbol in scope.symbols_in_order() {
            if symbol.kind == SymbolKind::Variable && !symbol.used {
                unused.push((symbol.name.clone(), symbol.span));
            }
        }
        for (name, span) in unused {
            self.warnings
                .push(CheckWarning::new(format!("unused variable `{}`", name), span));
        }

        self.symbols.pop_scope();
        Ok(())
    }

    fn validate_statement(&mut self, stmt: &Statement) -> Result<(), CheckError> {
        match stmt {
            Statement::Assign(assign) => self.validate_assign(assign),
            Statement::Expression(stmt) => self.validate_expr(&stmt.expression),
            Statement::While(stmt) => {
                self.validate_expr(&stmt.condition)?;
                self.check_condition(&stmt.condition)?;
                self.validate_block(&stmt.body)
            }
            Statement::If(stmt) => {
                self.validate_expr(&stmt.condition)?;
                self.check_condition(&stmt.condition)?;
                self.validate_block(&stmt.then_block)?;
                if let Some(else_block) = &stmt.else_block {
                    self.validate_block(else_block)?;
                }
                Ok(())
            }
            Statement::Return(ret) => {
                let Some(declared) = self.return_context.clone() else {
                    return Err(CheckError::ReturnOutsideMethod);
                };
                match (&declared, &ret.value) {
                    (Some(_), None) => {
                        return Err(CheckError::MissingReturnValue {
                            method: self.current_method.clone().unwrap_or_default(),
                        })
                    }
                    (None, Some(_)) => self.warnings.push(CheckWarning::new(
                        format!(
                            "method `{}` has no return type but returns a value",
                            self.current_method.as_deref().unwrap_or("this")
                        ),
                        ret.span,
                    )),
                    _ => {}
                }
                if let Some(value) = &ret.value {
                    self.validate_expr(value)?;
                }
                Ok(())
            }
        }
    }

    fn validate_assign(&mut self, assign: &AssignStatement) -> Result<(), CheckError> {
        self.validate_expr(&assign.value)?;

        let (declared, name) = match &assign.target {
            AssignTarget::Name(id) => {
                let symbol = self.symbols.resolve(&id.name).ok_or_else(|| {
                    CheckError::UndeclaredIdentifier {
                        name: id.name.clone(),
                    }
                })?;
                if !matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter) {
                    return Err(CheckError::InvalidAssignTarget {
                        name: id.name.clone(),
                    });
                }
                let declared = symbol.declared_type.clone();
                self.symbols.mark_used(&id.name);
                (declared, id.name.clone())
            }
            AssignTarget::ThisField(id) => {
                if self.current_class.is_none() {
                    return Err(CheckError::ThisOutsideClass);
                }
                let scope = self.class_scope.expect("class scope is set inside a class");
                let symbol = self.symbols.resolve_from_scope(&id.name, scope).ok_or_else(
                    || CheckError::UndeclaredIdentifier {
                        name: id.name.clone(),
                    },
                )?;
                if symbol.kind != SymbolKind::Variable {
                    return Err(CheckError::InvalidAssignTarget {
                        name: id.name.clone(),
                    });
                }
                let declared = symbol.declared_type.clone();
                self.symbols.mark_used_from(&id.name, scope);
                (declared, id.name.clone())
            }
        };

        if let (Some(to), Some(from)) = (declared, self.infer_expr(&assign.value)) {
            if !assignment_compatible(&from, &to) {
                return Err(CheckError::IncompatibleAssignment {
                    target: name,
                    from,
                    to,
                });
            }
        }
        Ok(())
    }

    fn check_condition(&mut self, condition: &Expression) -> Result<(), CheckError> {
        if let Some(found) = self.infer_expr(condition) {
            if found != "Boolean" && found != "Object" {
                return Err(CheckError::ConditionNotBoolean { found });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn validate_expr(&mut self, expr: &Expression) -> Result<(), CheckError> {
        match expr {
            Expression::IntLiteral(_)
            | Expression::RealLiteral(_)
            | Expression::BoolLiteral(_)
            | Expression::StringLiteral(_) => Ok(()),

            Expression::This(_) => {
                if self.current_class.is_none() {
                    return Err(CheckError::ThisOutsideClass);
                }
                Ok(())
            }

            Expression::Identifier(id) => self.validate_identifier(id),

            Expression::Member(member) => {
                self.validate_expr(&member.target)?;
                // Shape check: a bare member access on a built-in receiver
                // must name a zero-argument method.
                if let Some(ty) = self.infer_expr(&member.target) {
                    if let Some(recv) = builtins::classify(&ty) {
                        match builtins::signature_of(&recv, &member.member.name) {
                            Some(sig) if sig.arity != 0 => {
                                return Err(CheckError::BuiltinArity {
                                    ty,
                                    method: member.member.name.clone(),
                                    expected: sig.arity,
                                    found: 0,
                                })
                            }
                            Some(_) => {}
                            None => {
                                return Err(CheckError::UnknownBuiltinMethod {
                                    ty,
                                    method: member.member.name.clone(),
                                })
                            }
                        }
                    }
                }
                Ok(())
            }

            Expression::New(new) => {
                self.validate_new(new)?;
                for arg in &new.args {
                    self.validate_expr(arg)?;
                }
                Ok(())
            }

            Expression::Call(call) => {
                for arg in &call.args {
                    self.validate_expr(arg)?;
                }
                self.validate_call(call)
            }
        }
    }

    fn validate_identifier(&mut self, id: &Identifier) -> Result<(), CheckError> {
        let head = generic_head(&id.name);
        if builtins::is_generic_head(head) {
            // `Array`/`List` heads are always accepted; only the element
            // type needs to resolve.
            if let Some(element) = generic_element(&id.name) {
                let element = element.to_string();
                self.resolve_type_str(&element)?;
            }
            return Ok(());
        }
        if self.symbols.resolve(&id.name).is_none() {
            return Err(CheckError::UndeclaredIdentifier {
                name: id.name.clone(),
            });
        }
        self.symbols.mark_used(&id.name);
        Ok(())
    }

    fn validate_new(&mut self, new: &NewExpr) -> Result<(), CheckError> {
        let head = new.class_name.head().to_string();
        if builtins::is_generic_head(&head) {
            if let Some(element) = new.class_name.element() {
                let element = element.to_string();
                self.resolve_type_str(&element)?;
            }
            return Ok(());
        }
        match self.symbols.resolve(&head) {
            Some(symbol) if symbol.kind == SymbolKind::Class => Ok(()),
            _ => Err(CheckError::UnknownType {
                name: new.class_name.name.clone(),
            }),
        }
    }

    fn validate_call(&mut self, call: &CallExpr) -> Result<(), CheckError> {
        match call.callee.as_ref() {
            Expression::Member(member) => {
                self.validate_expr(&member.target)?;
                let method = member.member.name.as_str();

                // `print` is reachable through any member.
                if method == "print" {
                    if call.args.len() != 1 {
                        return Err(CheckError::BuiltinArity {
                            ty: "print".to_string(),
                            method: "print".to_string(),
                            expected: 1,
                            found: call.args.len(),
                        });
                    }
                    return Ok(());
                }

                let Some(ty) = self.infer_expr(&member.target) else {
                    return Ok(());
                };
                let Some(recv) = builtins::classify(&ty) else {
                    return Ok(());
                };
                let sig = builtins::signature_of(&recv, method).ok_or_else(|| {
                    CheckError::UnknownBuiltinMethod {
                        ty: ty.clone(),
                        method: method.to_string(),
                    }
                })?;
                if sig.arity != call.args.len() {
                    return Err(CheckError::BuiltinArity {
                        ty,
                        method: method.to_string(),
                        expected: sig.arity,
                        found: call.args.len(),
                    });
                }
                // Container indices must be integers.
                if matches!(
                    recv,
                    BuiltinReceiver::Array(_) | BuiltinReceiver::List(_)
                ) && matches!(method, "get" | "set")
                {
                    if let Some(index_ty) = self.infer_expr(&call.args[0]) {
                        if index_ty != "Integer" {
                            return Err(CheckError::IndexNotInteger {
                                method: method.to_string(),
                            });
                        }
                    }
                }
                Ok(())
            }
            Expression::Identifier(id) => {
                if id.name == "print" {
                    if call.args.len() != 1 {
                        return Err(CheckError::BuiltinArity {
                            ty: "print".to_string(),
                            method: "print".to_string(),
                            expected: 1,
                            found: call.args.len(),
                        });
                    }
                    return Ok(());
                }
                self.validate_identifier(id)
            }
            other => self.validate_expr(other),
        }
    }

    // ========================================================================
    // Type inference
    // ========================================================================

    /// Infer the type of an expression; `None` when unknown or void.
    fn infer_expr(&self, expr: &Expression) -> Option<String> {
        match expr {
            Expression::IntLiteral(_) => Some("Integer".to_string()),
            Expression::RealLiteral(_) => Some("Real".to_string()),
            Expression::BoolLiteral(_) => Some("Boolean".to_string()),
            Expression::StringLiteral(_) => Some("String".to_string()),
            Expression::This(_) => self.current_class.clone(),
            Expression::Identifier(id) => self
                .symbols
                .resolve(&id.name)
                .and_then(|s| s.declared_type.clone()),
            Expression::New(new) => Some(new.class_name.name.clone()),
            Expression::Member(member) => {
                let ty = self.infer_expr(&member.target)?;
                self.infer_member(&ty, &member.member.name, None, 0)
            }
            Expression::Call(call) => match call.callee.as_ref() {
                Expression::Member(member) => {
                    let ty = self.infer_expr(&member.target)?;
                    let arg_ty = call.args.first().and_then(|a| self.infer_expr(a));
                    self.infer_member(
                        &ty,
                        &member.member.name,
                        arg_ty.as_deref(),
                        call.args.len(),
                    )
                }
                Expression::Identifier(id) => {
                    if id.name == "print" {
                        return None;
                    }
                    let symbol = self.symbols.resolve(&id.name)?;
                    match symbol.kind {
                        SymbolKind::Class => Some(id.name.clone()),
                        SymbolKind::Method => {
                            let class = self.current_class.as_deref()?;
                            self.info
                                .lookup_method_by_arity(class, &id.name, call.args.len())
                                .and_then(|m| m.ret.clone())
                        }
                        _ => None,
                    }
                }
                _ => None,
            },
        }
    }

    /// Infer the result of `target.member(...)` given the receiver type.
    fn infer_member(
        &self,
        receiver: &str,
        member: &str,
        arg_ty: Option<&str>,
        arity: usize,
    ) -> Option<String> {
        if member == "print" {
            return None;
        }
        if let Some(recv) = builtins::classify(receiver) {
            let sig = builtins::signature_of(&recv, member)?;
            return builtins::resolve_return(receiver, arg_ty, sig.ret);
        }
        // User class: a method first, then a field.
        if let Some(method) = self.info.lookup_method_by_arity(receiver, member, arity) {
            return method.ret.clone();
        }
        if arity == 0 {
            if let Some((_, field)) = self.info.lookup_field(receiver, member) {
                return Some(field.ty.clone());
            }
        }
        None
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Verify that a canonical type name resolves: a known class, or a
    /// recognised generic head whose element type resolves.
    fn resolve_type_str(&mut self, name: &str) -> Result<(), CheckError> {
        let head = generic_head(name);
        if builtins::is_generic_head(head) {
            if let Some(element) = generic_element(name) {
                let element = element.to_string();
                return self.resolve_type_str(&element);
            }
            return Ok(());
        }
        if name.contains('[') {
            // Generic syntax with an unrecognised head.
            return Err(CheckError::UnknownType {
                name: name.to_string(),
            });
        }
        match self.symbols.resolve(name) {
            Some(symbol) if symbol.kind == SymbolKind::Class => Ok(()),
            _ => Err(CheckError::UnknownType {
                name: name.to_string(),
            }),
        }
    }
}

/// Assignment compatibility: same type, either-way `Integer`/`Real`, or an
/// `Object` target.
pub fn assignment_compatible(from: &str, to: &str) -> bool {
    from == to
        || (from == "Integer" && to == "Real")
        || (from == "Real" && to == "Integer")
        || to == "Object"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn check(source: &str) -> Result<Analysis, CheckError> {
        let program = Parser::new(source).parse().expect("parse error");
        analyze(&program)
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let err = check("class A is end class A is end").unwrap_err();
        assert!(matches!(err, CheckError::DuplicateClass { name } if name == "A"));
    }

    #[test]
    fn test_unknown_base_rejected() {
        let err = check("class A extends Missing is end").unwrap_err();
        assert!(matches!(err, CheckError::UnknownBase { .. }));
    }

    #[test]
    fn test_cyclic_inheritance_rejected() {
        let err = check("class A extends B is end class B extends A is end").unwrap_err();
        assert!(matches!(err, CheckError::CyclicInheritance { .. }));
    }

    #[test]
    fn test_undeclared_identifier_rejected() {
        let err = check("class A is method f() is x := Integer(1) end end").unwrap_err();
        assert!(matches!(err, CheckError::UndeclaredIdentifier { name } if name == "x"));
    }

    #[test]
    fn test_return_without_value_rejected() {
        let err = check("class M is method f(): Integer is return end end").unwrap_err();
        assert!(matches!(err, CheckError::MissingReturnValue { method } if method == "f"));
    }

    #[test]
    fn test_return_value_from_typeless_method_warns() {
        let analysis =
            check("class M is method f() is return Integer(1) end end").unwrap();
        assert!(analysis
            .warnings
            .iter()
            .any(|w| w.message.contains("no return type")));
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let err =
            check("class M is method f() is if Integer(1) then return end end end").unwrap_err();
        assert!(matches!(err, CheckError::ConditionNotBoolean { found } if found == "Integer"));
    }

    #[test]
    fn test_builtin_arity_enforced() {
        let err = check(
            "class M is method f() is var x : Integer(1) x := Integer(1).Plus(Integer(1), Integer(2)) end end",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CheckError::BuiltinArity {
                method,
                expected: 1,
                found: 2,
                ..
            } if method == "Plus"
        ));
    }

    #[test]
    fn test_unknown_builtin_method_rejected() {
        let err = check(
            "class M is method f() is var x : Integer(1) x := Integer(1).Frobnicate(Integer(2)) end end",
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::UnknownBuiltinMethod { method, .. } if method == "Frobnicate"));
    }

    #[test]
    fn test_array_index_must_be_integer() {
        let err = check(
            "class M is method f() is var xs : Array[Integer](3) xs.set(Real(1.0), Integer(5)) end end",
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::IndexNotInteger { .. }));
    }

    #[test]
    fn test_incompatible_assignment_rejected() {
        let err = check(
            "class M is method f() is var b : Boolean(true) b := Integer(1) end end",
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::IncompatibleAssignment { .. }));
    }

    #[test]
    fn test_integer_real_assignment_allowed() {
        assert!(check(
            "class M is method f() is var i : Integer(1) i := Real(2.5) i.Plus(Integer(1)) end end",
        )
        .is_ok());
    }

    #[test]
    fn test_virtual_dispatch_program_checks() {
        let source = "class A is method f(): Integer => Integer(1) end \
                      class B extends A is method f(): Integer => Integer(2) end \
                      class M is method main() is var a: A := B() print(a.f()) end end";
        let analysis = check(source).unwrap();
        let b = analysis.info.class("B").unwrap();
        assert_eq!(b.base.as_deref(), Some("A"));
        assert_eq!(b.methods.len(), 1);
    }

    #[test]
    fn test_forward_declaration_pairs_with_definition() {
        let source =
            "class A is method f(): Integer method f(): Integer => Integer(1) end";
        let analysis = check(source).unwrap();
        let a = analysis.info.class("A").unwrap();
        assert_eq!(a.methods.len(), 1);
        assert!(!a.methods[0].is_forward);
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let err = check(
            "class A is method f(): Integer => Integer(1) method f(): Integer => Integer(2) end",
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::DuplicateMethod { name, .. } if name == "f"));
    }

    #[test]
    fn test_overload_by_params_allowed() {
        assert!(check(
            "class A is method f(): Integer => Integer(1) method f(x: Integer): Integer => x end",
        )
        .is_ok());
    }

    #[test]
    fn test_inherited_field_visible_in_subclass() {
        let source = "class A is var x : Integer end \
                      class B extends A is method get(): Integer is return this.x end end";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_unused_variable_warns() {
        let analysis =
            check("class M is method f() is var unused : Integer(1) end end").unwrap();
        assert!(analysis
            .warnings
            .iter()
            .any(|w| w.message.contains("unused variable `unused`")));
    }
}
