//! End-to-end front-end tests: lexing and parsing whole programs.

use olang_parser::ast::*;
use olang_parser::{parse_source, Parser};

fn first_method(program: &Program) -> &MethodDecl {
    program.classes[0]
        .methods()
        .next()
        .expect("expected a method")
}

fn method_block(method: &MethodDecl) -> &Block {
    match &method.body {
        MethodBody::Block(block) => block,
        other => panic!("expected block body, got {:?}", other),
    }
}

#[test]
fn test_minimal_program() {
    let program = parse_source(
        "class C is this() is end method main() is print(Integer(2).Plus(Integer(3))) end end",
    )
    .unwrap();

    let class = &program.classes[0];
    assert_eq!(class.name.name, "C");
    assert!(class.base.is_none());
    assert_eq!(class.constructors().count(), 1);
    assert_eq!(class.methods().count(), 1);
}

#[test]
fn test_extends_clause() {
    let program = parse_source("class B extends A is end class A is end").unwrap();
    assert_eq!(program.classes[0].base.as_ref().unwrap().name, "A");
}

#[test]
fn test_class_boundary_recovery() {
    // The first class is missing its `end`; the parser stops at `class`
    // and the outer loop picks up the next declaration.
    let program = parse_source("class A is var x : Integer class B is end").unwrap();
    assert_eq!(program.classes.len(), 2);
    assert_eq!(program.classes[0].name.name, "A");
    assert_eq!(program.classes[0].fields().count(), 1);
    assert_eq!(program.classes[1].name.name, "B");
}

#[test]
fn test_keyword_as_parameter_and_variable_name() {
    let program = parse_source(
        "class A is method f(loop: Integer, then: Real) is var end : Integer(1) end end",
    )
    .unwrap();
    let method = first_method(&program);
    assert_eq!(method.params[0].name.name, "loop");
    assert_eq!(method.params[1].name.name, "then");
    assert_eq!(method_block(method).locals[0].name.name, "end");
}

#[test]
fn test_keyword_as_identifier_expression() {
    // `extends` is not in the termination set, so it can appear as an
    // identifier expression after `return`.
    let program = parse_source(
        "class A is method f(extends: Integer): Integer is return extends.Plus(Integer(1)) end end",
    )
    .unwrap();
    let method = first_method(&program);
    let Statement::Return(ret) = &method_block(method).statements[0] else {
        panic!("expected return");
    };
    let Some(Expression::Call(call)) = &ret.value else {
        panic!("expected call");
    };
    let Expression::Member(member) = call.callee.as_ref() else {
        panic!("expected member callee");
    };
    assert!(matches!(
        member.target.as_ref(),
        Expression::Identifier(id) if id.name == "extends"
    ));
}

#[test]
fn test_return_before_termination_keyword_takes_no_value() {
    // `class` is in the termination set: `return class` parses as a bare
    // return followed by the next statement.
    let program = parse_source(
        "class A is method f(class: Integer) is return class.Plus(Integer(1)) end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    assert!(matches!(
        &block.statements[0],
        Statement::Return(r) if r.value.is_none()
    ));
    assert!(matches!(&block.statements[1], Statement::Expression(_)));
}

#[test]
fn test_method_body_forms() {
    let program = parse_source(
        "class A is method fwd(): Integer method arrow(): Integer => Integer(1) method block() is end end",
    )
    .unwrap();
    let methods: Vec<&MethodDecl> = program.classes[0].methods().collect();
    assert!(matches!(methods[0].body, MethodBody::Forward));
    assert!(matches!(methods[1].body, MethodBody::Arrow(_)));
    assert!(matches!(methods[2].body, MethodBody::Block(_)));
}

#[test]
fn test_canonical_generic_type_names() {
    let program = parse_source(
        "class A is method f(xs: Array[Integer], m: Pair[Integer,Real]) is end end",
    )
    .unwrap();
    let method = first_method(&program);
    assert_eq!(method.params[0].type_name.name, "Array[Integer]");
    assert_eq!(method.params[1].type_name.name, "Pair[Integer,Real]");
    assert_eq!(method.params[0].type_name.head(), "Array");
    assert_eq!(method.params[0].type_name.element(), Some("Integer"));
}

#[test]
fn test_var_decl_shapes() {
    let program = parse_source(
        "class A is method f() is \
           var a : Integer \
           var b : Integer(5) \
           var c : Real := Integer(1).toReal \
         end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    let locals = &block.locals;

    assert_eq!(locals[0].declared_type.as_ref().unwrap().name, "Integer");
    assert!(locals[0].init.is_none());

    assert!(locals[1].declared_type.is_none());
    assert!(matches!(locals[1].init, Some(Expression::New(_))));

    assert_eq!(locals[2].declared_type.as_ref().unwrap().name, "Real");
    assert!(locals[2].init.is_some());
}

#[test]
fn test_builtin_call_becomes_new() {
    let program = parse_source(
        "class A is method f() is var xs : Array[Integer](3) end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    let Some(Expression::New(new)) = &block.locals[0].init else {
        panic!("expected New");
    };
    assert_eq!(new.class_name.name, "Array[Integer]");
    assert_eq!(new.args.len(), 1);
}

#[test]
fn test_user_class_call_stays_call() {
    let program = parse_source("class A is method f() is var a : A := B() end end").unwrap();
    let block = method_block(first_method(&program));
    assert!(matches!(
        &block.locals[0].init,
        Some(Expression::Call(call))
            if matches!(call.callee.as_ref(), Expression::Identifier(id) if id.name == "B")
    ));
}

#[test]
fn test_negated_literals() {
    let program = parse_source(
        "class A is method f() is var x : Integer(-5) var y : Real(-2.5) end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    let Some(Expression::New(new_x)) = &block.locals[0].init else {
        panic!("expected New");
    };
    assert!(matches!(&new_x.args[0], Expression::IntLiteral(lit) if lit.value == -5));
    let Some(Expression::New(new_y)) = &block.locals[1].init else {
        panic!("expected New");
    };
    assert!(matches!(&new_y.args[0], Expression::RealLiteral(lit) if lit.value == -2.5));
}

#[test]
fn test_assignment_lookahead() {
    let program = parse_source(
        "class A is var x : Integer method f(y: Integer) is y := Integer(1) this.x := y end end",
    )
    .unwrap();
    let method = program.classes[0].methods().next().unwrap();
    let block = method_block(method);
    assert!(matches!(
        &block.statements[0],
        Statement::Assign(a) if matches!(&a.target, AssignTarget::Name(id) if id.name == "y")
    ));
    assert!(matches!(
        &block.statements[1],
        Statement::Assign(a) if matches!(&a.target, AssignTarget::ThisField(id) if id.name == "x")
    ));
}

#[test]
fn test_while_and_if_statements() {
    let program = parse_source(
        "class A is method f(n: Integer) is \
           while n.Less(Integer(10)) loop n := n.Plus(Integer(1)) end \
           if n.Equal(Integer(10)) then print(n) else print(Integer(0)) end \
         end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    assert!(matches!(&block.statements[0], Statement::While(_)));
    let Statement::If(if_stmt) = &block.statements[1] else {
        panic!("expected if");
    };
    assert!(if_stmt.else_block.is_some());
}

#[test]
fn test_return_value_stopped_by_termination_set() {
    let program = parse_source(
        "class A is method f() is return end method g(): Integer is return Integer(1) end end",
    )
    .unwrap();
    let methods: Vec<&MethodDecl> = program.classes[0].methods().collect();
    let Statement::Return(r0) = &method_block(methods[0]).statements[0] else {
        panic!();
    };
    assert!(r0.value.is_none());
    let Statement::Return(r1) = &method_block(methods[1]).statements[0] else {
        panic!();
    };
    assert!(r1.value.is_some());
}

#[test]
fn test_block_interleaving_is_faithful() {
    let program = parse_source(
        "class A is method f() is \
           var x : Integer(1) \
           print(x) \
           var y : Integer(2) \
           print(y) \
         end end",
    )
    .unwrap();
    let block = method_block(first_method(&program));
    assert_eq!(block.body.len(), 4);
    assert!(matches!(&block.body[0], BlockItem::Var(v) if v.name.name == "x"));
    assert!(matches!(&block.body[1], BlockItem::Stmt(_)));
    assert!(matches!(&block.body[2], BlockItem::Var(v) if v.name.name == "y"));
    assert!(matches!(&block.body[3], BlockItem::Stmt(_)));
    assert_eq!(block.locals.len(), 2);
    assert_eq!(block.statements.len(), 2);
}

#[test]
fn test_chained_calls() {
    let program = parse_source(
        "class A is method f(): Integer => Integer(1).Plus(Integer(2)).Mult(Integer(3)) end",
    )
    .unwrap();
    let method = first_method(&program);
    let MethodBody::Arrow(Expression::Call(outer)) = &method.body else {
        panic!("expected arrow call");
    };
    let Expression::Member(outer_member) = outer.callee.as_ref() else {
        panic!();
    };
    assert_eq!(outer_member.member.name, "Mult");
    assert!(matches!(
        outer_member.target.as_ref(),
        Expression::Call(_)
    ));
}

#[test]
fn test_syntax_error_carries_token_index() {
    let err = Parser::new("class A extends is end").parse().unwrap_err();
    assert_eq!(err.token_index, 3);
    assert!(err.message.contains("expected"));
}

#[test]
fn test_semicolons_are_tolerated_between_statements() {
    let program = parse_source(
        "class M is var z: Integer; method main() is print(Integer(1)); return end end",
    )
    .unwrap();
    let class = &program.classes[0];
    assert_eq!(class.fields().count(), 1);
    assert_eq!(method_block(class.methods().next().unwrap()).statements.len(), 2);
}
