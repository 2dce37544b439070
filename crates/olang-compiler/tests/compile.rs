//! End-to-end emission tests: source through parse, check, optimise, and
//! code generation, asserting on descriptors and instruction listings.

use olang_bytecode::{Module, Opcode, StorageType};
use olang_compiler::{compile, CompileOptions, EmitError};
use olang_parser::{analyze, optimize, parse_source};

fn build(source: &str, optimise: bool, start: Option<&str>) -> (Module, Vec<String>) {
    let mut program = parse_source(source).expect("parse error");
    let mut analysis = analyze(&program).expect("check error");
    if optimise {
        optimize(&mut program);
        analysis = analyze(&program).expect("re-check after optimise");
    }
    let options = CompileOptions {
        module_name: "test".to_string(),
        start_class: start.map(str::to_string),
    };
    let output = compile(&program, &analysis.info, &options).expect("emit error");
    (output.module, output.warnings)
}

fn build_module(source: &str) -> Module {
    build(source, false, None).0
}

#[test]
fn test_arithmetic_seed_program() {
    let module = build_module(
        "class C is this() is end method main() is print(Integer(2).Plus(Integer(3))) end end",
    );

    let (_, class) = module.class_by_name("C").unwrap();
    assert_eq!(class.ctors.len(), 1);
    assert_eq!(class.methods.len(), 1);

    let listing = module.disassemble();
    assert!(listing.contains("const.i64 2"));
    assert!(listing.contains("const.i64 3"));
    assert!(listing.contains("iadd"));
    assert!(listing.contains("print 0"));
}

#[test]
fn test_virtual_dispatch_shares_slot() {
    let module = build_module(
        "class A is method f(): Integer => Integer(1) end \
         class B extends A is method f(): Integer => Integer(2) end \
         class M is method main() is var a: A := B() print(a.f()) end end",
    );

    let (a_id, a) = module.class_by_name("A").unwrap();
    let (_, b) = module.class_by_name("B").unwrap();
    assert_eq!(b.base, Some(a_id));
    assert_eq!(a.methods[0].vslot, b.methods[0].vslot);

    let listing = module.disassemble();
    assert!(listing.contains("newobj"));
    assert!(listing.contains("callvirt"));
}

#[test]
fn test_array_seed_boxes_and_unboxes() {
    let module = build_module(
        "class M is method main() is \
           var xs: Array[Integer] := Array[Integer](3) \
           xs.set(Integer(0), Integer(7)) \
           print(xs.get(Integer(0))) \
         end end",
    );

    let listing = module.disassemble();
    assert!(listing.contains("newarr"));
    // set boxes the primitive element before the store
    assert!(listing.contains("box 0"));
    assert!(listing.contains("stelem"));
    // get unboxes after the load
    assert!(listing.contains("ldelem"));
    assert!(listing.contains("unbox 0"));
}

#[test]
fn test_constructor_protocol_prefix() {
    let module = build_module(
        "class A is this() is end end \
         class B extends A is var x : Integer this() is end end",
    );

    let (a_id, _) = module.class_by_name("A").unwrap();
    let (_, b) = module.class_by_name("B").unwrap();
    let code = &b.ctors[0].code;

    // (1) load receiver
    assert_eq!(code[0], Opcode::LoadArg.to_u8());
    assert_eq!(u16::from_le_bytes([code[1], code[2]]), 0);
    // (2) base-class constructor
    assert_eq!(code[3], Opcode::CallCtor.to_u8());
    let base_operand = u32::from_le_bytes([code[4], code[5], code[6], code[7]]);
    assert_eq!(base_operand, a_id);
    // (3) field initialiser follows: ldarg 0, default, stfld
    assert_eq!(code[10], Opcode::LoadArg.to_u8());
    // (5) the last instruction is a return
    assert_eq!(*code.last().unwrap(), Opcode::ReturnVoid.to_u8());
}

#[test]
fn test_root_class_calls_object_ctor() {
    let module = build_module("class A is this() is end end");
    let (_, a) = module.class_by_name("A").unwrap();
    let code = &a.ctors[0].code;
    assert_eq!(code[0], Opcode::LoadArg.to_u8());
    assert_eq!(code[3], Opcode::CallObjectCtor.to_u8());
}

#[test]
fn test_default_ctor_synthesised() {
    let module = build_module("class A is var x : Integer(5) method main() is print(this.x) end end");
    let (_, a) = module.class_by_name("A").unwrap();
    assert_eq!(a.ctors.len(), 1);
    assert!(a.ctors[0].params.is_empty());

    let listing = module.disassemble();
    assert!(listing.contains("const.i64 5"));
    assert!(listing.contains("stfld"));
}

#[test]
fn test_field_default_from_type_name() {
    // `var z: Integer` names a type with no initialiser: Table D default
    let module = build_module(
        "class M is var z: Integer method main() is print(this.z) end end",
    );
    let (_, m) = module.class_by_name("M").unwrap();
    assert_eq!(m.fields[0].ty, StorageType::I64);
    let ctor = &m.ctors[0];
    let listing = module.disassemble();
    assert!(!ctor.code.is_empty());
    assert!(listing.contains("const.i64 0"));
}

#[test]
fn test_entry_synthesis() {
    let (module, warnings) = build(
        "class M is method main() is return end end",
        false,
        None,
    );
    assert!(warnings.is_empty());

    let entry = module.entry.expect("entry point registered");
    let entry_class = &module.classes[entry.class as usize];
    assert_eq!(entry_class.name, "$Entry");

    let main = &entry_class.methods[entry.method as usize];
    assert_eq!(main.name, "Main");
    assert!(main.is_static);
    assert_eq!(main.ret, StorageType::I64);
    assert!(main.params.is_empty());

    // constructs the start class, calls main, returns 0
    let listing = module.disassemble();
    assert!(listing.contains("entry $Entry::Main"));
    assert!(listing.contains("newobj"));
    assert!(listing.contains("const.i64 0"));
}

#[test]
fn test_entry_start_flag_overrides() {
    let module = build(
        "class A is method main() is return end end \
         class B is method main() is return end end",
        false,
        Some("B"),
    )
    .0;
    let entry = module.entry.unwrap();
    let listing = module.disassemble();
    let (b_id, _) = module.class_by_name("B").unwrap();
    assert!(listing.contains(&format!("newobj {}", b_id)));
    assert_eq!(module.classes[entry.class as usize].name, "$Entry");
}

#[test]
fn test_entry_unknown_start_class_fails() {
    let program = parse_source("class A is end").unwrap();
    let analysis = analyze(&program).unwrap();
    let options = CompileOptions {
        module_name: "test".to_string(),
        start_class: Some("Zed".to_string()),
    };
    let err = compile(&program, &analysis.info, &options).unwrap_err();
    assert!(matches!(err, EmitError::UnknownStartClass { name } if name == "Zed"));
}

#[test]
fn test_entry_without_main_warns_and_exits_zero() {
    let (module, warnings) = build("class A is end", false, None);
    assert!(warnings.iter().any(|w| w.contains("main")));
    assert!(module.entry.is_some());
}

#[test]
fn test_entry_falls_back_to_run() {
    let (module, warnings) = build(
        "class A is method run() is return end end",
        false,
        None,
    );
    assert!(warnings.is_empty());
    assert!(module.entry.is_some());
}

#[test]
fn test_entry_cheapest_ctor_with_defaults() {
    let (module, _) = build(
        "class A is \
           this(x: Integer, y: Integer) is end \
           this(x: Integer) is end \
           method main() is return end \
         end",
        false,
        None,
    );
    let listing = module.disassemble();
    // the single-parameter constructor (index 1) wins, with a default arg
    assert!(listing.contains("newobj 0 1"));
}

#[test]
fn test_less_equal_synthesised_from_cgt() {
    let module = build_module(
        "class M is method main() is print(Integer(1).LessEqual(Integer(2))) end end",
    );
    let listing = module.disassemble();
    let icgt = listing.find("icgt").expect("icgt emitted");
    let iceq = listing.find("iceq").expect("iceq emitted");
    assert!(icgt < iceq);
}

#[test]
fn test_numeric_promotion_to_real() {
    let module = build_module(
        "class M is method main() is print(Integer(1).Plus(Real(2.5))) end end",
    );
    let listing = module.disassemble();
    assert!(listing.contains("conv.i2f"));
    assert!(listing.contains("fadd"));
    assert!(!listing.contains("iadd"));
}

#[test]
fn test_list_operations() {
    let module = build_module(
        "class M is method main() is \
           var xs: List[Integer] := List[Integer](Integer(1)) \
           xs.append(Integer(2)) \
           print(xs.head) \
           print(xs.tail.Length) \
         end end",
    );
    let listing = module.disassemble();
    assert!(listing.contains("newlist"));
    assert!(listing.contains("lappend"));
    assert!(listing.contains("lget"));
    assert!(listing.contains("lrange"));
    assert!(listing.contains("llen"));
}

#[test]
fn test_list_of_list_passthrough() {
    // List(xs) where xs is already a list returns the original list
    let module = build_module(
        "class M is method main() is \
           var xs: List[Integer] := List[Integer]() \
           var ys: List[Integer] := List[Integer](xs.tail) \
           print(ys.Length) \
         end end",
    );
    let listing = module.disassemble();
    // exactly one allocation: the first empty list
    assert_eq!(listing.matches("newlist").count(), 1);
}

#[test]
fn test_while_lowering_shape() {
    let module = build_module(
        "class M is method main() is \
           var i: Integer(0) \
           while i.Less(Integer(3)) loop i := i.Plus(Integer(1)) end \
         end end",
    );
    let listing = module.disassemble();
    assert!(listing.contains("brfalse"));
    // the back edge is a negative jump offset
    assert!(listing.contains("jmp -"));
}

#[test]
fn test_if_else_lowering_shape() {
    let module = build_module(
        "class M is method main(b: Boolean) is \
           if b then print(Integer(1)) else print(Integer(2)) end \
         end end",
    );
    let listing = module.disassemble();
    assert!(listing.contains("brfalse"));
    assert!(listing.contains("jmp "));
}

#[test]
fn test_optimised_seed_collapses_if() {
    let (module, _) = build(
        "class M is method main() is if Boolean(true) then print(Integer(1)) else print(Integer(2)) end end end",
        true,
        None,
    );
    let listing = module.disassemble();
    assert!(listing.contains("const.i64 1"));
    assert!(!listing.contains("const.i64 2"));
    assert!(!listing.contains("brfalse"));
}

#[test]
fn test_optimised_seed_drops_field() {
    let (module, _) = build(
        "class M is var z: Integer method main() is return end end",
        true,
        None,
    );
    let (_, m) = module.class_by_name("M").unwrap();
    assert!(m.fields.is_empty());
}

#[test]
fn test_forward_without_definition_fails_at_finalise() {
    let program = parse_source("class A is method f(): Integer end").unwrap();
    let analysis = analyze(&program).unwrap();
    let options = CompileOptions {
        module_name: "test".to_string(),
        start_class: None,
    };
    let err = compile(&program, &analysis.info, &options).unwrap_err();
    assert!(matches!(err, EmitError::MissingBody { name } if name.contains("A.f")));
}

#[test]
fn test_forward_with_definition_compiles() {
    let module = build_module(
        "class A is method f(): Integer method main() is print(this.f()) end method f(): Integer => Integer(3) end",
    );
    let (_, a) = module.class_by_name("A").unwrap();
    assert_eq!(a.methods.len(), 2);
    assert!(a.methods.iter().all(|m| !m.code.is_empty()));
}

#[test]
fn test_overload_dispatch_picks_exact() {
    let module = build_module(
        "class A is \
           method f(x: Integer): Integer => x \
           method f(x: Real): Real => x \
           method main() is print(this.f(Real(1.5))) end \
         end",
    );
    let (_, a) = module.class_by_name("A").unwrap();
    let real_slot = a
        .methods
        .iter()
        .find(|m| m.params == vec![StorageType::F64])
        .unwrap()
        .vslot;
    let listing = module.disassemble();
    assert!(listing.contains(&format!("callvirt 0 {}", real_slot)));
}

#[test]
fn test_inherited_field_offsets() {
    let module = build_module(
        "class A is var x : Integer var y : Integer end \
         class B extends A is var z : Integer \
           method main() is this.z := Integer(1) this.x := Integer(2) end \
         end",
    );
    let listing = module.disassemble();
    // z sits after A's two fields, x at the layout start
    assert!(listing.contains("stfld 2"));
    assert!(listing.contains("stfld 0"));
}

#[test]
fn test_module_roundtrips_through_bytes() {
    let module = build_module(
        "class C is this() is end method main() is print(Integer(2).Plus(Integer(3))) end end",
    );
    let bytes = module.to_bytes();
    let decoded = Module::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.classes.len(), module.classes.len());
    assert_eq!(decoded.entry, module.entry);
    assert_eq!(decoded.disassemble(), module.disassemble());
}

#[test]
fn test_expression_statement_pops_result() {
    let module = build_module(
        "class M is method main() is Integer(1).Plus(Integer(2)) end end",
    );
    let listing = module.disassemble();
    assert!(listing.contains("pop"));
}

#[test]
fn test_void_call_not_popped() {
    let module = build_module(
        "class M is method f() is end method main() is this.f() end end",
    );
    let (_, m) = module.class_by_name("M").unwrap();
    let main = m.methods.iter().find(|mm| mm.name == "main").unwrap();
    assert!(!main.code.contains(&Opcode::Pop.to_u8()));
}
