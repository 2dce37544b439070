//! Per-method build context: the type map the emitter consults at every
//! use site.
//!
//! Bindings keep both the storage type (after erasure: user classes and
//! containers become opaque references) and the *real* source-level type
//! name, so that method dispatch and field lookup can be reconstructed at
//! use sites. For `Array`/`List`-typed slots the element real type is
//! tracked as well, for box-on-store / unbox-on-load at the access points.

use crate::error::{EmitError, EmitResult};
use olang_bytecode::{StorageType, TypeTag};
use olang_parser::ast::{generic_element, generic_head};
use olang_parser::checker::{MethodInfo, ProgramInfo};
use rustc_hash::FxHashMap;

/// Map a canonical type name to its storage erasure.
pub fn resolve_storage(type_name: &str) -> StorageType {
    match generic_head(type_name) {
        "Integer" => StorageType::I64,
        "Real" => StorageType::F64,
        "Boolean" => StorageType::Bool,
        "String" => StorageType::Str,
        "Array" => StorageType::ObjArray,
        "List" => StorageType::List,
        // User classes and unknowns are stored as opaque references.
        _ => StorageType::Object,
    }
}

/// Runtime tag for boxing and printing a primitive of the given type.
pub fn type_tag(type_name: &str) -> TypeTag {
    match type_name {
        "Integer" => TypeTag::Int,
        "Real" => TypeTag::Real,
        "Boolean" => TypeTag::Bool,
        "String" => TypeTag::Str,
        _ => TypeTag::Object,
    }
}

/// A local variable binding.
#[derive(Debug, Clone)]
pub struct LocalBinding {
    pub slot: u16,
    pub storage: StorageType,
    pub real: String,
}

/// A parameter binding; the receiver is index 0 for instance code.
#[derive(Debug, Clone)]
pub struct ParamBinding {
    pub index: u16,
    pub storage: StorageType,
    pub real: String,
}

/// A resolved field reference.
#[derive(Debug, Clone)]
pub struct FieldRef {
    /// Absolute offset in the object layout
    pub offset: u16,
    pub storage: StorageType,
    pub real: String,
}

/// A resolved method reference.
#[derive(Debug, Clone)]
pub struct MethodRef {
    /// Class the declaration was found on
    pub owner: String,
    /// Index within the owner's method table
    pub index: u16,
    /// Canonical parameter type names
    pub params: Vec<String>,
    /// Declared return type name, if any
    pub ret: Option<String>,
}

/// Per-method emitter state.
pub struct BuildContext<'a> {
    pub info: &'a ProgramInfo,
    pub current_class: String,
    /// Declared return type of the method under compilation
    pub return_type: Option<String>,
    locals: FxHashMap<String, LocalBinding>,
    params: FxHashMap<String, ParamBinding>,
    /// Element real types for `Array`/`List`-typed bindings
    element_types: FxHashMap<String, String>,
}

impl<'a> BuildContext<'a> {
    pub fn new(info: &'a ProgramInfo, current_class: impl Into<String>) -> Self {
        Self {
            info,
            current_class: current_class.into(),
            return_type: None,
            locals: FxHashMap::default(),
            params: FxHashMap::default(),
            element_types: FxHashMap::default(),
        }
    }

    /// Bind a local name to a slot, keeping both storage and real type.
    pub fn define_local(&mut self, name: &str, slot: u16, real: &str) {
        if matches!(generic_head(real), "Array" | "List") {
            if let Some(element) = generic_element(real) {
                self.element_types.insert(name.to_string(), element.to_string());
            }
        }
        self.locals.insert(
            name.to_string(),
            LocalBinding {
                slot,
                storage: resolve_storage(real),
                real: real.to_string(),
            },
        );
    }

    /// Bind a parameter name; `index` is 1-based (0 is the receiver).
    pub fn define_parameter(&mut self, name: &str, index: u16, real: &str) {
        if matches!(generic_head(real), "Array" | "List") {
            if let Some(element) = generic_element(real) {
                self.element_types.insert(name.to_string(), element.to_string());
            }
        }
        self.params.insert(
            name.to_string(),
            ParamBinding {
                index,
                storage: resolve_storage(real),
                real: real.to_string(),
            },
        );
    }

    pub fn lookup_local(&self, name: &str) -> Option<&LocalBinding> {
        self.locals.get(name)
    }

    pub fn lookup_param(&self, name: &str) -> Option<&ParamBinding> {
        self.params.get(name)
    }

    /// Element real type recorded for an `Array`/`List`-typed binding.
    pub fn element_type(&self, name: &str) -> Option<&str> {
        self.element_types.get(name).map(String::as_str)
    }

    /// Snapshot of the local bindings; restore on block exit so an inner
    /// declaration does not outlive its block.
    pub fn save_locals(&self) -> (FxHashMap<String, LocalBinding>, FxHashMap<String, String>) {
        (self.locals.clone(), self.element_types.clone())
    }

    pub fn restore_locals(
        &mut self,
        saved: (FxHashMap<String, LocalBinding>, FxHashMap<String, String>),
    ) {
        self.locals = saved.0;
        self.element_types = saved.1;
    }

    /// Cascading field lookup through the base chain.
    pub fn find_field(&self, class: &str, name: &str) -> EmitResult<FieldRef> {
        let (_, field) = self.info.lookup_field(class, name).ok_or_else(|| {
            EmitError::UnresolvedField {
                class: class.to_string(),
                name: name.to_string(),
            }
        })?;
        let offset = self
            .info
            .field_offset(class, name)
            .expect("offset exists for resolved field");
        Ok(FieldRef {
            offset,
            storage: resolve_storage(&field.ty),
            real: field.ty.clone(),
        })
    }

    /// Overload resolution for a method call.
    ///
    /// 1. exact match on arity and parameter types (name equality);
    /// 2. failing that, same name and arity with any parameter types
    ///    (arguments stored as opaque `Object` lose their real types);
    /// 3. failing that, recurse into the base class.
    pub fn find_method(
        &self,
        owner: &str,
        name: &str,
        args: &[Option<String>],
    ) -> Option<MethodRef> {
        let class = self.info.class(owner)?;

        let exact = |m: &MethodInfo| {
            m.name == name
                && m.params.len() == args.len()
                && m.params
                    .iter()
                    .zip(args)
                    .all(|(p, a)| a.as_deref() == Some(p.as_str()))
        };
        if let Some((index, method)) = class.methods.iter().enumerate().find(|(_, m)| exact(m)) {
            return Some(self.method_ref(owner, index, method));
        }

        if let Some((index, method)) = class
            .methods
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name && m.params.len() == args.len())
        {
            return Some(self.method_ref(owner, index, method));
        }

        let base = class.base.as_deref()?;
        self.find_method(base, name, args)
    }

    fn method_ref(&self, owner: &str, index: usize, method: &MethodInfo) -> MethodRef {
        MethodRef {
            owner: owner.to_string(),
            index: index as u16,
            params: method.params.clone(),
            ret: method.ret.clone(),
        }
    }

    /// Overload resolution for a constructor, mirroring [`Self::find_method`]
    /// without the base-class recursion. A class with no declared
    /// constructors exposes the synthesised parameterless default at index 0.
    pub fn find_constructor(&self, class: &str, args: &[Option<String>]) -> Option<u16> {
        let info = self.info.class(class)?;

        if info.ctors.is_empty() {
            return args.is_empty().then_some(0);
        }

        if let Some(index) = info.ctors.iter().position(|c| {
            c.params.len() == args.len()
                && c.params
                    .iter()
                    .zip(args)
                    .all(|(p, a)| a.as_deref() == Some(p.as_str()))
        }) {
            return Some(index as u16);
        }

        info.ctors
            .iter()
            .position(|c| c.params.len() == args.len())
            .map(|i| i as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olang_parser::{analyze, parse_source};

    fn info_for(source: &str) -> ProgramInfo {
        let program = parse_source(source).expect("parse error");
        analyze(&program).expect("check error").info
    }

    #[test]
    fn test_resolve_storage() {
        assert_eq!(resolve_storage("Integer"), StorageType::I64);
        assert_eq!(resolve_storage("Real"), StorageType::F64);
        assert_eq!(resolve_storage("Boolean"), StorageType::Bool);
        assert_eq!(resolve_storage("String"), StorageType::Str);
        assert_eq!(resolve_storage("Array[Integer]"), StorageType::ObjArray);
        assert_eq!(resolve_storage("List[Point]"), StorageType::List);
        assert_eq!(resolve_storage("Point"), StorageType::Object);
        assert_eq!(resolve_storage("Whatever"), StorageType::Object);
    }

    #[test]
    fn test_bindings_keep_real_types() {
        let info = info_for("class A is end");
        let mut ctx = BuildContext::new(&info, "A");
        ctx.define_local("p", 0, "A");
        ctx.define_parameter("xs", 1, "Array[Integer]");

        let local = ctx.lookup_local("p").unwrap();
        assert_eq!(local.storage, StorageType::Object);
        assert_eq!(local.real, "A");

        let param = ctx.lookup_param("xs").unwrap();
        assert_eq!(param.index, 1);
        assert_eq!(param.storage, StorageType::ObjArray);
        assert_eq!(ctx.element_type("xs"), Some("Integer"));
    }

    #[test]
    fn test_find_field_cascades() {
        let info = info_for(
            "class A is var x : Integer end class B extends A is var y : Real end",
        );
        let ctx = BuildContext::new(&info, "B");

        let x = ctx.find_field("B", "x").unwrap();
        assert_eq!(x.offset, 0);
        assert_eq!(x.storage, StorageType::I64);

        let y = ctx.find_field("B", "y").unwrap();
        assert_eq!(y.offset, 1);

        assert!(ctx.find_field("B", "z").is_err());
    }

    #[test]
    fn test_overload_resolution_exact_then_relaxed() {
        let info = info_for(
            "class A is \
               method f(x: Integer): Integer => x \
               method f(x: Real): Real => x \
             end",
        );
        let ctx = BuildContext::new(&info, "A");

        let exact = ctx
            .find_method("A", "f", &[Some("Real".to_string())])
            .unwrap();
        assert_eq!(exact.params, vec!["Real".to_string()]);
        assert_eq!(exact.index, 1);

        // Unknown argument type falls back to the first arity match.
        let relaxed = ctx.find_method("A", "f", &[None]).unwrap();
        assert_eq!(relaxed.index, 0);
    }

    #[test]
    fn test_overload_resolution_is_deterministic() {
        let info = info_for(
            "class A is method f(x: Integer): Integer => x method f(x: Real): Real => x end",
        );
        let ctx = BuildContext::new(&info, "A");
        let args = vec![Some("Integer".to_string())];
        let first = ctx.find_method("A", "f", &args).unwrap();
        for _ in 0..10 {
            assert_eq!(ctx.find_method("A", "f", &args).unwrap().index, first.index);
        }
    }

    #[test]
    fn test_method_resolution_recurses_into_base() {
        let info = info_for(
            "class A is method f(): Integer => Integer(1) end class B extends A is end",
        );
        let ctx = BuildContext::new(&info, "B");
        let found = ctx.find_method("B", "f", &[]).unwrap();
        assert_eq!(found.owner, "A");
    }

    #[test]
    fn test_constructor_resolution() {
        let info = info_for(
            "class A is this(x: Integer) is end this(x: Integer, y: Integer) is end end \
             class B is end",
        );
        let ctx = BuildContext::new(&info, "A");

        assert_eq!(
            ctx.find_constructor("A", &[Some("Integer".to_string())]),
            Some(0)
        );
        assert_eq!(
            ctx.find_constructor(
                "A",
                &[Some("Integer".to_string()), Some("Integer".to_string())]
            ),
            Some(1)
        );
        assert_eq!(ctx.find_constructor("A", &[]), None);

        // no declared constructors: the synthesised default is index 0
        assert_eq!(ctx.find_constructor("B", &[]), Some(0));
        assert_eq!(ctx.find_constructor("B", &[None]), None);
    }
}
