//! Analysis output consumed by the emitter.
//!
//! The check pass produces a [`ProgramInfo`] registry: per class its base,
//! ordered fields (with declared-or-inferred type names), constructor
//! signatures, and method signatures. The emitter's build context layers
//! overload resolution and slot assignment on top of this data.

use rustc_hash::FxHashMap;

/// Per-program class registry, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ProgramInfo {
    pub classes: FxHashMap<String, ClassInfo>,
    pub order: Vec<String>,
}

/// Collected signature information for one class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub base: Option<String>,
    /// Own fields in source order; base fields precede them in the layout
    pub fields: Vec<FieldInfo>,
    pub ctors: Vec<CtorInfo>,
    pub methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    /// Declared or inferred type name; `Object` when unknown
    pub ty: String,
}

#[derive(Debug, Clone)]
pub struct CtorInfo {
    /// Canonical parameter type names
    pub params: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    /// Canonical parameter type names
    pub params: Vec<String>,
    /// Declared return type name, if any
    pub ret: Option<String>,
    /// True while only a forward declaration has been seen
    pub is_forward: bool,
}

impl ProgramInfo {
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    /// The inheritance chain above `name`, nearest base first.
    ///
    /// Only program classes appear; a built-in base ends the chain.
    pub fn base_chain(&self, name: &str) -> Vec<&ClassInfo> {
        let mut chain = Vec::new();
        let mut cur = self.class(name).and_then(|c| c.base.as_deref());
        while let Some(base_name) = cur {
            match self.class(base_name) {
                Some(base) => {
                    chain.push(base);
                    cur = base.base.as_deref();
                }
                None => break,
            }
        }
        chain
    }

    /// Total number of fields in the object layout of `name`, including
    /// inherited ones.
    pub fn total_field_count(&self, name: &str) -> usize {
        let Some(class) = self.class(name) else {
            return 0;
        };
        let base = class
            .base
            .as_deref()
            .map(|b| self.total_field_count(b))
            .unwrap_or(0);
        base + class.fields.len()
    }

    /// Cascading field lookup: search `class`, then its base chain.
    ///
    /// Returns the owning class and the field.
    pub fn lookup_field(&self, class: &str, field: &str) -> Option<(&ClassInfo, &FieldInfo)> {
        let mut cur = self.class(class);
        while let Some(info) = cur {
            if let Some(f) = info.fields.iter().find(|f| f.name == field) {
                return Some((info, f));
            }
            cur = info.base.as_deref().and_then(|b| self.class(b));
        }
        None
    }

    /// Absolute object-layout offset of `field` as seen from `class`.
    ///
    /// Base fields come first: the offset is the owning class's inherited
    /// field count plus the field's index within the owner.
    pub fn field_offset(&self, class: &str, field: &str) -> Option<u16> {
        let (owner, _) = self.lookup_field(class, field)?;
        let index = owner.fields.iter().position(|f| f.name == field)?;
        let base = owner
            .base
            .as_deref()
            .map(|b| self.total_field_count(b))
            .unwrap_or(0);
        Some((base + index) as u16)
    }

    /// First method matching `name` and `arity`, searching `class` and then
    /// its base chain. Used by type inference; full overload resolution by
    /// parameter types lives in the emitter's build context.
    pub fn lookup_method_by_arity(
        &self,
        class: &str,
        name: &str,
        arity: usize,
    ) -> Option<&MethodInfo> {
        let mut cur = self.class(class);
        while let Some(info) = cur {
            if let Some(m) = info
                .methods
                .iter()
                .find(|m| m.name == name && m.params.len() == arity)
            {
                return Some(m);
            }
            cur = info.base.as_deref().and_then(|b| self.class(b));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: &str) -> FieldInfo {
        FieldInfo {
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }

    fn sample() -> ProgramInfo {
        let mut info = ProgramInfo::default();
        info.order = vec!["A".to_string(), "B".to_string()];
        info.classes.insert(
            "A".to_string(),
            ClassInfo {
                name: "A".to_string(),
                base: None,
                fields: vec![field("x", "Integer"), field("y", "Real")],
                ctors: vec![],
                methods: vec![MethodInfo {
                    name: "f".to_string(),
                    params: vec![],
                    ret: Some("Integer".to_string()),
                    is_forward: false,
                }],
            },
        );
        info.classes.insert(
            "B".to_string(),
            ClassInfo {
                name: "B".to_string(),
                base: Some("A".to_string()),
                fields: vec![field("z", "Boolean")],
                ctors: vec![],
                methods: vec![],
            },
        );
        info
    }

    #[test]
    fn test_base_chain() {
        let info = sample();
        let chain: Vec<&str> = info.base_chain("B").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(chain, vec!["A"]);
        assert!(info.base_chain("A").is_empty());
    }

    #[test]
    fn test_field_offsets_follow_layout() {
        let info = sample();
        assert_eq!(info.field_offset("A", "x"), Some(0));
        assert_eq!(info.field_offset("A", "y"), Some(1));
        // B's own field sits after A's two fields
        assert_eq!(info.field_offset("B", "z"), Some(2));
        // inherited lookup cascades
        assert_eq!(info.field_offset("B", "x"), Some(0));
        assert_eq!(info.field_offset("B", "missing"), None);
    }

    #[test]
    fn test_method_lookup_cascades() {
        let info = sample();
        let m = info.lookup_method_by_arity("B", "f", 0).unwrap();
        assert_eq!(m.ret.as_deref(), Some("Integer"));
        assert!(info.lookup_method_by_arity("B", "f", 2).is_none());
    }
}
