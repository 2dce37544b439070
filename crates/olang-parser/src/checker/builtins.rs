//! Built-in method tables for the primitive and container classes.
//!
//! Both the analyzer's shape check and the two type-inference walks (the
//! analyzer's and the emitter's) consult these fixed tables; the dispatch
//! onto stack-machine instructions is keyed off the same names.

use crate::ast::{generic_element, generic_head};

/// Built-in receiver classification of an inferred type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinReceiver {
    Integer,
    Real,
    Boolean,
    /// `Array[T]`, carrying the element type name
    Array(String),
    /// `List[T]`, carrying the element type name
    List(String),
}

/// Classify a type name as a built-in receiver, if it is one.
pub fn classify(type_name: &str) -> Option<BuiltinReceiver> {
    match generic_head(type_name) {
        "Integer" => Some(BuiltinReceiver::Integer),
        "Real" => Some(BuiltinReceiver::Real),
        "Boolean" => Some(BuiltinReceiver::Boolean),
        "Array" => Some(BuiltinReceiver::Array(
            generic_element(type_name).unwrap_or("Object").to_string(),
        )),
        "List" => Some(BuiltinReceiver::List(
            generic_element(type_name).unwrap_or("Object").to_string(),
        )),
        _ => None,
    }
}

/// Whether `name` is one of the two recognised generic heads.
pub fn is_generic_head(name: &str) -> bool {
    matches!(name, "Array" | "List")
}

/// Return-type rule of a built-in method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinReturn {
    /// Same type as the receiver (`UnaryMinus`, `append`, `tail`)
    Receiver,
    /// Numeric promotion of receiver and argument (`Plus`, `Div`, ...)
    Promoted,
    /// `Boolean` (comparisons, logic)
    Boolean,
    /// `Integer` (`toInteger`, `Length`)
    Integer,
    /// `Real` (`toReal`)
    Real,
    /// The container's element type (`get`, `head`)
    Element,
    /// No value (`set`)
    Void,
}

/// Signature of a built-in method: argument count plus return rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSig {
    pub arity: usize,
    pub ret: BuiltinReturn,
}

const fn sig(arity: usize, ret: BuiltinReturn) -> BuiltinSig {
    BuiltinSig { arity, ret }
}

/// Look up the signature of `method` on a built-in receiver.
pub fn signature_of(receiver: &BuiltinReceiver, method: &str) -> Option<BuiltinSig> {
    use BuiltinReturn::*;
    match receiver {
        BuiltinReceiver::Integer => match method {
            "Plus" | "Minus" | "Mult" | "Div" | "Rem" => Some(sig(1, Promoted)),
            "Less" | "Greater" | "LessEqual" | "GreaterEqual" | "Equal" => {
                Some(sig(1, Boolean))
            }
            "UnaryMinus" => Some(sig(0, Receiver)),
            "toReal" => Some(sig(0, Real)),
            "toBoolean" => Some(sig(0, Boolean)),
            _ => None,
        },
        BuiltinReceiver::Real => match method {
            "Plus" | "Minus" | "Mult" | "Div" => Some(sig(1, Promoted)),
            "Less" | "Greater" | "LessEqual" | "GreaterEqual" | "Equal" => {
                Some(sig(1, Boolean))
            }
            "UnaryMinus" => Some(sig(0, Receiver)),
            "toInteger" => Some(sig(0, Integer)),
            _ => None,
        },
        BuiltinReceiver::Boolean => match method {
            "And" | "Or" | "Xor" => Some(sig(1, Boolean)),
            "Not" => Some(sig(0, Boolean)),
            "toInteger" => Some(sig(0, Integer)),
            _ => None,
        },
        BuiltinReceiver::Array(_) => match method {
            "get" => Some(sig(1, Element)),
            "set" => Some(sig(2, Void)),
            "Length" => Some(sig(0, Integer)),
            _ => None,
        },
        BuiltinReceiver::List(_) => match method {
            "append" => Some(sig(1, Receiver)),
            "head" => Some(sig(0, Element)),
            "tail" => Some(sig(0, Receiver)),
            "Length" => Some(sig(0, Integer)),
            "get" => Some(sig(1, Element)),
            _ => None,
        },
    }
}

/// Resolve a built-in return rule to a concrete type name.
///
/// `receiver_type` is the canonical inferred type of the receiver;
/// `arg_type` is the inferred type of the single argument for binary
/// operations (used by numeric promotion). Returns `None` for `Void`.
pub fn resolve_return(
    receiver_type: &str,
    arg_type: Option<&str>,
    ret: BuiltinReturn,
) -> Option<String> {
    match ret {
        BuiltinReturn::Receiver => Some(receiver_type.to_string()),
        BuiltinReturn::Promoted => {
            if receiver_type == "Real" || arg_type == Some("Real") {
                Some("Real".to_string())
            } else {
                Some("Integer".to_string())
            }
        }
        BuiltinReturn::Boolean => Some("Boolean".to_string()),
        BuiltinReturn::Integer => Some("Integer".to_string()),
        BuiltinReturn::Real => Some("Real".to_string()),
        BuiltinReturn::Element => Some(
            generic_element(receiver_type)
                .unwrap_or("Object")
                .to_string(),
        ),
        BuiltinReturn::Void => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("Integer"), Some(BuiltinReceiver::Integer));
        assert_eq!(
            classify("Array[Integer]"),
            Some(BuiltinReceiver::Array("Integer".to_string()))
        );
        assert_eq!(
            classify("List[List[Real]]"),
            Some(BuiltinReceiver::List("List[Real]".to_string()))
        );
        assert_eq!(classify("Point"), None);
    }

    #[test]
    fn test_integer_table() {
        let recv = BuiltinReceiver::Integer;
        assert_eq!(signature_of(&recv, "Plus").unwrap().arity, 1);
        assert_eq!(signature_of(&recv, "Rem").unwrap().arity, 1);
        assert_eq!(signature_of(&recv, "UnaryMinus").unwrap().arity, 0);
        assert_eq!(signature_of(&recv, "toReal").unwrap().arity, 0);
        assert!(signature_of(&recv, "toInteger").is_none());
        assert!(signature_of(&recv, "append").is_none());
    }

    #[test]
    fn test_real_has_no_rem() {
        assert!(signature_of(&BuiltinReceiver::Real, "Rem").is_none());
        assert!(signature_of(&BuiltinReceiver::Real, "Div").is_some());
    }

    #[test]
    fn test_container_tables() {
        let arr = BuiltinReceiver::Array("Integer".to_string());
        assert_eq!(signature_of(&arr, "get").unwrap().arity, 1);
        assert_eq!(signature_of(&arr, "set").unwrap().arity, 2);
        assert_eq!(signature_of(&arr, "Length").unwrap().arity, 0);
        assert!(signature_of(&arr, "append").is_none());

        let list = BuiltinReceiver::List("Integer".to_string());
        assert_eq!(signature_of(&list, "append").unwrap().arity, 1);
        assert_eq!(signature_of(&list, "tail").unwrap().arity, 0);
        assert_eq!(signature_of(&list, "head").unwrap().arity, 0);
    }

    #[test]
    fn test_resolve_return_promotion() {
        assert_eq!(
            resolve_return("Integer", Some("Real"), BuiltinReturn::Promoted),
            Some("Real".to_string())
        );
        assert_eq!(
            resolve_return("Integer", Some("Integer"), BuiltinReturn::Promoted),
            Some("Integer".to_string())
        );
        assert_eq!(
            resolve_return("Real", None, BuiltinReturn::Promoted),
            Some("Real".to_string())
        );
    }

    #[test]
    fn test_resolve_return_element() {
        assert_eq!(
            resolve_return("Array[Integer]", None, BuiltinReturn::Element),
            Some("Integer".to_string())
        );
        assert_eq!(resolve_return("Array[Integer]", None, BuiltinReturn::Void), None);
    }
}
