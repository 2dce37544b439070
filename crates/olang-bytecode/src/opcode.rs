//! Instruction set for the O stack machine.
//!
//! All opcodes are single-byte instructions. Operands, when present, follow
//! the opcode byte in the code stream (little-endian).
//!
//! Opcodes are organized into categories:
//! - 0x00-0x0F: Stack manipulation & constants
//! - 0x10-0x1F: Arguments & local variables
//! - 0x20-0x2F: Integer arithmetic
//! - 0x30-0x3F: Real arithmetic
//! - 0x40-0x4F: Numeric/boolean conversions
//! - 0x50-0x5F: Integer comparison
//! - 0x60-0x6F: Real comparison
//! - 0x70-0x7F: Boolean logic
//! - 0x80-0x8F: Boxing
//! - 0x90-0x9F: Control flow
//! - 0xA0-0xAF: Calls & returns
//! - 0xB0-0xBF: Object operations
//! - 0xC0-0xCF: Array operations
//! - 0xD0-0xDF: List operations
//! - 0xE0-0xEF: Output
//!
//! Booleans are machine integers (0 or 1) so that comparison results can be
//! re-compared with integer instructions; `LessEqual`/`GreaterEqual` are
//! synthesised as `Icgt`/`Iclt` followed by a compare-with-zero.

/// Bytecode opcode enumeration.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Constants (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,
    /// Swap top two stack values
    Swap = 0x03,

    /// Push null reference
    ConstNull = 0x04,
    /// Push boolean true
    ConstTrue = 0x05,
    /// Push boolean false
    ConstFalse = 0x06,
    /// Push 64-bit integer constant (operand: i64)
    ConstI64 = 0x07,
    /// Push 64-bit real constant (operand: f64)
    ConstF64 = 0x08,
    /// Push string constant from pool (operand: u32 index)
    ConstStr = 0x09,

    // ===== Arguments & Local Variables (0x10-0x1F) =====
    /// Load argument onto stack; argument 0 is the receiver (operand: u16)
    LoadArg = 0x10,
    /// Store top of stack to argument slot (operand: u16)
    StoreArg = 0x11,
    /// Load local variable onto stack (operand: u16)
    LoadLocal = 0x12,
    /// Store top of stack to local variable (operand: u16)
    StoreLocal = 0x13,

    // ===== Integer Arithmetic (0x20-0x2F) =====
    /// Integer addition: pop b, pop a, push a + b
    Iadd = 0x20,
    /// Integer subtraction: pop b, pop a, push a - b
    Isub = 0x21,
    /// Integer multiplication: pop b, pop a, push a * b
    Imul = 0x22,
    /// Integer division: pop b, pop a, push a / b
    Idiv = 0x23,
    /// Integer remainder: pop b, pop a, push a % b
    Irem = 0x24,
    /// Integer negation: pop a, push -a
    Ineg = 0x25,

    // ===== Real Arithmetic (0x30-0x3F) =====
    /// Real addition: pop b, pop a, push a + b
    Fadd = 0x30,
    /// Real subtraction: pop b, pop a, push a - b
    Fsub = 0x31,
    /// Real multiplication: pop b, pop a, push a * b
    Fmul = 0x32,
    /// Real division: pop b, pop a, push a / b
    Fdiv = 0x33,
    /// Real negation: pop a, push -a
    Fneg = 0x34,

    // ===== Conversions (0x40-0x4F) =====
    /// Integer to real: pop i64, push f64
    ConvI2F = 0x40,
    /// Real to integer (truncating): pop f64, push i64
    ConvF2I = 0x41,
    /// Integer to boolean (non-zero test): pop i64, push 0/1
    ConvI2B = 0x42,
    /// Boolean to integer: pop 0/1, push i64
    ConvB2I = 0x43,

    // ===== Integer Comparison (0x50-0x5F) =====
    /// Integer equality: pop b, pop a, push a == b
    Iceq = 0x50,
    /// Integer less than: pop b, pop a, push a < b
    Iclt = 0x51,
    /// Integer greater than: pop b, pop a, push a > b
    Icgt = 0x52,

    // ===== Real Comparison (0x60-0x6F) =====
    /// Real equality: pop b, pop a, push a == b
    Fceq = 0x60,
    /// Real less than: pop b, pop a, push a < b
    Fclt = 0x61,
    /// Real greater than: pop b, pop a, push a > b
    Fcgt = 0x62,

    // ===== Boolean Logic (0x70-0x7F) =====
    /// Boolean and: pop b, pop a, push a & b
    BAnd = 0x70,
    /// Boolean or: pop b, pop a, push a | b
    BOr = 0x71,
    /// Boolean xor: pop b, pop a, push a ^ b
    BXor = 0x72,
    /// Boolean not: pop a, push !a
    BNot = 0x73,

    // ===== Boxing (0x80-0x8F) =====
    /// Box a primitive into an object reference (operand: u8 type tag)
    Box = 0x80,
    /// Unbox an object reference into a primitive (operand: u8 type tag)
    Unbox = 0x81,

    // ===== Control Flow (0x90-0x9F) =====
    /// Unconditional jump (operand: i32 offset from end of instruction)
    Jump = 0x90,
    /// Jump if false: pop a, if !a jump (operand: i32 offset)
    BranchFalse = 0x91,
    /// Jump if true: pop a, if a jump (operand: i32 offset)
    BranchTrue = 0x92,

    // ===== Calls & Returns (0xA0-0xAF) =====
    /// Virtual call: pop args, pop receiver, dispatch on the receiver's
    /// class at the given virtual slot (operands: u32 classId, u16 slot)
    CallVirt = 0xA0,
    /// Constructor call on an existing receiver: pop args, pop receiver
    /// (operands: u32 classId, u16 ctorIndex)
    CallCtor = 0xA1,
    /// Static call (operands: u32 classId, u16 methodIndex)
    CallStatic = 0xA2,
    /// Root-object constructor call: pop receiver, initialise object header
    CallObjectCtor = 0xA3,
    /// Return from method (pop return value)
    Return = 0xA8,
    /// Return from void method
    ReturnVoid = 0xA9,

    // ===== Object Operations (0xB0-0xBF) =====
    /// Allocate object and run constructor: pop args
    /// (operands: u32 classId, u16 ctorIndex)
    NewObject = 0xB0,
    /// Load object field: pop object, push field (operand: u16 offset)
    LoadField = 0xB1,
    /// Store object field: pop value, pop object (operand: u16 offset)
    StoreField = 0xB2,

    // ===== Array Operations (0xC0-0xCF) =====
    /// Allocate reference array: pop length, push array
    NewArray = 0xC0,
    /// Load array element: pop index, pop array, push element
    LoadElem = 0xC1,
    /// Store array element: pop value, pop index, pop array
    StoreElem = 0xC2,
    /// Array length: pop array, push length
    ArrayLen = 0xC3,

    // ===== List Operations (0xD0-0xDF) =====
    /// Allocate empty list, push it
    NewList = 0xD0,
    /// Append: pop value, pop list, push the same list
    ListAppend = 0xD1,
    /// Load list element: pop index, pop list, push element
    ListGet = 0xD2,
    /// List length: pop list, push length
    ListLen = 0xD3,
    /// Sub-list: pop count, pop start, pop list, push new list
    ListRange = 0xD4,

    // ===== Output (0xE0-0xEF) =====
    /// Print top of stack to the output sink (operand: u8 type tag)
    Print = 0xE0,
}

impl Opcode {
    /// Convert opcode to its byte encoding.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert byte to opcode.
    ///
    /// Returns None if the byte does not correspond to a valid opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x03 => Some(Self::Swap),
            0x04 => Some(Self::ConstNull),
            0x05 => Some(Self::ConstTrue),
            0x06 => Some(Self::ConstFalse),
            0x07 => Some(Self::ConstI64),
            0x08 => Some(Self::ConstF64),
            0x09 => Some(Self::ConstStr),

            0x10 => Some(Self::LoadArg),
            0x11 => Some(Self::StoreArg),
            0x12 => Some(Self::LoadLocal),
            0x13 => Some(Self::StoreLocal),

            0x20 => Some(Self::Iadd),
            0x21 => Some(Self::Isub),
            0x22 => Some(Self::Imul),
            0x23 => Some(Self::Idiv),
            0x24 => Some(Self::Irem),
            0x25 => Some(Self::Ineg),

            0x30 => Some(Self::Fadd),
            0x31 => Some(Self::Fsub),
            0x32 => Some(Self::Fmul),
            0x33 => Some(Self::Fdiv),
            0x34 => Some(Self::Fneg),

            0x40 => Some(Self::ConvI2F),
            0x41 => Some(Self::ConvF2I),
            0x42 => Some(Self::ConvI2B),
            0x43 => Some(Self::ConvB2I),

            0x50 => Some(Self::Iceq),
            0x51 => Some(Self::Iclt),
            0x52 => Some(Self::Icgt),

            0x60 => Some(Self::Fceq),
            0x61 => Some(Self::Fclt),
            0x62 => Some(Self::Fcgt),

            0x70 => Some(Self::BAnd),
            0x71 => Some(Self::BOr),
            0x72 => Some(Self::BXor),
            0x73 => Some(Self::BNot),

            0x80 => Some(Self::Box),
            0x81 => Some(Self::Unbox),

            0x90 => Some(Self::Jump),
            0x91 => Some(Self::BranchFalse),
            0x92 => Some(Self::BranchTrue),

            0xA0 => Some(Self::CallVirt),
            0xA1 => Some(Self::CallCtor),
            0xA2 => Some(Self::CallStatic),
            0xA3 => Some(Self::CallObjectCtor),
            0xA8 => Some(Self::Return),
            0xA9 => Some(Self::ReturnVoid),

            0xB0 => Some(Self::NewObject),
            0xB1 => Some(Self::LoadField),
            0xB2 => Some(Self::StoreField),

            0xC0 => Some(Self::NewArray),
            0xC1 => Some(Self::LoadElem),
            0xC2 => Some(Self::StoreElem),
            0xC3 => Some(Self::ArrayLen),

            0xD0 => Some(Self::NewList),
            0xD1 => Some(Self::ListAppend),
            0xD2 => Some(Self::ListGet),
            0xD3 => Some(Self::ListLen),
            0xD4 => Some(Self::ListRange),

            0xE0 => Some(Self::Print),

            _ => None,
        }
    }

    /// Number of operand bytes that follow this opcode in the code stream.
    pub fn operand_width(self) -> usize {
        match self {
            Self::ConstI64 | Self::ConstF64 => 8,
            Self::ConstStr => 4,
            Self::LoadArg | Self::StoreArg | Self::LoadLocal | Self::StoreLocal => 2,
            Self::Box | Self::Unbox | Self::Print => 1,
            Self::Jump | Self::BranchFalse | Self::BranchTrue => 4,
            Self::CallVirt | Self::CallCtor | Self::CallStatic | Self::NewObject => 6,
            Self::LoadField | Self::StoreField => 2,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::Swap => "swap",
            Self::ConstNull => "const.null",
            Self::ConstTrue => "const.true",
            Self::ConstFalse => "const.false",
            Self::ConstI64 => "const.i64",
            Self::ConstF64 => "const.f64",
            Self::ConstStr => "const.str",
            Self::LoadArg => "ldarg",
            Self::StoreArg => "starg",
            Self::LoadLocal => "ldloc",
            Self::StoreLocal => "stloc",
            Self::Iadd => "iadd",
            Self::Isub => "isub",
            Self::Imul => "imul",
            Self::Idiv => "idiv",
            Self::Irem => "irem",
            Self::Ineg => "ineg",
            Self::Fadd => "fadd",
            Self::Fsub => "fsub",
            Self::Fmul => "fmul",
            Self::Fdiv => "fdiv",
            Self::Fneg => "fneg",
            Self::ConvI2F => "conv.i2f",
            Self::ConvF2I => "conv.f2i",
            Self::ConvI2B => "conv.i2b",
            Self::ConvB2I => "conv.b2i",
            Self::Iceq => "iceq",
            Self::Iclt => "iclt",
            Self::Icgt => "icgt",
            Self::Fceq => "fceq",
            Self::Fclt => "fclt",
            Self::Fcgt => "fcgt",
            Self::BAnd => "band",
            Self::BOr => "bor",
            Self::BXor => "bxor",
            Self::BNot => "bnot",
            Self::Box => "box",
            Self::Unbox => "unbox",
            Self::Jump => "jmp",
            Self::BranchFalse => "brfalse",
            Self::BranchTrue => "brtrue",
            Self::CallVirt => "callvirt",
            Self::CallCtor => "callctor",
            Self::CallStatic => "callstatic",
            Self::CallObjectCtor => "callobjctor",
            Self::Return => "ret",
            Self::ReturnVoid => "ret.void",
            Self::NewObject => "newobj",
            Self::LoadField => "ldfld",
            Self::StoreField => "stfld",
            Self::NewArray => "newarr",
            Self::LoadElem => "ldelem",
            Self::StoreElem => "stelem",
            Self::ArrayLen => "arrlen",
            Self::NewList => "newlist",
            Self::ListAppend => "lappend",
            Self::ListGet => "lget",
            Self::ListLen => "llen",
            Self::ListRange => "lrange",
            Self::Print => "print",
        }
    }
}

/// Storage-type erasure of source types.
///
/// User classes and generic containers are stored as opaque references; the
/// compiler keeps the source-level ("real") type on the side to reconstruct
/// dispatch at use sites.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// 64-bit integer (`Integer`)
    I64 = 0,
    /// 64-bit real (`Real`)
    F64 = 1,
    /// Boolean (`Boolean`)
    Bool = 2,
    /// String (`String`)
    Str = 3,
    /// Opaque object reference (user classes)
    Object = 4,
    /// Opaque reference array (`Array[T]`)
    ObjArray = 5,
    /// Append-only list of opaque references (`List[T]`)
    List = 6,
    /// No value (method without a return type)
    Void = 7,
}

impl StorageType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::I64),
            1 => Some(Self::F64),
            2 => Some(Self::Bool),
            3 => Some(Self::Str),
            4 => Some(Self::Object),
            5 => Some(Self::ObjArray),
            6 => Some(Self::List),
            7 => Some(Self::Void),
            _ => None,
        }
    }

    /// Whether values of this type are boxed when stored into a container.
    pub fn is_primitive(self) -> bool {
        matches!(self, Self::I64 | Self::F64 | Self::Bool)
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Object => "object",
            Self::ObjArray => "object[]",
            Self::List => "list",
            Self::Void => "void",
        };
        write!(f, "{}", s)
    }
}

/// Runtime type tag carried by `Box`, `Unbox`, and `Print`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int = 0,
    Real = 1,
    Bool = 2,
    Str = 3,
    Object = 4,
}

impl TypeTag {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Int),
            1 => Some(Self::Real),
            2 => Some(Self::Bool),
            3 => Some(Self::Str),
            4 => Some(Self::Object),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let ops = [
            Opcode::Nop,
            Opcode::ConstI64,
            Opcode::LoadArg,
            Opcode::Iadd,
            Opcode::ConvI2F,
            Opcode::Icgt,
            Opcode::Box,
            Opcode::BranchFalse,
            Opcode::CallVirt,
            Opcode::NewObject,
            Opcode::ListRange,
            Opcode::Print,
        ];
        for op in ops {
            assert_eq!(Opcode::from_u8(op.to_u8()), Some(op));
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0xFF), None);
        assert_eq!(Opcode::from_u8(0x0F), None);
    }

    #[test]
    fn test_operand_widths() {
        assert_eq!(Opcode::ConstI64.operand_width(), 8);
        assert_eq!(Opcode::ConstStr.operand_width(), 4);
        assert_eq!(Opcode::LoadLocal.operand_width(), 2);
        assert_eq!(Opcode::CallVirt.operand_width(), 6);
        assert_eq!(Opcode::Iadd.operand_width(), 0);
        assert_eq!(Opcode::Print.operand_width(), 1);
    }

    #[test]
    fn test_storage_type_roundtrip() {
        for byte in 0..8u8 {
            let ty = StorageType::from_u8(byte).unwrap();
            assert_eq!(ty.to_u8(), byte);
        }
        assert_eq!(StorageType::from_u8(8), None);
    }

    #[test]
    fn test_storage_type_primitive() {
        assert!(StorageType::I64.is_primitive());
        assert!(StorageType::Bool.is_primitive());
        assert!(!StorageType::Str.is_primitive());
        assert!(!StorageType::Object.is_primitive());
        assert!(!StorageType::List.is_primitive());
    }
}
