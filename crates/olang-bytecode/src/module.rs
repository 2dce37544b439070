//! Module format for compiled O programs.
//!
//! A module holds one class descriptor per source class plus the synthetic
//! entry class, a string constant pool, and the entry-point registration.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::opcode::{Opcode, StorageType};
use thiserror::Error;

/// Magic number for O module files: "OLNG"
pub const MAGIC: [u8; 4] = *b"OLNG";

/// Current module format version
pub const VERSION: u32 = 1;

/// Index of a class descriptor within its module.
pub type ClassId = u32;

/// Module encoding/decoding errors.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected OLNG, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported module version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),
}

/// A compiled O module.
#[derive(Debug, Clone)]
pub struct Module {
    /// Module name (source basename)
    pub name: String,
    /// String constant pool
    pub constants: Vec<String>,
    /// Class descriptors, in declaration order; the synthetic entry class last
    pub classes: Vec<ClassDef>,
    /// Entry-point registration
    pub entry: Option<EntryPoint>,
}

/// The module's designated entry point: a static method on one of its classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub class: ClassId,
    pub method: u16,
}

/// Class descriptor.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Class name
    pub name: String,
    /// Base class, if any
    pub base: Option<ClassId>,
    /// Field descriptors declared by this class (base fields precede these
    /// in the object layout)
    pub fields: Vec<FieldDef>,
    /// Constructor descriptors
    pub ctors: Vec<MethodDef>,
    /// Method descriptors
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    pub fn new(name: String, base: Option<ClassId>) -> Self {
        Self {
            name,
            base,
            fields: Vec::new(),
            ctors: Vec::new(),
            methods: Vec::new(),
        }
    }
}

/// Field descriptor.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: StorageType,
}

/// Method or constructor descriptor.
///
/// Every instance method is virtual: `vslot` identifies its slot in the
/// class's dispatch table, shared with any ancestor method it overrides.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method name; constructors are named `.ctor`
    pub name: String,
    /// Parameter storage types, excluding the receiver
    pub params: Vec<StorageType>,
    /// Return storage type (`Void` for none)
    pub ret: StorageType,
    /// Static methods take no receiver and do not dispatch
    pub is_static: bool,
    /// Virtual dispatch slot (0 for constructors and statics)
    pub vslot: u16,
    /// Number of local variable slots
    pub local_count: u16,
    /// Instruction stream
    pub code: Vec<u8>,
}

impl Module {
    /// Create a new empty module.
    pub fn new(name: String) -> Self {
        Self {
            name,
            constants: Vec::new(),
            classes: Vec::new(),
            entry: None,
        }
    }

    /// Look up a class descriptor by name.
    pub fn class_by_name(&self, name: &str) -> Option<(ClassId, &ClassDef)> {
        self.classes
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .map(|(i, c)| (i as ClassId, c))
    }

    /// Encode the module to its binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        writer.buffer.extend_from_slice(&MAGIC);
        writer.emit_u32(VERSION);
        writer.emit_string(&self.name);

        writer.emit_u32(self.constants.len() as u32);
        for constant in &self.constants {
            writer.emit_string(constant);
        }

        writer.emit_u32(self.classes.len() as u32);
        for class in &self.classes {
            class.encode(&mut writer);
        }

        match self.entry {
            Some(entry) => {
                writer.emit_u8(1);
                writer.emit_u32(entry.class);
                writer.emit_u16(entry.method);
            }
            None => writer.emit_u8(0),
        }

        writer.into_bytes()
    }

    /// Decode a module from its binary form.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ModuleError> {
        let mut reader = BytecodeReader::new(data);

        let mut magic = [0u8; 4];
        for byte in &mut magic {
            *byte = reader.read_u8()?;
        }
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        let name = reader.read_string()?;

        let constant_count = reader.read_u32()? as usize;
        let mut constants = Vec::with_capacity(constant_count);
        for _ in 0..constant_count {
            constants.push(reader.read_string()?);
        }

        let class_count = reader.read_u32()? as usize;
        let mut classes = Vec::with_capacity(class_count);
        for _ in 0..class_count {
            classes.push(ClassDef::decode(&mut reader)?);
        }

        let entry = if reader.read_u8()? != 0 {
            Some(EntryPoint {
                class: reader.read_u32()?,
                method: reader.read_u16()?,
            })
        } else {
            None
        };

        Ok(Self {
            name,
            constants,
            classes,
            entry,
        })
    }

    /// Render a human-readable listing of the whole module.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("module {}\n", self.name));
        if let Some(entry) = self.entry {
            let class = &self.classes[entry.class as usize];
            out.push_str(&format!(
                "entry {}::{}\n",
                class.name, class.methods[entry.method as usize].name
            ));
        }
        for class in &self.classes {
            let base = class
                .base
                .map(|id| format!(" : {}", self.classes[id as usize].name))
                .unwrap_or_default();
            out.push_str(&format!("\nclass {}{}\n", class.name, base));
            for field in &class.fields {
                out.push_str(&format!("  field {}: {}\n", field.name, field.ty));
            }
            for ctor in &class.ctors {
                self.disassemble_method(&mut out, ctor);
            }
            for method in &class.methods {
                self.disassemble_method(&mut out, method);
            }
        }
        out
    }

    fn disassemble_method(&self, out: &mut String, method: &MethodDef) {
        let params: Vec<String> = method.params.iter().map(|p| p.to_string()).collect();
        let kind = if method.is_static { "static " } else { "" };
        out.push_str(&format!(
            "  {}{}({}) -> {} [locals: {}]\n",
            kind,
            method.name,
            params.join(", "),
            method.ret,
            method.local_count
        ));

        let code = &method.code;
        let mut pos = 0usize;
        while pos < code.len() {
            let Some(op) = Opcode::from_u8(code[pos]) else {
                out.push_str(&format!("    {:04}: ??? 0x{:02x}\n", pos, code[pos]));
                pos += 1;
                continue;
            };
            let width = op.operand_width();
            let operand = match width {
                0 => String::new(),
                1 => format!(" {}", code[pos + 1]),
                2 => format!(
                    " {}",
                    u16::from_le_bytes([code[pos + 1], code[pos + 2]])
                ),
                4 => {
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(&code[pos + 1..pos + 5]);
                    format!(" {}", i32::from_le_bytes(buf))
                }
                6 => {
                    let mut class = [0u8; 4];
                    class.copy_from_slice(&code[pos + 1..pos + 5]);
                    let slot = u16::from_le_bytes([code[pos + 5], code[pos + 6]]);
                    format!(" {} {}", u32::from_le_bytes(class), slot)
                }
                8 => {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(&code[pos + 1..pos + 9]);
                    if op == Opcode::ConstF64 {
                        format!(" {}", f64::from_le_bytes(buf))
                    } else {
                        format!(" {}", i64::from_le_bytes(buf))
                    }
                }
                _ => unreachable!("no opcode has operand width {}", width),
            };
            out.push_str(&format!("    {:04}: {}{}\n", pos, op.mnemonic(), operand));
            pos += 1 + width;
        }
    }
}

impl ClassDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        match self.base {
            Some(base) => {
                writer.emit_u8(1);
                writer.emit_u32(base);
            }
            None => writer.emit_u8(0),
        }

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            writer.emit_string(&field.name);
            writer.emit_u8(field.ty.to_u8());
        }

        writer.emit_u32(self.ctors.len() as u32);
        for ctor in &self.ctors {
            ctor.encode(writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(writer);
        }
    }

    fn decode(reader: &mut BytecodeReader) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let base = if reader.read_u8()? != 0 {
            Some(reader.read_u32()?)
        } else {
            None
        };

        let field_count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let name = reader.read_string()?;
            let offset = reader.offset();
            let byte = reader.read_u8()?;
            let ty = StorageType::from_u8(byte)
                .ok_or(DecodeError::InvalidStorageType(byte, offset))?;
            fields.push(FieldDef { name, ty });
        }

        let ctor_count = reader.read_u32()? as usize;
        let mut ctors = Vec::with_capacity(ctor_count);
        for _ in 0..ctor_count {
            ctors.push(MethodDef::decode(reader)?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(MethodDef::decode(reader)?);
        }

        Ok(Self {
            name,
            base,
            fields,
            ctors,
            methods,
        })
    }
}

impl MethodDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u32(self.params.len() as u32);
        for param in &self.params {
            writer.emit_u8(param.to_u8());
        }
        writer.emit_u8(self.ret.to_u8());
        writer.emit_u8(self.is_static as u8);
        writer.emit_u16(self.vslot);
        writer.emit_u16(self.local_count);
        writer.emit_bytes(&self.code);
    }

    fn decode(reader: &mut BytecodeReader) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let param_count = reader.read_u32()? as usize;
        let mut params = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            let offset = reader.offset();
            let byte = reader.read_u8()?;
            params.push(
                StorageType::from_u8(byte)
                    .ok_or(DecodeError::InvalidStorageType(byte, offset))?,
            );
        }
        let offset = reader.offset();
        let ret_byte = reader.read_u8()?;
        let ret = StorageType::from_u8(ret_byte)
            .ok_or(DecodeError::InvalidStorageType(ret_byte, offset))?;
        let is_static = reader.read_u8()? != 0;
        let vslot = reader.read_u16()?;
        let local_count = reader.read_u16()?;
        let code = reader.read_bytes()?;

        Ok(Self {
            name,
            params,
            ret,
            is_static,
            vslot,
            local_count,
            code,
        })
    }
}
