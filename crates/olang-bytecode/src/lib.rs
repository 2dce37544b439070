//! Module format and instruction set for the O stack machine.
//!
//! This crate defines the target of the O compiler: a managed stack machine
//! with classes, fields, virtual method dispatch, and a small set of typed
//! arithmetic, conversion, and container instructions.
//!
//! The crate is split into:
//! - [`opcode`]: the instruction set and the storage-type erasure model
//! - [`module`]: class/method/constructor descriptors and the module itself
//! - [`encoder`]: binary encoding and decoding of whole modules

pub mod encoder;
pub mod module;
pub mod opcode;

pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use module::{ClassDef, ClassId, EntryPoint, FieldDef, MethodDef, Module, ModuleError};
pub use opcode::{Opcode, StorageType, TypeTag};
