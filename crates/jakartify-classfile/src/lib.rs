//! Just enough of the JVM class-file format to rewrite symbol names.
//!
//! [`ClassFile::parse`] reads the constant pool fully and the remaining
//! structures (fields, methods, attributes) as borrowed slices.
//! [`ClassFile::to_bytes`] re-emits the class with the (possibly patched)
//! constant pool followed by the untouched remainder of the input, so every
//! index stays valid.

#![forbid(unsafe_code)]

mod bytecode;
mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod exclusion;
mod mutf8;
mod reader;

pub use crate::bytecode::{Instruction, Instructions};
pub use crate::classfile::{Attribute, ClassFile, ClassMember, Code};
pub use crate::constant_pool::{ConstantPool, CpInfo, FieldRef};
pub use crate::descriptor::{
    parse_field_descriptor, parse_method_descriptor, BaseType, FieldType, MethodDescriptor,
    ReturnType,
};
pub use crate::error::{ClassFileError, Result};
pub use crate::exclusion::{class_names_in, ExclusionAnalyzer, ExclusionSet};
pub use crate::mutf8::{decode_modified_utf8, encode_modified_utf8};
