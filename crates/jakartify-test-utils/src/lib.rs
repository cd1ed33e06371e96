//! Utilities shared by jakartify tests.
//!
//! Fixtures are produced in-process: [`ClassFileBuilder`] emits small but
//! well-formed class files and the [`archive`](crate::archive) helpers build and read
//! archives, so no binary fixtures need to be checked in.

mod classfile;
pub mod archive;

pub use classfile::{ClassFileBuilder, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
