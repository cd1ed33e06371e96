use std::borrow::Cow;

use crate::bytecode::Instructions;
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::reader::Reader;

const MAGIC: u32 = 0xCAFE_BABE;

/// A parsed class file.
///
/// Only the constant pool is owned and mutable. Everything after it is kept
/// as a borrowed slice of the input and written back verbatim, so patching a
/// UTF-8 entry can never disturb methods, attributes or line number tables.
#[derive(Debug, Clone)]
pub struct ClassFile<'a> {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<ClassMember<'a>>,
    pub methods: Vec<ClassMember<'a>>,
    pub attributes: Vec<Attribute<'a>>,
    body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMember<'a> {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name_index: u16,
    pub info: &'a [u8],
}

/// The interesting part of a `Code` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code<'a> {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: &'a [u8],
}

impl<'a> Code<'a> {
    pub fn instructions(&self) -> Instructions<'a> {
        Instructions::new(self.code)
    }
}

impl<'a> ClassFile<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let constant_pool = ConstantPool::parse(&mut reader)?;
        let body_start = reader.position();

        let access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(reader.read_u2()?);
        }

        let fields = parse_members(&mut reader)?;
        let methods = parse_members(&mut reader)?;
        let attributes = parse_attributes(&mut reader)?;

        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            body: &bytes[body_start..],
        })
    }

    pub fn this_class_name(&self) -> Result<Cow<'_, str>> {
        self.constant_pool.get_class_name(self.this_class)
    }

    /// Serializes the class with the current constant pool.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 1024);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        self.constant_pool.write(&mut out);
        out.extend_from_slice(self.body);
        out
    }
}

impl<'a> ClassMember<'a> {
    pub fn name<'cp>(&self, cp: &'cp ConstantPool) -> Result<Cow<'cp, str>> {
        cp.get_utf8(self.name_index)
    }

    pub fn descriptor<'cp>(&self, cp: &'cp ConstantPool) -> Result<Cow<'cp, str>> {
        cp.get_utf8(self.descriptor_index)
    }

    /// The member's `Code` attribute, if it has one (abstract and native
    /// methods do not).
    pub fn code(&self, cp: &ConstantPool) -> Result<Option<Code<'a>>> {
        for attr in &self.attributes {
            if cp.get_utf8_bytes(attr.name_index)? != b"Code" {
                continue;
            }
            let mut reader = Reader::new(attr.info);
            let max_stack = reader.read_u2()?;
            let max_locals = reader.read_u2()?;
            let code_length = reader.read_u4()? as usize;
            let code = reader
                .read_bytes(code_length)
                .map_err(|_| ClassFileError::MalformedAttribute("Code"))?;
            return Ok(Some(Code {
                max_stack,
                max_locals,
                code,
            }));
        }
        Ok(None)
    }
}

fn parse_members<'a>(reader: &mut Reader<'a>) -> Result<Vec<ClassMember<'a>>> {
    let count = reader.read_u2()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        members.push(ClassMember {
            access_flags: reader.read_u2()?,
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
            attributes: parse_attributes(reader)?,
        });
    }
    Ok(members)
}

fn parse_attributes<'a>(reader: &mut Reader<'a>) -> Result<Vec<Attribute<'a>>> {
    let count = reader.read_u2()? as usize;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        attributes.push(Attribute {
            name_index,
            info: reader.read_bytes(length)?,
        });
    }
    Ok(attributes)
}
