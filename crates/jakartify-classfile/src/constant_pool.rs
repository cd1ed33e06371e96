use std::borrow::Cow;

use crate::error::{ClassFileError, Result};
use crate::mutf8::{decode_modified_utf8, encode_modified_utf8};
use crate::reader::Reader;

/// One constant pool entry.
///
/// UTF-8 entries keep their raw modified UTF-8 bytes so that unchanged
/// entries are written back exactly as they were read.
#[derive(Debug, Clone, PartialEq)]
pub enum CpInfo {
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

impl CpInfo {
    pub fn kind(&self) -> &'static str {
        match self {
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::FieldRef { .. } => "Fieldref",
            CpInfo::MethodRef { .. } => "Methodref",
            CpInfo::InterfaceMethodRef { .. } => "InterfaceMethodref",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle { .. } => "MethodHandle",
            CpInfo::MethodType { .. } => "MethodType",
            CpInfo::Dynamic { .. } => "Dynamic",
            CpInfo::InvokeDynamic { .. } => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            CpInfo::Utf8(_) => 1,
            CpInfo::Integer(_) => 3,
            CpInfo::Float(_) => 4,
            CpInfo::Long(_) => 5,
            CpInfo::Double(_) => 6,
            CpInfo::Class { .. } => 7,
            CpInfo::String { .. } => 8,
            CpInfo::FieldRef { .. } => 9,
            CpInfo::MethodRef { .. } => 10,
            CpInfo::InterfaceMethodRef { .. } => 11,
            CpInfo::NameAndType { .. } => 12,
            CpInfo::MethodHandle { .. } => 15,
            CpInfo::MethodType { .. } => 16,
            CpInfo::Dynamic { .. } => 17,
            CpInfo::InvokeDynamic { .. } => 18,
            CpInfo::Module { .. } => 19,
            CpInfo::Package { .. } => 20,
        }
    }

    /// `long` and `double` take up two slots.
    fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }
}

/// A resolved `CONSTANT_Fieldref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef<'a> {
    /// Internal (slash-separated) name of the declaring class.
    pub class_name: &'a [u8],
    pub name: &'a [u8],
    pub descriptor: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    // Slot 0 and the second slot of wide entries are `None`.
    entries: Vec<Option<CpInfo>>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(None);

        while entries.len() < count {
            let info = parse_entry(reader)?;
            let wide = info.is_wide();
            entries.push(Some(info));
            if wide {
                entries.push(None);
            }
        }

        Ok(Self { entries })
    }

    /// Slot count as written in the class file (`constant_pool_count`).
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(ClassFileError::InvalidConstantPoolIndex(index))
    }

    /// Raw modified UTF-8 bytes of a `CONSTANT_Utf8` entry.
    pub fn get_utf8_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            CpInfo::Utf8(bytes) => Ok(bytes),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub fn get_utf8(&self, index: u16) -> Result<Cow<'_, str>> {
        decode_modified_utf8(self.get_utf8_bytes(index)?)
    }

    /// Internal name of a `CONSTANT_Class` entry, as raw bytes.
    pub fn get_class_name_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            CpInfo::Class { name_index } => self.get_utf8_bytes(*name_index),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub fn get_class_name(&self, index: u16) -> Result<Cow<'_, str>> {
        decode_modified_utf8(self.get_class_name_bytes(index)?)
    }

    pub fn get_field_ref(&self, index: u16) -> Result<FieldRef<'_>> {
        let (class_index, name_and_type_index) = match self.get(index)? {
            CpInfo::FieldRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index),
            other => return Err(mismatch(index, "Fieldref", other)),
        };
        let (name_index, descriptor_index) = match self.get(name_and_type_index)? {
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => (*name_index, *descriptor_index),
            other => return Err(mismatch(name_and_type_index, "NameAndType", other)),
        };

        Ok(FieldRef {
            class_name: self.get_class_name_bytes(class_index)?,
            name: self.get_utf8_bytes(name_index)?,
            descriptor: self.get_utf8_bytes(descriptor_index)?,
        })
    }

    /// Indices of every `CONSTANT_Utf8` entry, in pool order.
    pub fn utf8_indices(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches!(entry, Some(CpInfo::Utf8(_))))
            .map(|(idx, _)| idx as u16)
    }

    /// Every entry with its index, skipping unusable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| entry.as_ref().map(|info| (idx as u16, info)))
    }

    /// Replaces the bytes of a `CONSTANT_Utf8` entry in place.
    pub fn set_utf8_bytes(&mut self, index: u16, bytes: Vec<u8>) -> Result<()> {
        if bytes.len() > u16::MAX as usize {
            return Err(ClassFileError::Utf8TooLong(bytes.len()));
        }
        match self.entries.get_mut(index as usize).and_then(Option::as_mut) {
            Some(CpInfo::Utf8(slot)) => {
                *slot = bytes;
                Ok(())
            }
            Some(other) => Err(ClassFileError::ConstantPoolTypeMismatch {
                index,
                expected: "Utf8",
                found: other.kind(),
            }),
            None => Err(ClassFileError::InvalidConstantPoolIndex(index)),
        }
    }

    pub fn set_utf8(&mut self, index: u16, value: &str) -> Result<()> {
        self.set_utf8_bytes(index, encode_modified_utf8(value))
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.count().to_be_bytes());
        for info in self.entries.iter().flatten() {
            write_entry(info, out);
        }
    }
}

fn mismatch(index: u16, expected: &'static str, found: &CpInfo) -> ClassFileError {
    ClassFileError::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

fn parse_entry(reader: &mut Reader<'_>) -> Result<CpInfo> {
    let tag = reader.read_u1()?;
    let info = match tag {
        1 => {
            let len = reader.read_u2()? as usize;
            CpInfo::Utf8(reader.read_bytes(len)?.to_vec())
        }
        3 => CpInfo::Integer(reader.read_i4()?),
        4 => CpInfo::Float(reader.read_u4()?),
        5 => {
            let high = reader.read_u4()? as u64;
            let low = reader.read_u4()? as u64;
            CpInfo::Long(((high << 32) | low) as i64)
        }
        6 => {
            let high = reader.read_u4()? as u64;
            let low = reader.read_u4()? as u64;
            CpInfo::Double((high << 32) | low)
        }
        7 => CpInfo::Class {
            name_index: reader.read_u2()?,
        },
        8 => CpInfo::String {
            string_index: reader.read_u2()?,
        },
        9 => CpInfo::FieldRef {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        10 => CpInfo::MethodRef {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        11 => CpInfo::InterfaceMethodRef {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        12 => CpInfo::NameAndType {
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
        },
        15 => CpInfo::MethodHandle {
            reference_kind: reader.read_u1()?,
            reference_index: reader.read_u2()?,
        },
        16 => CpInfo::MethodType {
            descriptor_index: reader.read_u2()?,
        },
        17 => CpInfo::Dynamic {
            bootstrap_method_attr_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        18 => CpInfo::InvokeDynamic {
            bootstrap_method_attr_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        19 => CpInfo::Module {
            name_index: reader.read_u2()?,
        },
        20 => CpInfo::Package {
            name_index: reader.read_u2()?,
        },
        other => return Err(ClassFileError::InvalidConstantPoolTag(other)),
    };
    Ok(info)
}

fn write_entry(info: &CpInfo, out: &mut Vec<u8>) {
    out.push(info.tag());
    match info {
        CpInfo::Utf8(bytes) => {
            out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        CpInfo::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
        CpInfo::Float(bits) => out.extend_from_slice(&bits.to_be_bytes()),
        CpInfo::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        CpInfo::Double(bits) => out.extend_from_slice(&bits.to_be_bytes()),
        CpInfo::Class { name_index }
        | CpInfo::Module { name_index }
        | CpInfo::Package { name_index } => out.extend_from_slice(&name_index.to_be_bytes()),
        CpInfo::String { string_index } => out.extend_from_slice(&string_index.to_be_bytes()),
        CpInfo::MethodType { descriptor_index } => {
            out.extend_from_slice(&descriptor_index.to_be_bytes())
        }
        CpInfo::FieldRef {
            class_index,
            name_and_type_index,
        }
        | CpInfo::MethodRef {
            class_index,
            name_and_type_index,
        }
        | CpInfo::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        } => {
            out.extend_from_slice(&class_index.to_be_bytes());
            out.extend_from_slice(&name_and_type_index.to_be_bytes());
        }
        CpInfo::NameAndType {
            name_index,
            descriptor_index,
        } => {
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&descriptor_index.to_be_bytes());
        }
        CpInfo::MethodHandle {
            reference_kind,
            reference_index,
        } => {
            out.push(*reference_kind);
            out.extend_from_slice(&reference_index.to_be_bytes());
        }
        CpInfo::Dynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        }
        | CpInfo::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            out.extend_from_slice(&bootstrap_method_attr_index.to_be_bytes());
            out.extend_from_slice(&name_and_type_index.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_bytes() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x06];
        // #1 Utf8 "javax/servlet/Servlet"
        bytes.push(1);
        bytes.extend_from_slice(&21u16.to_be_bytes());
        bytes.extend_from_slice(b"javax/servlet/Servlet");
        // #2 Class #1
        bytes.extend_from_slice(&[7, 0x00, 0x01]);
        // #3-#4 Long
        bytes.push(5);
        bytes.extend_from_slice(&42i64.to_be_bytes());
        // #5 MethodHandle
        bytes.extend_from_slice(&[15, 6, 0x00, 0x02]);
        bytes
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let bytes = pool_bytes();
        let pool = ConstantPool::parse(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(pool.count(), 6);
        assert_eq!(pool.get(3).unwrap(), &CpInfo::Long(42));
        assert!(matches!(
            pool.get(4),
            Err(ClassFileError::InvalidConstantPoolIndex(4))
        ));
        assert_eq!(pool.get_class_name(2).unwrap(), "javax/servlet/Servlet");
        assert_eq!(pool.utf8_indices().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn write_round_trips_exactly() {
        let bytes = pool_bytes();
        let pool = ConstantPool::parse(&mut Reader::new(&bytes)).unwrap();
        let mut out = Vec::new();
        pool.write(&mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn set_utf8_rejects_non_utf8_slot() {
        let bytes = pool_bytes();
        let mut pool = ConstantPool::parse(&mut Reader::new(&bytes)).unwrap();
        assert!(pool.set_utf8(2, "x").is_err());
        pool.set_utf8(1, "jakarta/servlet/Servlet").unwrap();
        assert_eq!(pool.get_class_name(2).unwrap(), "jakarta/servlet/Servlet");
    }
}
