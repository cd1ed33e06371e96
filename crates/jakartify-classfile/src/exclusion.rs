//! Carve-outs for the split `javax.xml` namespace.
//!
//! Parts of `javax.xml` stay in the JDK while others moved to Jakarta. A field
//! such as `XPathConstants.NODESET` is typed with a JDK class
//! (`javax.xml.namespace.QName`) whose name a broad profile could otherwise
//! touch. The analyzer looks for `getstatic` reads through the XPath factory
//! types and records the field types they produce so the converter leaves
//! every constant naming them alone.
//!
//! This is a heuristic: it only sees static field reads through one family of
//! types and makes no attempt at data-flow analysis.

use std::collections::BTreeSet;

use crate::bytecode::GETSTATIC;
use crate::classfile::{ClassFile, ClassMember};
use crate::constant_pool::{ConstantPool, CpInfo};
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, FieldType};
use crate::error::Result;
use crate::mutf8::decode_modified_utf8;

const FACTORY_PREFIX: &str = "javax.xml.xpath.";
const FACTORY_INTERNAL_PREFIX: &[u8] = b"javax/xml/xpath/";
const PROTECTED_PREFIX: &str = "javax.xml.";

/// Dotted class names that must keep their current namespace for the
/// duration of one class file's conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: impl Into<String>) -> bool {
        self.names.insert(class_name.into())
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.names.contains(class_name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// `true` if any class named by `symbol` (see [`class_names_in`]) is
    /// excluded.
    pub fn excludes(&self, symbol: &str) -> bool {
        !self.is_empty() && class_names_in(symbol).iter().any(|name| self.contains(name))
    }
}

/// Dotted class names referenced by a constant pool string.
///
/// Method descriptors yield their parameter and return types, field
/// descriptors their single type and bare internal names themselves. Special
/// method names (`<init>`) and anything unparseable yield nothing.
pub fn class_names_in(symbol: &str) -> Vec<String> {
    if symbol.starts_with('<') && symbol.ends_with('>') {
        return Vec::new();
    }
    if symbol.starts_with('(') {
        return parse_method_descriptor(symbol)
            .map(|desc| desc.types().filter_map(FieldType::class_name).collect())
            .unwrap_or_default();
    }
    if let Ok(ty) = parse_field_descriptor(symbol) {
        return ty.class_name().into_iter().collect();
    }
    if symbol.contains('/') && !symbol.contains([';', '(', '<', ' ']) {
        return vec![symbol.replace('/', ".")];
    }
    Vec::new()
}

/// Builds the [`ExclusionSet`] for one class file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExclusionAnalyzer;

impl ExclusionAnalyzer {
    pub fn analyze(class: &ClassFile<'_>) -> ExclusionSet {
        let mut set = ExclusionSet::new();
        let cp = &class.constant_pool;
        if !references_factory(cp) {
            return set;
        }

        for method in &class.methods {
            match method_exclusions(method, cp) {
                Ok(names) => {
                    for name in names {
                        set.insert(name);
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        target: "jakartify.classfile",
                        method = %method.name(cp).unwrap_or_default(),
                        error = %err,
                        "skipping undecodable method"
                    );
                }
            }
        }

        if !set.is_empty() {
            tracing::debug!(
                target: "jakartify.classfile",
                excluded = set.len(),
                "xml exclusions found"
            );
        }
        set
    }
}

fn references_factory(cp: &ConstantPool) -> bool {
    cp.iter().any(|(_, info)| match info {
        CpInfo::FieldRef { class_index, .. } => cp
            .get_class_name_bytes(*class_index)
            .is_ok_and(|name| name.starts_with(FACTORY_INTERNAL_PREFIX)),
        _ => false,
    })
}

fn method_exclusions(method: &ClassMember<'_>, cp: &ConstantPool) -> Result<Vec<String>> {
    let Some(code) = method.code(cp)? else {
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for insn in code.instructions() {
        let insn = insn?;
        if insn.opcode != GETSTATIC {
            continue;
        }
        let Some(index) = insn.index_operand() else {
            continue;
        };
        let field = cp.get_field_ref(index)?;
        let owner = decode_modified_utf8(field.class_name)?.replace('/', ".");
        if !owner.starts_with(FACTORY_PREFIX) {
            continue;
        }
        let descriptor = decode_modified_utf8(field.descriptor)?;
        if let Some(ty) = parse_field_descriptor(&descriptor)?.class_name() {
            if ty.starts_with(PROTECTED_PREFIX) {
                found.push(ty);
            }
        }
    }
    Ok(found)
}
