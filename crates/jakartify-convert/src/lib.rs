//! Per-payload converters.
//!
//! Each [`Converter`] claims file names it understands and rewrites their
//! bytes under a [`Profile`]. A [`ConverterRegistry`] tries converters in a
//! fixed order and falls back to [`PassThroughConverter`], which accepts
//! everything and changes nothing.
//!
//! Converters never compare input and output to find out whether they did
//! anything: every rewrite step reports its own `changed` flag and unchanged
//! payloads are handed back borrowed.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::fmt;

use jakartify_profile::Profile;

mod class;
mod manifest;
mod passthrough;
mod registry;
mod text;

pub use crate::class::{ClassConverter, ClassTransformer, ResourceResolver};
pub use crate::manifest::{Manifest, ManifestConverter, ManifestError, Section, MANIFEST_NAME};
pub use crate::passthrough::PassThroughConverter;
pub use crate::registry::ConverterRegistry;
pub use crate::text::{TextConverter, TEXT_EXTENSIONS};

/// Version appended to rewritten `Implementation-Version` attributes.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{path}: not a valid class file")]
    ClassFile {
        path: String,
        #[source]
        source: jakartify_classfile::ClassFileError,
    },
    #[error("{path}: not a valid manifest")]
    Manifest {
        path: String,
        #[source]
        source: ManifestError,
    },
}

/// Output of one conversion.
///
/// `bytes` is borrowed from the input exactly when nothing was rewritten.
/// `changed` is the reportable flag: a converter may re-serialize its input
/// for cosmetic reasons (such as a version suffix) without reporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub changed: bool,
}

impl<'a> Converted<'a> {
    pub fn unchanged(bytes: &'a [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
            changed: false,
        }
    }

    pub fn rewritten(bytes: Vec<u8>, changed: bool) -> Self {
        Self {
            bytes: Cow::Owned(bytes),
            changed,
        }
    }

    /// `true` when the output bytes differ from the input.
    pub fn is_rewritten(&self) -> bool {
        matches!(self.bytes, Cow::Owned(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.into_owned()
    }
}

/// A strategy for one kind of payload.
pub trait Converter: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether `path` (an archive entry name or file path) belongs to this
    /// converter.
    fn accepts(&self, path: &str) -> bool;

    fn convert<'a>(&self, path: &str, src: &'a [u8], profile: &Profile)
        -> Result<Converted<'a>>;

    /// Describes this converter's behaviour for cache keys. `None` when the
    /// output depends on state that cannot be described, which makes any
    /// registry holding it uncacheable.
    fn cache_identity(&self) -> Option<String> {
        Some(self.name().to_owned())
    }
}

/// Lower-cased text after the last `.` of the file name, or `""`.
pub fn extension(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(dot) => file_name[dot + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_file_name_only() {
        assert_eq!(extension("WEB-INF/classes/Hello.CLASS"), "class");
        assert_eq!(extension("lib.d/README"), "");
        assert_eq!(extension("C:\\app\\web.xml"), "xml");
        assert_eq!(extension("archive.tar.gz"), "gz");
    }
}
