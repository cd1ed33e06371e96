//! Namespace rewrite profiles.
//!
//! A [`Profile`] pairs a source namespace token (`javax`) with a target token
//! (`jakarta`) and a list of [`NamespaceRule`]s describing which child
//! namespaces move. Profiles are immutable once built; the built-in ones live
//! in process-wide statics and are shared by reference.
//!
//! Symbols may use either `.` or `/` between segments and may be embedded in
//! descriptors (`(Ljavax/servlet/ServletRequest;)V`), signatures or free text.
//! Rewriting only ever replaces the namespace token itself, so every other
//! byte of the input is preserved.

#![forbid(unsafe_code)]

mod builtin;
mod profile;
mod rule;

pub use crate::builtin::{BuiltinProfile, ANNOTATION_CLASSES};
pub use crate::profile::{Profile, Rewritten};
pub use crate::rule::NamespaceRule;

pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown profile `{0}` (expected one of: TOMCAT, EE, JEE8)")]
    Unknown(String),
}
