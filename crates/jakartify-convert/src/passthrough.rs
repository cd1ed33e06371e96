use jakartify_profile::Profile;

use crate::{Converted, Converter, Result};

/// Accepts everything and copies it unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughConverter;

impl Converter for PassThroughConverter {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn accepts(&self, _path: &str) -> bool {
        true
    }

    fn convert<'a>(&self, path: &str, src: &'a [u8], _profile: &Profile) -> Result<Converted<'a>> {
        tracing::trace!(target: "jakartify.convert", path, "copied unchanged");
        Ok(Converted::unchanged(src))
    }
}
