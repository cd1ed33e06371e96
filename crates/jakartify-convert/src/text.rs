use jakartify_profile::Profile;

use crate::{extension, Converted, Converter, Result};

/// Extensions handled as text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "java",
    "jsp",
    "jspf",
    "jspx",
    "tag",
    "tagf",
    "tagx",
    "tld",
    "txt",
    "xml",
    "json",
    "properties",
    "groovy",
    "html",
    "vm",
    "ftl",
    "sql",
    "yaml",
    "yml",
    "xhtml",
    "jsf",
    "faces",
];

/// Rewrites text payloads byte-wise.
///
/// Content is never decoded: namespace tokens are ASCII, so matching on raw
/// bytes finds them in any ASCII-compatible encoding and leaves every other
/// byte, valid UTF-8 or not, exactly as it was.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextConverter;

impl Converter for TextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn accepts(&self, path: &str) -> bool {
        TEXT_EXTENSIONS.contains(&extension(path).as_str())
    }

    fn convert<'a>(&self, path: &str, src: &'a [u8], profile: &Profile) -> Result<Converted<'a>> {
        let rewritten = profile.rewrite_bytes(src);
        if rewritten.changed {
            tracing::debug!(target: "jakartify.convert", path, "converted text");
        } else {
            tracing::trace!(target: "jakartify.convert", path, "no conversion");
        }
        Ok(Converted {
            bytes: rewritten.value,
            changed: rewritten.changed,
        })
    }
}
