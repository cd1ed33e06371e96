mod model;
mod osgi;

use jakartify_profile::Profile;

pub use self::model::{Manifest, ManifestError, Section};
use self::osgi::{update_servlet_versions, BundleHeader};
use crate::{ConvertError, Converted, Converter, Result, TOOL_VERSION};

pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

const DIGEST_SUFFIX: &str = "-Digest";

/// Rewrites JAR manifests.
///
/// Attribute values are run through the profile, OSGi package headers get
/// their servlet versions bumped, and signature digests are stripped since
/// any rewrite invalidates them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestConverter;

impl Converter for ManifestConverter {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn accepts(&self, path: &str) -> bool {
        path == MANIFEST_NAME
            || path
                .strip_suffix(MANIFEST_NAME)
                .is_some_and(|prefix| prefix.ends_with('/'))
    }

    fn convert<'a>(&self, path: &str, src: &'a [u8], profile: &Profile) -> Result<Converted<'a>> {
        if profile.is_identity() {
            return Ok(Converted::unchanged(src));
        }

        let original = Manifest::parse(src).map_err(|source| ConvertError::Manifest {
            path: path.to_string(),
            source,
        })?;
        let mut manifest = original.clone();

        let mut changed = false;
        for section in manifest.sections_mut() {
            changed |= update_values(section, profile);
        }
        changed |= remove_signatures(&mut manifest, path);

        if manifest == original {
            tracing::trace!(target: "jakartify.convert", path, "no conversion");
            return Ok(Converted::unchanged(src));
        }
        if changed {
            tracing::debug!(target: "jakartify.convert", path, "converted manifest");
        }
        Ok(Converted::rewritten(manifest.to_bytes(), changed))
    }
}

fn update_values(section: &mut Section, profile: &Profile) -> bool {
    // Deliberately not a reportable change.
    if let Some(version) = section.get_mut("Implementation-Version") {
        version.push('-');
        version.push_str(TOOL_VERSION);
    }

    let mut changed = false;
    for (name, value) in section.iter_mut() {
        let rewritten = profile.rewrite(value);
        if !rewritten.changed {
            continue;
        }
        let mut updated = rewritten.into_owned();
        if let Some(header) = BundleHeader::from_attribute(name) {
            updated = update_servlet_versions(&updated, header);
        }
        *value = updated;
        changed = true;
    }
    changed
}

/// Drops `Signature-Version`, `*-Digest` main attributes and every per-entry
/// section carrying a digest. Returns whether anything was removed.
fn remove_signatures(manifest: &mut Manifest, path: &str) -> bool {
    let mut removed = manifest.main.remove("Signature-Version").is_some();
    removed |= manifest.main.retain(|name, _| !is_digest(name)) > 0;

    let before = manifest.entries.len();
    manifest.entries.retain(|entry| {
        let signed = entry.iter().any(|(name, _)| is_digest(name));
        if signed {
            tracing::debug!(
                target: "jakartify.convert",
                path,
                entry = entry.name().unwrap_or_default(),
                "removed signature digest"
            );
        }
        !signed
    });
    removed | (manifest.entries.len() != before)
}

fn is_digest(name: &str) -> bool {
    let suffix = DIGEST_SUFFIX.as_bytes();
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
