use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use jakartify_classfile::{decode_modified_utf8, encode_modified_utf8, ClassFile, ExclusionAnalyzer};
use jakartify_profile::Profile;

use crate::{extension, ConvertError, Converted, Converter, Result};

/// Answers whether a class resource is visible to the running container.
///
/// `path` is a resource path such as `jakarta/servlet/Filter.class`.
pub trait ResourceResolver: Send + Sync {
    fn resource_exists(&self, path: &str) -> bool;
}

impl<F> ResourceResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn resource_exists(&self, path: &str) -> bool {
        self(path)
    }
}

impl ResourceResolver for HashSet<String> {
    fn resource_exists(&self, path: &str) -> bool {
        self.contains(path)
    }
}

/// Rewrites the `CONSTANT_Utf8` entries of class files.
///
/// In batch mode (the default) every matching entry is rewritten. In runtime
/// mode a rewritten reference is only kept when the class it names can be
/// resolved; see [`ClassConverter::runtime`].
#[derive(Clone, Default)]
pub struct ClassConverter {
    resolver: Option<Arc<dyn ResourceResolver>>,
}

impl fmt::Debug for ClassConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassConverter")
            .field("runtime", &self.resolver.is_some())
            .finish()
    }
}

impl ClassConverter {
    pub fn batch() -> Self {
        Self::default()
    }

    /// A converter that reverts any rewritten type reference `resolver`
    /// cannot find.
    pub fn runtime(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }
}

impl Converter for ClassConverter {
    fn name(&self) -> &'static str {
        "class"
    }

    fn accepts(&self, path: &str) -> bool {
        extension(path) == "class"
    }

    fn convert<'a>(&self, path: &str, src: &'a [u8], profile: &Profile) -> Result<Converted<'a>> {
        convert_class(path, src, profile, self.resolver.as_deref())
    }

    // Runtime output depends on what the resolver can see.
    fn cache_identity(&self) -> Option<String> {
        match self.resolver {
            Some(_) => None,
            None => Some(self.name().to_owned()),
        }
    }
}

/// Load-time hook: converts a class as it is being defined.
#[derive(Debug, Clone)]
pub struct ClassTransformer {
    profile: Profile,
}

impl ClassTransformer {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the rewritten class, or `None` when the class is left as is.
    ///
    /// Only references that `loader` can resolve are rewritten.
    pub fn transform(
        &self,
        loader: &dyn ResourceResolver,
        class_name: &str,
        bytes: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let converted = convert_class(class_name, bytes, &self.profile, Some(loader))?;
        Ok(converted.is_rewritten().then(|| converted.into_bytes()))
    }
}

fn convert_class<'a>(
    path: &str,
    src: &'a [u8],
    profile: &Profile,
    resolver: Option<&dyn ResourceResolver>,
) -> Result<Converted<'a>> {
    let class_error = |source| ConvertError::ClassFile {
        path: path.to_string(),
        source,
    };

    let mut class = ClassFile::parse(src).map_err(class_error)?;
    if profile.is_identity() {
        return Ok(Converted::unchanged(src));
    }
    let exclusions = ExclusionAnalyzer::analyze(&class);

    let mut changed = false;
    let indices: Vec<u16> = class.constant_pool.utf8_indices().collect();
    for idx in indices {
        let raw = class.constant_pool.get_utf8_bytes(idx).map_err(class_error)?;
        let rewritten = profile.rewrite_bytes(raw);
        if !rewritten.changed {
            continue;
        }

        if !exclusions.is_empty() {
            if let Ok(symbol) = decode_modified_utf8(raw) {
                if exclusions.excludes(&symbol) {
                    tracing::debug!(
                        target: "jakartify.convert",
                        path,
                        symbol = %symbol,
                        "left excluded symbol unchanged"
                    );
                    continue;
                }
            }
        }

        let replacement = match resolver {
            None => rewritten.into_owned(),
            Some(resolver) => match resolvable_rewrite(raw, profile, resolver) {
                Some(bytes) => bytes,
                None => continue,
            },
        };
        class
            .constant_pool
            .set_utf8_bytes(idx, replacement)
            .map_err(class_error)?;
        changed = true;
    }

    if !changed {
        tracing::trace!(target: "jakartify.convert", path, "no conversion");
        return Ok(Converted::unchanged(src));
    }
    tracing::debug!(target: "jakartify.convert", path, "converted class");
    Ok(Converted::rewritten(class.to_bytes(), true))
}

/// Runtime-mode rewrite of one constant.
///
/// The rewritten string is split on `;` and `<` so each type reference is
/// checked on its own. A fragment naming a class that cannot be resolved is
/// put back to the source namespace while the other fragments keep their
/// new names. Returns `None` when nothing survives.
fn resolvable_rewrite(
    raw: &[u8],
    profile: &Profile,
    resolver: &dyn ResourceResolver,
) -> Option<Vec<u8>> {
    let original = decode_modified_utf8(raw).ok()?;
    let proposed = profile.rewrite(&original).into_owned();

    let target_slash = format!("{}/", profile.target());
    let target_dot = format!("{}.", profile.target());
    let mut result = proposed.clone();
    for fragment in proposed.split([';', '<']) {
        let (pos, dotted) = match fragment.find(&target_slash) {
            Some(pos) => (pos, false),
            None => match fragment.find(&target_dot) {
                Some(pos) => (pos, true),
                None => continue,
            },
        };

        let class_name = &fragment[pos..];
        let mut resource = if dotted {
            class_name.replace('.', "/")
        } else {
            class_name.to_string()
        };
        resource.push_str(".class");
        if resolver.resource_exists(&resource) {
            continue;
        }

        tracing::debug!(
            target: "jakartify.convert",
            class = %class_name.replace('/', "."),
            "replacement class not found; keeping original name"
        );
        let reverted = if dotted {
            fragment.replace(&target_dot, &format!("{}.", profile.source()))
        } else {
            fragment.replace(&target_slash, &format!("{}/", profile.source()))
        };
        result = result.replace(fragment, &reverted);
    }

    (result != *original).then(|| encode_modified_utf8(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jakartify_profile::BuiltinProfile;

    #[test]
    fn accepts_class_extension_only() {
        let converter = ClassConverter::batch();
        assert!(converter.accepts("HelloServlet.class"));
        assert!(converter.accepts("WEB-INF/classes/Hello.CLASS"));
        assert!(!converter.accepts("HelloServlet.java"));
    }

    #[test]
    fn runtime_mode_has_no_cache_identity() {
        assert_eq!(ClassConverter::batch().cache_identity().as_deref(), Some("class"));
        let runtime = ClassConverter::runtime(Arc::new(|_: &str| true));
        assert_eq!(runtime.cache_identity(), None);
    }

    #[test]
    fn unresolvable_fragments_are_reverted_individually() {
        let profile = BuiltinProfile::Tomcat.profile();
        let resolver = |path: &str| path == "jakarta/servlet/Filter.class";
        let out = resolvable_rewrite(
            b"(Ljavax/servlet/Filter;Ljavax/servlet/DoesNotExist;)V",
            profile,
            &resolver,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "(Ljakarta/servlet/Filter;Ljavax/servlet/DoesNotExist;)V"
        );
    }

    #[test]
    fn dotted_names_are_checked_as_resources() {
        let profile = BuiltinProfile::Tomcat.profile();
        let none = |_: &str| false;
        assert_eq!(
            resolvable_rewrite(b"javax.servlet.DoesNotExist", profile, &none),
            None
        );
        let all = |_: &str| true;
        assert_eq!(
            resolvable_rewrite(b"javax.servlet.CommonGatewayInterface", profile, &all).as_deref(),
            Some(&b"jakarta.servlet.CommonGatewayInterface"[..])
        );
    }
}
