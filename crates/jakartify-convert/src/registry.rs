use jakartify_profile::Profile;

use crate::{
    ClassConverter, Converted, Converter, ManifestConverter, PassThroughConverter, Result,
    TextConverter,
};

/// Ordered list of converters; the first one accepting a path wins.
#[derive(Debug)]
pub struct ConverterRegistry {
    converters: Vec<Box<dyn Converter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ConverterRegistry {
    /// Converters tried in the given order. Paths nobody accepts are passed
    /// through unchanged.
    pub fn new(converters: Vec<Box<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// Text, class, manifest, then pass-through.
    pub fn builtin() -> Self {
        Self::with_class_converter(ClassConverter::batch())
    }

    /// The built-in order with a caller-configured class converter (for
    /// example one running in runtime mode).
    pub fn with_class_converter(class: ClassConverter) -> Self {
        Self::new(vec![
            Box::new(TextConverter),
            Box::new(class),
            Box::new(ManifestConverter),
            Box::new(PassThroughConverter),
        ])
    }

    pub fn find(&self, path: &str) -> &dyn Converter {
        self.converters
            .iter()
            .find(|converter| converter.accepts(path))
            .map(|converter| converter.as_ref())
            .unwrap_or(&PassThroughConverter)
    }

    pub fn convert<'a>(&self, path: &str, src: &'a [u8], profile: &Profile) -> Result<Converted<'a>> {
        self.find(path).convert(path, src, profile)
    }

    /// The converters' cache identities in dispatch order, or `None` if any
    /// of them has none.
    pub fn cache_identity(&self) -> Option<String> {
        let parts = self
            .converters
            .iter()
            .map(|converter| converter.cache_identity())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order() {
        let registry = ConverterRegistry::builtin();
        assert_eq!(registry.find("a/B.java").name(), "text");
        assert_eq!(registry.find("a/B.class").name(), "class");
        assert_eq!(registry.find("META-INF/MANIFEST.MF").name(), "manifest");
        assert_eq!(registry.find("logo.png").name(), "pass-through");
    }

    #[test]
    fn cache_identity_follows_converters() {
        assert_eq!(
            ConverterRegistry::builtin().cache_identity().as_deref(),
            Some("text,class,manifest,pass-through")
        );
        assert_eq!(ConverterRegistry::new(Vec::new()).cache_identity().as_deref(), Some(""));

        let runtime = ClassConverter::runtime(std::sync::Arc::new(|_: &str| false));
        assert_eq!(ConverterRegistry::with_class_converter(runtime).cache_identity(), None);
    }

    #[test]
    fn empty_registry_passes_through() {
        let registry = ConverterRegistry::new(Vec::new());
        assert_eq!(registry.find("a/B.class").name(), "pass-through");
    }
}
