use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::rule::NamespaceRule;

/// Result of a rewrite: the (possibly borrowed) value plus an explicit flag
/// telling whether anything was replaced.
pub struct Rewritten<'a, T: ?Sized + ToOwned> {
    pub value: Cow<'a, T>,
    pub changed: bool,
}

impl<T: ?Sized + ToOwned> Clone for Rewritten<'_, T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            changed: self.changed,
        }
    }
}

impl<T> fmt::Debug for Rewritten<'_, T>
where
    T: ?Sized + ToOwned + fmt::Debug,
    T::Owned: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewritten")
            .field("value", &self.value)
            .field("changed", &self.changed)
            .finish()
    }
}

impl<'a, T: ?Sized + ToOwned> Rewritten<'a, T> {
    fn unchanged(value: &'a T) -> Self {
        Self {
            value: Cow::Borrowed(value),
            changed: false,
        }
    }

    pub fn into_owned(self) -> T::Owned {
        self.value.into_owned()
    }
}

/// A directional, immutable rewrite rule set.
#[derive(Clone)]
pub struct Profile {
    name: String,
    source: String,
    target: String,
    rules: Arc<[NamespaceRule]>,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        rules: impl Into<Arc<[NamespaceRule]>>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            rules: rules.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace token being migrated away from (`javax`).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Namespace token being migrated to (`jakarta`).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Stable identity used when keying derived artifacts (e.g. the conversion
    /// cache) so that two profiles never share results.
    pub fn identity(&self) -> String {
        format!("{}|{}|{}", self.name, self.source, self.target)
    }

    /// `true` when source and target tokens are equal, i.e. the profile can
    /// never change anything.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// The same namespace rules applied in the opposite direction.
    pub fn inverse(&self) -> Profile {
        Profile {
            name: format!("{}-inverse", self.name),
            source: self.target.clone(),
            target: self.source.clone(),
            rules: Arc::clone(&self.rules),
        }
    }

    /// Same as [`Profile::inverse`] but with an explicit name.
    pub fn inverse_named(&self, name: impl Into<String>) -> Profile {
        Profile {
            name: name.into(),
            ..self.inverse()
        }
    }

    pub fn matches(&self, symbol: &str) -> bool {
        !self.find_matches(symbol.as_bytes()).is_empty()
    }

    /// Rewrites every matching namespace token in `input`.
    pub fn rewrite<'a>(&self, input: &'a str) -> Rewritten<'a, str> {
        let positions = self.find_matches(input.as_bytes());
        if positions.is_empty() || self.is_identity() {
            return Rewritten::unchanged(input);
        }

        let mut out = String::with_capacity(input.len() + positions.len() * 2);
        let mut last = 0;
        for pos in positions {
            // Tokens are ASCII, so `pos` and `pos + source.len()` are char boundaries.
            out.push_str(&input[last..pos]);
            out.push_str(&self.target);
            last = pos + self.source.len();
        }
        out.push_str(&input[last..]);

        Rewritten {
            value: Cow::Owned(out),
            changed: true,
        }
    }

    /// Byte-level variant of [`Profile::rewrite`]. Bytes that are not part of a
    /// matched token are copied untouched, whatever their encoding.
    pub fn rewrite_bytes<'a>(&self, input: &'a [u8]) -> Rewritten<'a, [u8]> {
        let positions = self.find_matches(input);
        if positions.is_empty() || self.is_identity() {
            return Rewritten::unchanged(input);
        }

        let mut out = Vec::with_capacity(input.len() + positions.len() * 2);
        let mut last = 0;
        for pos in positions {
            out.extend_from_slice(&input[last..pos]);
            out.extend_from_slice(self.target.as_bytes());
            last = pos + self.source.len();
        }
        out.extend_from_slice(&input[last..]);

        Rewritten {
            value: Cow::Owned(out),
            changed: true,
        }
    }

    /// Offsets of every source token that starts a match, leftmost-first and
    /// non-overlapping.
    fn find_matches(&self, haystack: &[u8]) -> Vec<usize> {
        let token = self.source.as_bytes();
        let mut found = Vec::new();
        if token.is_empty() {
            return found;
        }

        let mut pos = 0;
        while pos + token.len() <= haystack.len() {
            if !haystack[pos..].starts_with(token) {
                pos += 1;
                continue;
            }

            let after = pos + token.len();
            match self.rules.iter().find_map(|rule| rule.match_at(haystack, after)) {
                Some(end) => {
                    found.push(pos);
                    pos = end;
                }
                None => pos += 1,
            }
        }
        found
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn servlet_only() -> Profile {
        Profile::new(
            "servlet",
            "javax",
            "jakarta",
            vec![NamespaceRule::namespace("servlet")],
        )
    }

    #[test]
    fn rewrite_preserves_descriptor_punctuation() {
        let profile = servlet_only();
        let out = profile.rewrite("(Ljavax/servlet/ServletRequest;Ljava/util/List<Ljavax/servlet/Filter;>;)V");
        assert!(out.changed);
        assert_eq!(
            out.value,
            "(Ljakarta/servlet/ServletRequest;Ljava/util/List<Ljakarta/servlet/Filter;>;)V"
        );
    }

    #[test]
    fn rewrite_reports_unchanged_input() {
        let profile = servlet_only();
        let out = profile.rewrite("javax.swing.JFrame");
        assert!(!out.changed);
        assert!(matches!(out.value, Cow::Borrowed(_)));
    }

    #[test]
    fn identity_profile_never_changes() {
        let profile = Profile::new(
            "noop",
            "javax",
            "javax",
            vec![NamespaceRule::namespace("servlet")],
        );
        assert!(profile.matches("javax.servlet.Filter"));
        let out = profile.rewrite("javax.servlet.Filter");
        assert!(!out.changed);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let profile = servlet_only();
        let once = profile.rewrite("import javax.servlet.http.*;").into_owned();
        let twice = profile.rewrite(&once);
        assert!(!twice.changed);
        assert_eq!(twice.value, "import jakarta.servlet.http.*;");
    }

    #[test]
    fn inverse_undoes_rewrite() {
        let profile = servlet_only();
        let inverse = profile.inverse();
        let forward = profile.rewrite("javax/servlet/Servlet").into_owned();
        assert_eq!(inverse.rewrite(&forward).value, "javax/servlet/Servlet");
    }

    #[test]
    fn rewrite_bytes_leaves_non_utf8_untouched() {
        let profile = servlet_only();
        let input = b"\xff\xfejavax.servlet\x80";
        let out = profile.rewrite_bytes(input);
        assert!(out.changed);
        assert_eq!(&*out.value, b"\xff\xfejakarta.servlet\x80");
    }
}
