//! JAR manifest reading and writing.
//!
//! Attributes keep their original order and spelling. Names are compared
//! ASCII case-insensitively, as the JAR format requires.

use std::fmt;

const MAX_LINE: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,
    #[error("line {line}: invalid header")]
    InvalidHeader { line: usize },
    #[error("line {line}: continuation line without a header")]
    OrphanContinuation { line: usize },
    #[error("line {line}: section does not start with a `Name` attribute")]
    MissingName { line: usize },
}

/// One block of `Name: value` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    attributes: Vec<(String, String)>,
}

impl Section {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Replaces the value of an existing attribute or appends a new one.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        match self.get_mut(name) {
            Some(slot) => *slot = value.into(),
            None => self.attributes.push((name.to_string(), value.into())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(pos).1)
    }

    /// Keeps only attributes for which `keep(name, value)` is true. Returns
    /// the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|(key, value)| keep(key, value));
        before - self.attributes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.attributes
            .iter_mut()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The `Name` of a per-entry section.
    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    fn write(&self, out: &mut Vec<u8>, version_first: bool) {
        let version = version_first
            .then(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("Manifest-Version"))
            })
            .flatten();
        if let Some((key, value)) = version {
            write_header(out, key, value);
        }
        for (key, value) in &self.attributes {
            if version.is_some_and(|(v, _)| std::ptr::eq(v, key)) {
                continue;
            }
            write_header(out, key, value);
        }
        out.extend_from_slice(b"\r\n");
    }
}

/// A parsed `META-INF/MANIFEST.MF`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub main: Section,
    pub entries: Vec<Section>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut manifest = Manifest::default();
        let mut current = Section::default();
        let mut in_main = true;

        for (idx, line) in split_lines(text).enumerate() {
            let line_no = idx + 1;
            if line.is_empty() {
                if in_main {
                    manifest.main = std::mem::take(&mut current);
                    in_main = false;
                } else if !current.is_empty() {
                    manifest.entries.push(std::mem::take(&mut current));
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let (_, value) = current
                    .attributes
                    .last_mut()
                    .ok_or(ManifestError::OrphanContinuation { line: line_no })?;
                value.push_str(rest);
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or(ManifestError::InvalidHeader { line: line_no })?;
            if name.is_empty() || name.contains(' ') {
                return Err(ManifestError::InvalidHeader { line: line_no });
            }
            if !in_main && current.is_empty() && !name.eq_ignore_ascii_case("Name") {
                return Err(ManifestError::MissingName { line: line_no });
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            current.attributes.push((name.to_string(), value.to_string()));
        }

        if in_main {
            manifest.main = current;
        } else if !current.is_empty() {
            manifest.entries.push(current);
        }
        Ok(manifest)
    }

    /// Serializes with CRLF line endings and 72-byte line folding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.main.write(&mut out, true);
        for entry in &self.entries {
            entry.write(&mut out, false);
        }
        out
    }

    /// Main section first, then every per-entry section.
    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        std::iter::once(&mut self.main).chain(self.entries.iter_mut())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find(['\r', '\n']) else {
            let line = rest;
            rest = "";
            return Some(line);
        };
        let line = &rest[..end];
        let skip = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + skip..];
        Some(line)
    })
}

fn write_header(out: &mut Vec<u8>, name: &str, value: &str) {
    let line = format!("{name}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE;
    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.extend_from_slice(rest[..cut].as_bytes());
        out.extend_from_slice(b"\r\n ");
        rest = &rest[cut..];
        // The leading space of a continuation line counts towards the limit.
        limit = MAX_LINE - 1;
    }
    out.extend_from_slice(rest.as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_sections_and_continuations() {
        let src = "Manifest-Version: 1.0\nExport-Package: javax.servlet;versi\n on=\"4.0\"\n\nName: a/B.class\nSHA-256-Digest: abc=\n\n";
        let manifest = Manifest::parse(src.as_bytes()).unwrap();
        assert_eq!(manifest.main.get("manifest-version"), Some("1.0"));
        assert_eq!(
            manifest.main.get("Export-Package"),
            Some("javax.servlet;version=\"4.0\"")
        );
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries[0].name(), Some("a/B.class"));
    }

    #[test]
    fn long_values_fold_at_72_bytes() {
        let mut manifest = Manifest::default();
        manifest.main.insert("Manifest-Version", "1.0");
        let long = "x".repeat(150);
        manifest.main.insert("Import-Package", long.clone());

        let bytes = manifest.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        for line in text.split("\r\n") {
            assert!(line.len() <= 72, "{line:?}");
        }
        assert_eq!(Manifest::parse(&bytes).unwrap(), manifest);
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
    }

    #[test]
    fn manifest_version_is_written_first() {
        let mut manifest = Manifest::default();
        manifest.main.insert("Created-By", "test");
        manifest.main.insert("Manifest-Version", "1.0");
        let text = manifest.to_string();
        assert_eq!(text, "Manifest-Version: 1.0\r\nCreated-By: test\r\n\r\n");
    }

    #[test]
    fn entry_section_requires_name() {
        let err = Manifest::parse(b"Manifest-Version: 1.0\n\nFoo: bar\n").unwrap_err();
        assert_eq!(err, ManifestError::MissingName { line: 3 });
        let err = Manifest::parse(b" orphan\n").unwrap_err();
        assert_eq!(err, ManifestError::OrphanContinuation { line: 1 });
    }
}
