/// One namespace family covered by a profile.
///
/// A rule is a dotted path below the namespace token (`servlet`,
/// `security.auth.message`). It may optionally be narrowed to a fixed set of
/// leaf names (the `annotation` classes that moved) and may carve out child
/// segments that stay on the old convention (`transaction` except `xa`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceRule {
    path: Vec<String>,
    leaves: Vec<Vec<String>>,
    excluded_children: Vec<String>,
}

impl NamespaceRule {
    /// Matches every symbol under `path`.
    pub fn namespace(path: &str) -> Self {
        Self {
            path: split_segments(path),
            leaves: Vec::new(),
            excluded_children: Vec::new(),
        }
    }

    /// Matches only the listed leaves under `path`.
    pub fn leaves<'a>(path: &str, leaves: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            path: split_segments(path),
            leaves: leaves.into_iter().map(split_segments).collect(),
            excluded_children: Vec::new(),
        }
    }

    /// Do not match when the path is immediately followed by `child`.
    #[must_use]
    pub fn except(mut self, child: &str) -> Self {
        self.excluded_children.push(child.to_string());
        self
    }

    /// Tries to match this rule at `start`, which points just past the
    /// namespace token. Returns the end offset of the match.
    pub(crate) fn match_at(&self, haystack: &[u8], start: usize) -> Option<usize> {
        let mut pos = match_segments(haystack, start, &self.path)?;

        for child in &self.excluded_children {
            if is_separator(haystack.get(pos).copied())
                && haystack[pos + 1..].starts_with(child.as_bytes())
            {
                return None;
            }
        }

        if !self.leaves.is_empty() {
            pos = self
                .leaves
                .iter()
                .find_map(|leaf| match_segments(haystack, pos, leaf))?;
        }

        Some(pos)
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split(['.', '/'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Matches `[./]segment` for every segment, allowing either separator at each
/// step independently.
fn match_segments(haystack: &[u8], mut pos: usize, segments: &[String]) -> Option<usize> {
    for segment in segments {
        if !is_separator(haystack.get(pos).copied()) {
            return None;
        }
        pos += 1;
        if !haystack[pos..].starts_with(segment.as_bytes()) {
            return None;
        }
        pos += segment.len();
    }
    Some(pos)
}

fn is_separator(byte: Option<u8>) -> bool {
    matches!(byte, Some(b'.') | Some(b'/'))
}
