//! `Export-Package` / `Import-Package` version handling.
//!
//! Once `javax.servlet` packages have been renamed to `jakarta.servlet`, their
//! declared versions must move to the Jakarta Servlet line as well. Exports
//! get a single version, imports a range.

use std::sync::OnceLock;

use regex::Regex;

const SERVLET_PACKAGE: &str = "jakarta.servlet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BundleHeader {
    Export,
    Import,
}

impl BundleHeader {
    pub(crate) fn from_attribute(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("Export-Package") {
            Some(Self::Export)
        } else if name.eq_ignore_ascii_case("Import-Package") {
            Some(Self::Import)
        } else {
            None
        }
    }

    fn servlet_version(self) -> &'static str {
        match self {
            BundleHeader::Export => "5.0.0",
            BundleHeader::Import => "[5.0.0,7.0.0)",
        }
    }
}

/// Sets the `version` attribute of every `jakarta.servlet*` clause.
pub(crate) fn update_servlet_versions(value: &str, header: BundleHeader) -> String {
    if !value.contains(SERVLET_PACKAGE) {
        return value.to_string();
    }
    match rewrite_clauses(value, header) {
        Some(updated) => updated,
        None => {
            tracing::debug!(
                target: "jakartify.convert",
                header = ?header,
                "unparseable bundle header; falling back to pattern replace"
            );
            fallback_replace(value, header)
        }
    }
}

/// Clause-aware rewrite. `None` if the header is not well formed.
fn rewrite_clauses(value: &str, header: BundleHeader) -> Option<String> {
    let mut clauses = Vec::new();
    for clause in split_unquoted(value, ',')? {
        let parts = split_unquoted(clause, ';')?;
        let mut names = Vec::new();
        let mut attrs = Vec::new();
        for part in &parts {
            match part.find('=') {
                Some(eq) => {
                    let key = part[..eq].trim().trim_end_matches(':');
                    if key.is_empty() {
                        return None;
                    }
                    attrs.push((key, *part, eq));
                }
                None if attrs.is_empty() => {
                    if part.trim().is_empty() {
                        return None;
                    }
                    names.push(part.trim());
                }
                // A package name after the first attribute.
                None => return None,
            }
        }
        if names.is_empty() {
            return None;
        }

        let is_servlet = names.iter().any(|name| name.starts_with(SERVLET_PACKAGE));
        let rebuilt: Vec<String> = parts
            .iter()
            .map(|part| {
                let version = attrs.iter().find(|(key, raw, eq)| {
                    *key == "version" && std::ptr::eq(*raw, *part) && !raw[..*eq].ends_with(':')
                });
                match version {
                    Some((_, raw, eq)) if is_servlet => {
                        format!("{}=\"{}\"", &raw[..*eq], header.servlet_version())
                    }
                    _ => part.to_string(),
                }
            })
            .collect();
        clauses.push(rebuilt.join(";"));
    }
    Some(clauses.join(","))
}

/// Splits on `sep` outside double quotes. `None` on an unterminated quote.
fn split_unquoted(value: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, ch) in value.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                parts.push(&value[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if quoted {
        return None;
    }
    parts.push(&value[start..]);
    Some(parts)
}

fn fallback_replace(value: &str, header: BundleHeader) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"jakarta\.servlet([^,;]*);version="([^"]*)""#).expect("valid regex")
    });
    let replacement = format!(r#"jakarta.servlet${{1}};version="{}""#, header.servlet_version());
    re.replace_all(value, replacement.as_str()).into_owned()
}
