use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::{ArchiveError, Result};

/// Third-party libraries known not to need conversion, matched against the
/// bare file name.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "commons-codec-*.jar",
    "commons-lang-*.jar",
    "httpclient-*.jar",
    "httpcore-*.jar",
    "asm-*.jar",
    "aspectjweaver-*.jar",
    "bcprov*.jar",
    "bcpkix*.jar",
    "closure-compiler-*.jar",
    "ecj-*.jar",
    "hystrix-core-*.jar",
    "hystrix-serialization-*.jar",
    "jackson-annotations-*.jar",
    "jackson-core-*.jar",
    "jackson-module-afterburner-*.jar",
    "jul-to-slf4j-*.jar",
    "log4j-to-slf4j-*.jar",
    "slf4j-api-*.jar",
    "spring-aop-*.jar",
    "spring-expression-*.jar",
    "spring-security-crypto-*.jar",
    "spring-security-rsa-*.jar",
];

/// Case-insensitive glob patterns for payloads copied without conversion.
///
/// User patterns match the file name, or the full path when
/// `match_path` is set. The defaults always match the file name.
#[derive(Debug, Clone)]
pub struct Excludes {
    patterns: Vec<String>,
    user: GlobSet,
    defaults: Option<GlobSet>,
    match_path: bool,
}

impl Default for Excludes {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            user: GlobSet::empty(),
            defaults: Some(default_set()),
            match_path: false,
        }
    }
}

impl Excludes {
    pub fn new<S: AsRef<str>>(
        patterns: impl IntoIterator<Item = S>,
        enable_defaults: bool,
        match_path: bool,
    ) -> Result<Self> {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().to_string())
            .collect();
        Ok(Self {
            user: build_set(&patterns)?,
            defaults: enable_defaults.then(default_set),
            patterns,
            match_path,
        })
    }

    /// Excludes nothing.
    pub fn none() -> Self {
        Self {
            defaults: None,
            ..Self::default()
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        if self
            .defaults
            .as_ref()
            .is_some_and(|defaults| defaults.is_match(file_name))
        {
            return true;
        }
        let subject = if self.match_path { path } else { file_name };
        self.user.is_match(subject)
    }

    /// Stable description of the settings, part of the conversion cache key.
    pub fn identity(&self) -> String {
        format!(
            "defaults={};path={};{}",
            self.defaults.is_some(),
            self.match_path,
            self.patterns.join(",")
        )
    }
}

fn build_set(patterns: &[impl AsRef<str>]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern: &str = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ArchiveError::InvalidExclude {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ArchiveError::InvalidExclude {
        pattern: patterns
            .iter()
            .map(AsRef::<str>::as_ref)
            .collect::<Vec<_>>()
            .join(","),
        source,
    })
}

fn default_set() -> GlobSet {
    static DEFAULTS: std::sync::OnceLock<GlobSet> = std::sync::OnceLock::new();
    DEFAULTS
        .get_or_init(|| build_set(DEFAULT_EXCLUDES).expect("valid default excludes"))
        .clone()
}
