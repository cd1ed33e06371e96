//! Configuration for a migration run.
//!
//! A [`MigrationConfig`] is usually read from a TOML file and then
//! overridden from the command line:
//!
//! ```toml
//! profile = "EE"
//! excludes = ["*-legacy.jar"]
//! zip_in_memory = true
//!
//! [cache]
//! dir = "/var/cache/jakartify"
//! retention_days = 14
//!
//! [logging]
//! level = "jakartify.archive=debug,info"
//! ```

mod logging;

use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use jakartify_profile::{BuiltinProfile, Profile, ProfileError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::logging::{init_tracing, LoggingConfig};
pub use jakartify_cache::DEFAULT_RETENTION_DAYS;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

pub const DEFAULT_PROFILE: BuiltinProfile = BuiltinProfile::Tomcat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error(transparent)]
    UnknownProfile(#[from] ProfileError),
    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` includes a snippet of the input.
        ConfigError::Toml(err.message().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Name of a built-in profile (`TOMCAT`, `EE`, `JEE8`), any case.
    #[serde(default = "MigrationConfig::default_profile")]
    pub profile: String,

    /// Glob patterns for payloads copied without conversion.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Also skip the built-in list of third-party libraries known not to
    /// need conversion.
    #[serde(default = "MigrationConfig::default_true")]
    pub enable_default_excludes: bool,

    /// Match `excludes` against the full entry path instead of the file name.
    #[serde(default)]
    pub match_excludes_against_path_name: bool,

    /// Buffer archives in memory rather than spooling large ones to disk.
    #[serde(default)]
    pub zip_in_memory: bool,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MigrationConfig {
    fn default_profile() -> String {
        DEFAULT_PROFILE.as_str().to_owned()
    }

    fn default_true() -> bool {
        true
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::load_from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        tracing::debug!(target: "jakartify.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Checks the profile name and every exclude pattern.
    pub fn validate(&self) -> Result<()> {
        self.resolve_profile()?;
        for pattern in &self.excludes {
            GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::InvalidExclude {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn resolve_profile(&self) -> Result<&'static Profile> {
        Ok(Profile::by_name(&self.profile)?)
    }

    /// Paths in a config file are relative to the directory holding it.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(dir) = self.cache.dir.as_mut() {
            resolve(dir);
        }
        if let Some(file) = self.logging.file.as_mut() {
            resolve(file);
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            profile: Self::default_profile(),
            excludes: Vec::new(),
            enable_default_excludes: true,
            match_excludes_against_path_name: false,
            zip_in_memory: false,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Conversion cache directory. No directory means no caching.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Days an unused cache entry is kept.
    #[serde(default = "CacheConfig::default_retention_days")]
    pub retention_days: u32,
}

impl CacheConfig {
    fn default_retention_days() -> u32 {
        DEFAULT_RETENTION_DAYS
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MigrationConfig::load_from_str("").unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(config.profile, "TOMCAT");
        assert!(config.enable_default_excludes);
        assert_eq!(config.cache.retention_days, 30);
    }

    #[test]
    fn toml_errors_do_not_echo_input() {
        let err = MigrationConfig::load_from_str("profile = \"EE\"\nsecret_key = \"hunter2\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let message = err.to_string();
        assert!(message.contains("unknown field"), "{message}");
        assert!(!message.contains("profile = "), "{message}");
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let mut config = MigrationConfig::default();
        config.cache.dir = Some(PathBuf::from("cache"));
        config.logging.file = Some(PathBuf::from("/var/log/jakartify.log"));
        config.resolve_relative_paths(Path::new("/etc/jakartify"));
        assert_eq!(config.cache.dir, Some(PathBuf::from("/etc/jakartify/cache")));
        assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/jakartify.log")));
    }
}
