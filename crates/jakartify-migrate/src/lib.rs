//! Migration of a file or directory tree.
//!
//! [`Migration`] mirrors the source tree into the destination, handing every
//! file to an [`ArchiveEngine`](jakartify_archive::ArchiveEngine). Directory
//! and file names below the source root are rewritten with the profile, so
//! `META-INF/services/javax.servlet.ServletContainerInitializer` lands under
//! its `jakarta` name. Converting a file onto itself buffers the result in
//! memory before the original is overwritten.

#![forbid(unsafe_code)]

mod migration;
mod report;

use std::path::PathBuf;

use jakartify_archive::ArchiveError;
use jakartify_cache::CacheError;
use jakartify_config::ConfigError;
use thiserror::Error;

pub use crate::migration::Migration;
pub use crate::report::{CacheSummary, MigrationReport};

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid exclude configuration: {0}")]
    Excludes(#[source] ArchiveError),
    #[error("cannot read source {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to convert {path}: {source}")]
    Convert {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },
    #[error("failed to open conversion cache: {0}")]
    Cache(#[from] CacheError),
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
}
