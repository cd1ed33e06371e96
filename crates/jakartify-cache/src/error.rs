use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by the conversion cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("conversion cache is disabled")]
    Disabled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create cache directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache path {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("no store in progress for cache entry {hash}")]
    NoPendingStore { hash: String },

    #[error("cache entry {hash} does not exist")]
    MissingEntry { hash: String },

    #[error("failed to move {from} into the cache at {to}")]
    Commit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
