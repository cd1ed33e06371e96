//! Archive rewriting.
//!
//! [`ArchiveEngine`] converts one named payload at a time. Archives (by
//! extension) are opened and every entry is converted in turn: nested
//! archives recursively, everything else through the converter registry.
//! Entry names are rewritten too, and JAR signature files are dropped since
//! any rewrite invalidates them.
//!
//! Two buffering modes produce identical output. The default spools archive
//! data to a temporary file once it outgrows a memory threshold; the
//! in-memory mode keeps everything in RAM.

#![forbid(unsafe_code)]

mod buffer;
mod engine;
mod excludes;

pub use crate::engine::{is_archive, is_signature_file, ArchiveEngine, ARCHIVE_EXTENSIONS};
pub use crate::excludes::{Excludes, DEFAULT_EXCLUDES};

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{archive}: invalid archive")]
    Zip {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Convert(#[from] jakartify_convert::ConvertError),

    #[error("conversion cache error: {0}")]
    Cache(#[from] jakartify_cache::CacheError),

    #[error("invalid exclude pattern `{pattern}`")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
