//! Content-addressed store of converted archives.
//!
//! A conversion is keyed by the SHA-256 of the active profile's identity
//! string followed by the pre-conversion bytes, so the same input under two
//! profiles never shares an entry.
//!
//! ## On-disk layout
//!
//! - `cache-metadata.txt`: one `hash|YYYY-MM-DD` line per entry, recording
//!   the last day the entry was used. Blank and `#` lines are ignored.
//! - `xx/<hash>.jar`: the converted bytes, sharded by the first two hex
//!   digits of the hash.
//! - `<hash>.tmp.<pid>.<n>`: an in-progress store. Renamed into its shard on
//!   commit; leftovers from an interrupted run are deleted on open.
//! - `.lock`: advisory lock serialising metadata writes, prunes and clears
//!   between processes.

mod cache;
mod entry;
mod error;
mod hash;
mod lock;
mod metadata;
mod util;

pub use cache::{CacheStats, ConversionCache, PruneReport, DEFAULT_RETENTION_DAYS};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use hash::ContentHash;
pub use lock::CacheLock;
pub use metadata::{today, CacheMetadata, METADATA_FILE};
