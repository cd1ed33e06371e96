use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use time::{Date, Duration};

use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::hash::ContentHash;
use crate::lock::CacheLock;
use crate::metadata::{scan_objects, today, CacheMetadata, METADATA_FILE, OBJECT_EXTENSION};
use crate::util::{is_tmp_file_name, remove_file_best_effort};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

const LOCK_FILE: &str = ".lock";

/// State shared between a [`ConversionCache`] and its entries.
#[derive(Debug)]
pub(crate) struct Shared {
    root: PathBuf,
    retention_days: u32,
    metadata: Mutex<CacheMetadata>,
}

impl Shared {
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn record_access(&self, hash: &ContentHash) {
        self.metadata().touch(hash, today());
    }

    fn metadata(&self) -> MutexGuard<'_, CacheMetadata> {
        self.metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn object_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join(hash.shard())
            .join(format!("{hash}.{OBJECT_EXTENSION}"))
    }

    fn lock(&self) -> Result<CacheLock> {
        CacheLock::lock_exclusive(&self.root.join(LOCK_FILE))
    }

    /// Folds in what other processes recorded since this cache was opened.
    fn merge_from_disk(&self, metadata: &mut CacheMetadata) {
        let text = match fs::read_to_string(self.root.join(METADATA_FILE)) {
            Ok(text) => text,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(target: "jakartify.cache", error = %err, "failed to re-read cache metadata");
                }
                return;
            }
        };
        let on_disk = CacheMetadata::parse(&text);
        for (hash, date) in on_disk.iter() {
            if self.object_path(hash).is_file() {
                metadata.touch(hash, date);
            }
        }
    }
}

/// Outcome of a prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: usize,
    pub freed_bytes: u64,
    pub retained: usize,
}

/// Size of the cache on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {:.1} MiB",
            self.entries,
            self.total_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Content-addressed store of converted archives.
///
/// A disabled cache ([`ConversionCache::disabled`]) turns maintenance
/// operations into no-ops and rejects lookups with [`CacheError::Disabled`].
#[derive(Debug)]
pub struct ConversionCache {
    shared: Option<Shared>,
}

impl ConversionCache {
    /// Opens (creating if needed) the cache rooted at `root`.
    ///
    /// Temporary files left by an interrupted run are deleted and the
    /// metadata is loaded, falling back to a directory scan.
    pub fn open(root: impl Into<PathBuf>, retention_days: u32) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CacheError::CreateDir {
            path: root.clone(),
            source,
        })?;
        if !root.is_dir() {
            return Err(CacheError::NotADirectory { path: root });
        }

        let shared = Shared {
            metadata: Mutex::new(CacheMetadata::default()),
            root,
            retention_days,
        };
        {
            let _lock = shared.lock()?;
            remove_stale_tmp_files(&shared.root)?;
            *shared.metadata() = CacheMetadata::load(&shared.root, today())?;
        }

        tracing::info!(
            target: "jakartify.cache",
            root = %shared.root.display(),
            retention_days,
            "conversion cache enabled"
        );
        Ok(Self {
            shared: Some(shared),
        })
    }

    pub fn disabled() -> Self {
        Self { shared: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    pub fn root(&self) -> Option<&Path> {
        self.shared.as_ref().map(Shared::root)
    }

    pub fn retention_days(&self) -> u32 {
        self.shared.as_ref().map_or(0, |shared| shared.retention_days)
    }

    fn shared(&self) -> Result<&Shared> {
        self.shared.as_ref().ok_or(CacheError::Disabled)
    }

    /// Looks up the conversion of `bytes` under the profile identified by
    /// `profile_identity`.
    pub fn lookup(&self, profile_identity: &str, bytes: &[u8]) -> Result<CacheEntry<'_>> {
        self.lookup_hash(ContentHash::compute(profile_identity, bytes))
    }

    /// Looks up a precomputed key. A hit counts as an access.
    pub fn lookup_hash(&self, hash: ContentHash) -> Result<CacheEntry<'_>> {
        let shared = self.shared()?;
        let path = shared.object_path(&hash);
        let exists = path.is_file();
        if exists {
            shared.record_access(&hash);
            tracing::debug!(target: "jakartify.cache", hash = %hash, "cache hit");
        } else {
            tracing::debug!(target: "jakartify.cache", hash = %hash, "cache miss");
        }
        Ok(CacheEntry::new(shared, hash, exists, path))
    }

    pub fn last_access(&self, hash: &ContentHash) -> Option<Date> {
        self.shared.as_ref()?.metadata().last_access(hash)
    }

    pub fn metadata(&self) -> Option<CacheMetadata> {
        self.shared.as_ref().map(|shared| shared.metadata().clone())
    }

    /// Persists the access dates, merged with what other processes saved.
    pub fn save_metadata(&self) -> Result<()> {
        let Some(shared) = &self.shared else {
            return Ok(());
        };
        let _lock = shared.lock()?;
        let mut metadata = shared.metadata();
        shared.merge_from_disk(&mut metadata);
        metadata.save(&shared.root)
    }

    /// Saves metadata and prunes expired entries. Run once a migration has
    /// finished.
    pub fn finalize(&self) -> Result<PruneReport> {
        self.prune()
    }

    pub fn prune(&self) -> Result<PruneReport> {
        self.prune_as_of(today())
    }

    /// Deletes every entry last accessed more than `retention_days` before
    /// `today`, then rewrites the metadata file.
    pub fn prune_as_of(&self, today: Date) -> Result<PruneReport> {
        let Some(shared) = &self.shared else {
            return Ok(PruneReport::default());
        };
        let cutoff = today
            .checked_sub(Duration::days(i64::from(shared.retention_days)))
            .unwrap_or(Date::MIN);

        let _lock = shared.lock()?;
        let mut metadata = shared.metadata();
        shared.merge_from_disk(&mut metadata);

        let expired: Vec<(ContentHash, Date)> = metadata
            .iter()
            .filter(|(_, last_access)| *last_access < cutoff)
            .map(|(hash, date)| (hash.clone(), date))
            .collect();

        let mut report = PruneReport::default();
        for (hash, last_access) in expired {
            let path = shared.object_path(&hash);
            let size = match fs::metadata(&path) {
                Ok(meta) => Some(meta.len()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => None,
                Err(err) => return Err(err.into()),
            };
            match size {
                Some(size) => match fs::remove_file(&path) {
                    Ok(()) => {
                        report.removed += 1;
                        report.freed_bytes += size;
                        metadata.remove(&hash);
                        tracing::debug!(
                            target: "jakartify.cache",
                            hash = %hash,
                            last_access = %last_access,
                            "pruned cache entry"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(
                            target: "jakartify.cache",
                            hash = %hash,
                            error = %err,
                            "failed to prune cache entry"
                        );
                    }
                },
                None => {
                    metadata.remove(&hash);
                }
            }
        }
        report.retained = metadata.len();
        metadata.save(&shared.root)?;

        if report.removed > 0 {
            tracing::info!(
                target: "jakartify.cache",
                removed = report.removed,
                freed_bytes = report.freed_bytes,
                retention_days = shared.retention_days,
                "pruned conversion cache"
            );
        } else {
            tracing::debug!(
                target: "jakartify.cache",
                retention_days = shared.retention_days,
                "nothing to prune"
            );
        }
        Ok(report)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let shared = self.shared()?;
        let mut stats = CacheStats::default();
        for (_, path) in scan_objects(&shared.root)? {
            stats.entries += 1;
            stats.total_bytes += fs::metadata(&path)?.len();
        }
        Ok(stats)
    }

    /// Deletes every cached object and the metadata file.
    pub fn clear(&self) -> Result<()> {
        let Some(shared) = &self.shared else {
            return Ok(());
        };
        let _lock = shared.lock()?;
        for child in fs::read_dir(&shared.root)? {
            let child = child?;
            if child.file_name() == LOCK_FILE {
                continue;
            }
            let path = child.path();
            if child.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        shared.metadata().clear();
        tracing::info!(target: "jakartify.cache", root = %shared.root.display(), "cleared conversion cache");
        Ok(())
    }
}

fn remove_stale_tmp_files(root: &Path) -> Result<()> {
    for child in fs::read_dir(root)? {
        let child = child?;
        let name = child.file_name();
        let is_tmp = name.to_str().is_some_and(is_tmp_file_name);
        if is_tmp && child.file_type()?.is_file() {
            let path = child.path();
            if remove_file_best_effort(&path, "open.stale_tmp") {
                tracing::debug!(target: "jakartify.cache", path = %path.display(), "removed stale temporary file");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_cache_rejects_lookups() {
        let cache = ConversionCache::disabled();
        assert!(!cache.is_enabled());
        assert!(matches!(cache.lookup("p", b"x"), Err(CacheError::Disabled)));
        assert!(matches!(cache.stats(), Err(CacheError::Disabled)));
        assert_eq!(cache.finalize().unwrap(), PruneReport::default());
        cache.clear().unwrap();
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        let err = ConversionCache::open(&file, 1).unwrap_err();
        assert!(matches!(err, CacheError::CreateDir { .. } | CacheError::NotADirectory { .. }));
    }

    #[test]
    fn stats_display_is_human_readable() {
        let stats = CacheStats {
            entries: 3,
            total_bytes: 3 * 1024 * 1024,
        };
        assert_eq!(stats.to_string(), "3 entries, 3.0 MiB");
    }
}
