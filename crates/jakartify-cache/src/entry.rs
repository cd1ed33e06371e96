use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cache::Shared;
use crate::error::{CacheError, Result};
use crate::hash::ContentHash;
use crate::util::{open_unique_tmp_file, remove_file_best_effort, rename_replacing};

/// The result of one cache lookup.
///
/// A hit (`exists() == true`) is a read-only view of a committed object. A
/// miss can be filled with [`CacheEntry::begin_store`] followed by
/// [`CacheEntry::commit_store`]; dropping the entry without committing
/// discards the temporary file.
#[derive(Debug)]
pub struct CacheEntry<'c> {
    cache: &'c Shared,
    hash: ContentHash,
    exists: bool,
    path: PathBuf,
    pending: Option<(PathBuf, File)>,
}

impl<'c> CacheEntry<'c> {
    pub(crate) fn new(cache: &'c Shared, hash: ContentHash, exists: bool, path: PathBuf) -> Self {
        Self {
            cache,
            hash,
            exists,
            path,
            pending: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Final location of the object, whether or not it exists yet.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Streams the cached bytes into `dest`.
    pub fn copy_to(&self, dest: &mut dyn Write) -> Result<u64> {
        let mut file = self.open()?;
        Ok(io::copy(&mut file, dest)?)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        self.require_exists()?;
        Ok(fs::read(&self.path)?)
    }

    /// Opens the committed object for reading.
    pub fn open(&self) -> Result<File> {
        self.require_exists()?;
        Ok(File::open(&self.path)?)
    }

    fn require_exists(&self) -> Result<()> {
        if self.exists {
            Ok(())
        } else {
            Err(CacheError::MissingEntry {
                hash: self.hash.to_string(),
            })
        }
    }

    /// Opens a fresh temporary file in the cache root for the converted
    /// bytes. Calling it again discards what was written so far.
    pub fn begin_store(&mut self) -> Result<&mut File> {
        self.discard_pending();
        let (tmp_path, file) = open_unique_tmp_file(self.cache.root(), self.hash.as_str())?;
        let (_, file) = self.pending.insert((tmp_path, file));
        Ok(file)
    }

    /// Moves the temporary file into place and records the access.
    ///
    /// Another process committing the same hash concurrently is harmless:
    /// both wrote identical bytes and the last rename wins.
    pub fn commit_store(mut self) -> Result<()> {
        let (tmp_path, file) = self.pending.take().ok_or_else(|| CacheError::NoPendingStore {
            hash: self.hash.to_string(),
        })?;

        let finished = file.sync_all();
        drop(file);
        if let Err(err) = finished {
            remove_file_best_effort(&tmp_path, "commit_store.sync_failed");
            return Err(err.into());
        }

        let moved = self
            .path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| rename_replacing(&tmp_path, &self.path));
        if let Err(source) = moved {
            remove_file_best_effort(&tmp_path, "commit_store.rename_failed");
            return Err(CacheError::Commit {
                from: tmp_path,
                to: self.path.clone(),
                source,
            });
        }

        self.exists = true;
        self.cache.record_access(&self.hash);
        tracing::debug!(
            target: "jakartify.cache",
            hash = %self.hash,
            size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or_default(),
            "stored cache entry"
        );
        Ok(())
    }

    /// Discards an in-progress store.
    pub fn rollback_store(mut self) {
        self.discard_pending();
    }

    /// Writes `bytes` as this entry's content and commits it.
    pub fn store(mut self, bytes: &[u8]) -> Result<()> {
        let file = self.begin_store()?;
        file.write_all(bytes)?;
        self.commit_store()
    }

    fn discard_pending(&mut self) {
        if let Some((tmp_path, file)) = self.pending.take() {
            drop(file);
            remove_file_best_effort(&tmp_path, "rollback_store");
            tracing::debug!(target: "jakartify.cache", hash = %self.hash, "discarded pending cache store");
        }
    }
}

impl Drop for CacheEntry<'_> {
    fn drop(&mut self) {
        self.discard_pending();
    }
}
