use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use jakartify_cache::{CacheEntry, CacheError, ContentHash, ConversionCache};
use jakartify_convert::{extension, Converted, ConverterRegistry};
use jakartify_profile::Profile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::buffer::{same_content, Buffer};
use crate::{ArchiveError, Excludes, Result};

/// Extensions of payloads treated as nested archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "war", "ear", "zip", "rar"];

const SIGNATURE_DIR: &str = "META-INF/";
const SIGNATURE_SUFFIXES: &[&str] = &[".SF", ".RSA", ".DSA", ".EC"];

const ZIP64_LIMIT: u64 = u32::MAX as u64;

pub fn is_archive(name: &str) -> bool {
    ARCHIVE_EXTENSIONS.contains(&extension(name).as_str())
}

/// A JAR signature block or signature file.
pub fn is_signature_file(name: &str) -> bool {
    name.starts_with(SIGNATURE_DIR)
        && SIGNATURE_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

struct EntryInfo {
    name: String,
    is_dir: bool,
    method: CompressionMethod,
    size: u64,
    compressed_size: u64,
    modified: Option<DateTime>,
    unix_mode: Option<u32>,
}

impl EntryInfo {
    fn options(&self, len: u64) -> SimpleFileOptions {
        let method = match self.method {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let mut options = SimpleFileOptions::default()
            .compression_method(method)
            .large_file(len > ZIP64_LIMIT);
        if let Some(modified) = self.modified {
            options = options.last_modified_time(modified);
        }
        if let Some(mode) = self.unix_mode {
            options = options.unix_permissions(mode);
        }
        options
    }
}

/// Converts files and archives under one profile.
#[derive(Debug, Clone)]
pub struct ArchiveEngine {
    profile: Profile,
    registry: Arc<ConverterRegistry>,
    excludes: Excludes,
    cache: Option<Arc<ConversionCache>>,
    in_memory: bool,
}

impl ArchiveEngine {
    /// Built-in converters, default excludes, no cache, spooled buffering.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            registry: Arc::new(ConverterRegistry::builtin()),
            excludes: Excludes::default(),
            cache: None,
            in_memory: false,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn with_excludes(mut self, excludes: Excludes) -> Self {
        self.excludes = excludes;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ConversionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Keep whole archives in memory instead of spooling them to disk.
    #[must_use]
    pub fn zip_in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn excludes(&self) -> &Excludes {
        &self.excludes
    }

    /// Converts the payload `name` read from `src` into `dest`. Returns
    /// whether anything was converted.
    pub fn migrate(&self, name: &str, src: &mut dyn Read, dest: &mut dyn Write) -> Result<bool> {
        if self.excludes.is_excluded(name) {
            io::copy(src, dest)?;
            tracing::info!(target: "jakartify.archive", path = name, "skipped excluded file");
            return Ok(false);
        }
        if is_archive(name) {
            return self.migrate_archive(name, src, dest);
        }

        let mut data = Vec::new();
        src.read_to_end(&mut data)?;
        let converted = self.registry.convert(name, &data, &self.profile)?;
        dest.write_all(&converted.bytes)?;
        Ok(converted.changed)
    }

    /// Converts an in-memory payload. Archives are handled like
    /// [`ArchiveEngine::migrate`] would; unchanged payloads come back
    /// borrowed.
    pub fn convert<'a>(&self, name: &str, data: &'a [u8]) -> Result<Converted<'a>> {
        if self.excludes.is_excluded(name) {
            tracing::info!(target: "jakartify.archive", path = name, "skipped excluded file");
            return Ok(Converted::unchanged(data));
        }
        if is_archive(name) {
            let mut out = Vec::new();
            let changed = self.migrate_archive(name, &mut &data[..], &mut out)?;
            return Ok(if changed {
                Converted::rewritten(out, true)
            } else {
                Converted::unchanged(data)
            });
        }
        Ok(self.registry.convert(name, data, &self.profile)?)
    }

    /// Converts the archive `name`, consulting the conversion cache first.
    ///
    /// An archive in which nothing was converted is written out as the
    /// original bytes.
    pub fn migrate_archive(
        &self,
        name: &str,
        src: &mut dyn Read,
        dest: &mut dyn Write,
    ) -> Result<bool> {
        let mode = if self.in_memory { "memory" } else { "streaming" };
        tracing::info!(target: "jakartify.archive", archive = name, mode, "converting archive");

        let mut source = Buffer::new(self.in_memory);
        io::copy(src, &mut source)?;

        let entry = self.cache_lookup(name, &mut source);
        if let Some(hit) = entry.as_ref().filter(|entry| entry.exists()) {
            tracing::info!(
                target: "jakartify.archive",
                archive = name,
                hash = %hit.hash(),
                "using cached conversion"
            );
            source.rewind()?;
            let converted = !same_content(hit.open()?, &mut source)?;
            hit.copy_to(dest)?;
            return Ok(converted);
        }

        source.rewind()?;
        let (mut output, changed) = self.rewrite_archive(name, &mut source)?;
        let emitted = if changed { &mut output } else { &mut source };
        if let Some(entry) = entry {
            emitted.rewind()?;
            store_in_cache(name, entry, emitted);
        }
        emitted.rewind()?;
        io::copy(emitted, dest)?;

        tracing::info!(target: "jakartify.archive", archive = name, converted = changed, "archive done");
        Ok(changed)
    }

    /// Everything besides the archive bytes that shapes the output. `None`
    /// when the converters cannot be described, in which case nothing is
    /// cached.
    fn cache_key(&self) -> Option<String> {
        let converters = self.registry.cache_identity()?;
        Some(format!(
            "{}|{}|{}",
            self.profile.identity(),
            self.excludes.identity(),
            converters
        ))
    }

    fn cache_lookup(&self, name: &str, source: &mut Buffer) -> Option<CacheEntry<'_>> {
        let cache = self.cache.as_deref().filter(|cache| cache.is_enabled())?;
        let Some(key) = self.cache_key() else {
            tracing::debug!(
                target: "jakartify.archive",
                archive = name,
                "converters depend on runtime state; bypassing conversion cache"
            );
            return None;
        };
        let looked_up = source
            .rewind()
            .map_err(CacheError::from)
            .and_then(|()| ContentHash::from_reader(&key, &mut *source))
            .and_then(|hash| cache.lookup_hash(hash));
        match looked_up {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(
                    target: "jakartify.archive",
                    archive = name,
                    error = %err,
                    "conversion cache lookup failed; converting without cache"
                );
                None
            }
        }
    }

    fn rewrite_archive(&self, name: &str, source: &mut Buffer) -> Result<(Buffer, bool)> {
        let zip_error = |source: ZipError| ArchiveError::Zip {
            archive: name.to_string(),
            source,
        };
        let rewriting = !self.profile.is_identity();

        let mut archive = ZipArchive::new(&mut *source).map_err(zip_error)?;
        let mut writer = ZipWriter::new(Buffer::new(self.in_memory));
        let mut changed = false;

        for index in 0..archive.len() {
            let info = {
                let file = archive.by_index_raw(index).map_err(zip_error)?;
                EntryInfo {
                    name: file.name().to_string(),
                    is_dir: file.is_dir(),
                    method: file.compression(),
                    size: file.size(),
                    compressed_size: file.compressed_size(),
                    modified: file.last_modified(),
                    unix_mode: file.unix_mode(),
                }
            };

            if rewriting && is_signature_file(&info.name) {
                tracing::warn!(
                    target: "jakartify.archive",
                    archive = name,
                    entry = %info.name,
                    "dropped signature file"
                );
                changed = true;
                continue;
            }
            if info.size > ZIP64_LIMIT || info.compressed_size > ZIP64_LIMIT {
                tracing::warn!(
                    target: "jakartify.archive",
                    archive = name,
                    entry = %info.name,
                    size = info.size,
                    "entry exceeds the zip64 threshold"
                );
            }

            let renamed = self.profile.rewrite(&info.name);
            changed |= renamed.changed;
            let dest_name = renamed.into_owned();

            if info.is_dir {
                let file = archive.by_index_raw(index).map_err(zip_error)?;
                writer
                    .raw_copy_file_rename(file, dest_name)
                    .map_err(zip_error)?;
                continue;
            }

            if self.excludes.is_excluded(&info.name) {
                tracing::info!(target: "jakartify.archive", path = %info.name, "skipped excluded file");
                let file = archive.by_index_raw(index).map_err(zip_error)?;
                writer
                    .raw_copy_file_rename(file, dest_name)
                    .map_err(zip_error)?;
                continue;
            }

            if is_archive(&info.name) {
                // Nested archives go through their own spooled buffers.
                let mut nested = Buffer::new(self.in_memory);
                let nested_changed = {
                    let mut file = archive.by_index(index).map_err(zip_error)?;
                    self.migrate_archive(&info.name, &mut file, &mut nested)?
                };
                changed |= nested_changed;

                if nested_changed {
                    let len = nested.seek(SeekFrom::End(0))?;
                    nested.rewind()?;
                    writer
                        .start_file(dest_name, info.options(len))
                        .map_err(zip_error)?;
                    io::copy(&mut nested, &mut writer)?;
                } else {
                    let file = archive.by_index_raw(index).map_err(zip_error)?;
                    writer
                        .raw_copy_file_rename(file, dest_name)
                        .map_err(zip_error)?;
                }
                continue;
            }

            let mut data = Vec::new();
            archive
                .by_index(index)
                .map_err(zip_error)?
                .read_to_end(&mut data)?;
            let converted = self.registry.convert(&info.name, &data, &self.profile)?;
            changed |= converted.changed;

            if converted.is_rewritten() {
                writer
                    .start_file(dest_name, info.options(converted.bytes.len() as u64))
                    .map_err(zip_error)?;
                writer.write_all(&converted.bytes)?;
            } else {
                let file = archive.by_index_raw(index).map_err(zip_error)?;
                writer
                    .raw_copy_file_rename(file, dest_name)
                    .map_err(zip_error)?;
            }
        }

        let output = writer.finish().map_err(zip_error)?;
        Ok((output, changed))
    }
}

/// Stores the converted archive. Failures only cost the cache entry.
fn store_in_cache(name: &str, mut entry: CacheEntry<'_>, data: &mut Buffer) {
    let written = match entry.begin_store() {
        Ok(file) => io::copy(data, file).map_err(CacheError::from),
        Err(err) => Err(err),
    };
    if let Err(err) = written.and_then(|_| entry.commit_store()) {
        tracing::warn!(
            target: "jakartify.archive",
            archive = name,
            error = %err,
            "failed to store conversion in cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_extensions() {
        assert!(is_archive("lib/app.jar"));
        assert!(is_archive("APP.WAR"));
        assert!(is_archive("bundle.rar"));
        assert!(!is_archive("jar"));
        assert!(!is_archive("notes.jar.txt"));
    }

    #[test]
    fn signature_files() {
        assert!(is_signature_file("META-INF/SIGNER.SF"));
        assert!(is_signature_file("META-INF/SIGNER.RSA"));
        assert!(is_signature_file("META-INF/SIGNER.EC"));
        assert!(!is_signature_file("META-INF/MANIFEST.MF"));
        assert!(!is_signature_file("WEB-INF/META-INF/SIGNER.SF"));
    }
}
