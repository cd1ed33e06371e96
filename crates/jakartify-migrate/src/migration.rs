use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jakartify_archive::{ArchiveEngine, Excludes};
use jakartify_cache::ConversionCache;
use jakartify_config::MigrationConfig;
use jakartify_profile::Profile;
use walkdir::WalkDir;

use crate::report::MigrationReport;
use crate::{MigrationError, Result};

/// One migration run from `source` to `destination`.
#[derive(Debug)]
pub struct Migration {
    source: PathBuf,
    destination: PathBuf,
    engine: ArchiveEngine,
    cache: Option<Arc<ConversionCache>>,
}

impl Migration {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, profile: Profile) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            engine: ArchiveEngine::new(profile),
            cache: None,
        }
    }

    /// Builds a migration from validated configuration, opening the
    /// conversion cache if one is configured.
    pub fn from_config(
        config: &MigrationConfig,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;
        let profile = config.resolve_profile()?.clone();
        let excludes = Excludes::new(
            &config.excludes,
            config.enable_default_excludes,
            config.match_excludes_against_path_name,
        )
        .map_err(MigrationError::Excludes)?;

        let mut migration = Self::new(source, destination, profile)
            .with_excludes(excludes)
            .zip_in_memory(config.zip_in_memory);
        if let Some(dir) = &config.cache.dir {
            let cache = ConversionCache::open(dir, config.cache.retention_days)?;
            migration = migration.with_cache(Arc::new(cache));
        }
        Ok(migration)
    }

    #[must_use]
    pub fn with_excludes(mut self, excludes: Excludes) -> Self {
        self.engine = self.engine.with_excludes(excludes);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ConversionCache>) -> Self {
        self.engine = self.engine.with_cache(Arc::clone(&cache));
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn zip_in_memory(mut self, in_memory: bool) -> Self {
        self.engine = self.engine.zip_in_memory(in_memory);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn profile(&self) -> &Profile {
        self.engine.profile()
    }

    pub fn engine(&self) -> &ArchiveEngine {
        &self.engine
    }

    /// Runs the migration. The conversion cache, if any, is pruned at the
    /// end; a failing prune is logged and does not fail the run.
    pub fn execute(&self) -> Result<MigrationReport> {
        let started = Instant::now();
        let metadata =
            fs::metadata(&self.source).map_err(|source| MigrationError::SourceUnreadable {
                path: self.source.clone(),
                source,
            })?;

        tracing::info!(
            target: "jakartify.migrate",
            source = %self.source.display(),
            destination = %self.destination.display(),
            profile = %self.profile().name(),
            "starting migration"
        );

        let mut report = MigrationReport::new(
            self.source.clone(),
            self.destination.clone(),
            self.profile().name(),
        );
        if metadata.is_dir() {
            create_dir(&self.destination)?;
            self.migrate_directory(&mut report)?;
        } else {
            if let Some(parent) = self
                .destination
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
            {
                create_dir(parent)?;
            }
            self.migrate_file(&self.source, &self.destination, &mut report)?;
        }

        report.cache = self.finalize_cache().map(Into::into);
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            target: "jakartify.migrate",
            files = report.files,
            converted_files = report.converted_files,
            elapsed_ms = report.elapsed_ms,
            "migration done"
        );
        Ok(report)
    }

    fn migrate_directory(&self, report: &mut MigrationReport) -> Result<()> {
        let source = fs::canonicalize(&self.source).map_err(|source| {
            MigrationError::SourceUnreadable {
                path: self.source.clone(),
                source,
            }
        })?;
        let destination = fs::canonicalize(&self.destination).map_err(|source| MigrationError::Io {
            path: self.destination.clone(),
            source,
        })?;
        // Never descend into our own output.
        let nested = destination != source && destination.starts_with(&source);

        let mut entries = Vec::new();
        for entry in WalkDir::new(&source)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            if nested && entry.path().starts_with(&destination) {
                continue;
            }
            entries.push(entry);
        }

        for entry in entries {
            let Ok(relative) = entry.path().strip_prefix(&source) else {
                continue;
            };
            let dest = self.destination_path(&destination, relative);
            if entry.file_type().is_dir() {
                create_dir(&dest)?;
            } else if entry.file_type().is_file() {
                self.migrate_file(entry.path(), &dest, report)?;
            } else {
                tracing::debug!(
                    target: "jakartify.migrate",
                    path = %entry.path().display(),
                    "skipping special file"
                );
            }
        }
        Ok(())
    }

    /// `root` joined with `relative`, every component run through the
    /// profile.
    fn destination_path(&self, root: &Path, relative: &Path) -> PathBuf {
        let mut dest = root.to_path_buf();
        for component in relative.components() {
            let name = component.as_os_str();
            match name.to_str() {
                Some(name) => dest.push(self.profile().rewrite(name).value.as_ref()),
                None => dest.push(name),
            }
        }
        dest
    }

    fn migrate_file(&self, src: &Path, dest: &Path, report: &mut MigrationReport) -> Result<()> {
        let name = src
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let convert_error = |source| MigrationError::Convert {
            path: src.to_path_buf(),
            source,
        };

        let converted = if is_same_file(src, dest) {
            let data = fs::read(src).map_err(io_error(src))?;
            let mut out = Vec::with_capacity(data.len() + data.len() / 20);
            let converted = self
                .engine
                .migrate(&name, &mut data.as_slice(), &mut out)
                .map_err(convert_error)?;
            fs::write(dest, out).map_err(io_error(dest))?;
            converted
        } else {
            let mut reader = BufReader::new(File::open(src).map_err(io_error(src))?);
            let mut writer = BufWriter::new(File::create(dest).map_err(io_error(dest))?);
            let converted = self
                .engine
                .migrate(&name, &mut reader, &mut writer)
                .map_err(convert_error)?;
            writer.flush().map_err(io_error(dest))?;
            converted
        };

        tracing::debug!(
            target: "jakartify.migrate",
            path = %src.display(),
            converted,
            "migrated file"
        );
        report.record(converted);
        Ok(())
    }

    fn finalize_cache(&self) -> Option<jakartify_cache::PruneReport> {
        let cache = self.cache.as_deref().filter(|cache| cache.is_enabled())?;
        match cache.finalize() {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(
                    target: "jakartify.migrate",
                    error = %err,
                    "failed to finalize conversion cache"
                );
                None
            }
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MigrationError + '_ {
    move |source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| MigrationError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jakartify_profile::BuiltinProfile;

    #[test]
    fn destination_components_are_renamed() {
        let migration = Migration::new("src", "out", BuiltinProfile::Tomcat.profile().clone());
        let dest = migration.destination_path(
            Path::new("/out"),
            Path::new("javax/servlet/META-INF/services/javax.servlet.ServletContainerInitializer"),
        );
        assert_eq!(
            dest,
            Path::new("/out/javax/servlet/META-INF/services/jakarta.servlet.ServletContainerInitializer")
        );
    }

    #[test]
    fn same_path_is_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        assert!(is_same_file(&file, &file));
        assert!(is_same_file(&file, &dir.path().join(".").join("a.txt")));
        assert!(!is_same_file(&file, &dir.path().join("b.txt")));
    }
}
