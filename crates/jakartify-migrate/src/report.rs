use std::fmt;
use std::path::PathBuf;

use jakartify_cache::PruneReport;
use serde::Serialize;

/// Outcome of [`Migration::execute`](crate::Migration::execute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub profile: String,
    /// Whether any file was converted.
    pub converted: bool,
    /// Files written to the destination.
    pub files: usize,
    pub converted_files: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSummary>,
}

impl MigrationReport {
    pub(crate) fn new(source: PathBuf, destination: PathBuf, profile: &str) -> Self {
        Self {
            source,
            destination,
            profile: profile.to_owned(),
            converted: false,
            files: 0,
            converted_files: 0,
            elapsed_ms: 0,
            cache: None,
        }
    }

    pub(crate) fn record(&mut self, converted: bool) {
        self.files += 1;
        if converted {
            self.converted_files += 1;
            self.converted = true;
        }
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "converted: {}", self.converted)?;
        writeln!(f, "  profile: {}", self.profile)?;
        writeln!(f, "  files: {}", self.files)?;
        writeln!(f, "  converted_files: {}", self.converted_files)?;
        write!(f, "  elapsed_ms: {}", self.elapsed_ms)?;
        if let Some(cache) = &self.cache {
            write!(
                f,
                "\n  cache: pruned {} ({} bytes), retained {}",
                cache.pruned, cache.freed_bytes, cache.retained
            )?;
        }
        Ok(())
    }
}

/// Conversion cache state after the end-of-run prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub pruned: usize,
    pub freed_bytes: u64,
    pub retained: usize,
}

impl From<PruneReport> for CacheSummary {
    fn from(report: PruneReport) -> Self {
        Self {
            pruned: report.removed,
            freed_bytes: report.freed_bytes,
            retained: report.retained,
        }
    }
}
