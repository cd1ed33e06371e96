use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::Result;
use crate::hash::ContentHash;
use crate::util::atomic_write;

pub const METADATA_FILE: &str = "cache-metadata.txt";

pub(crate) const OBJECT_EXTENSION: &str = "jar";

const HEADER: &str = "# conversion cache metadata: hash|last_access_date";

/// The current UTC date.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Last-access date of every cached object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetadata {
    entries: BTreeMap<ContentHash, Date>,
}

impl CacheMetadata {
    /// Parses `hash|YYYY-MM-DD` lines. Malformed lines are logged and
    /// skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((hash, date)) => {
                    entries.insert(hash, date);
                }
                None => {
                    tracing::warn!(target: "jakartify.cache", line, "ignoring invalid cache metadata line");
                }
            }
        }
        Self { entries }
    }

    /// Loads the metadata file under `root`.
    ///
    /// Objects on disk that the file does not mention are recorded as
    /// accessed on `today`. A missing or unreadable file leaves every object
    /// on disk recorded as accessed on `today`.
    pub fn load(root: &Path, today: Date) -> Result<Self> {
        let path = root.join(METADATA_FILE);
        let mut metadata = match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(target: "jakartify.cache", "no cache metadata; scanning cache directory");
                Self::default()
            }
            Err(err) => {
                tracing::warn!(
                    target: "jakartify.cache",
                    path = %path.display(),
                    error = %err,
                    "unreadable cache metadata; scanning cache directory"
                );
                Self::default()
            }
        };

        for (hash, _) in scan_objects(root)? {
            metadata.entries.entry(hash).or_insert(today);
        }
        tracing::debug!(target: "jakartify.cache", entries = metadata.len(), "loaded cache metadata");
        Ok(metadata)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        atomic_write(&root.join(METADATA_FILE), self.to_text().as_bytes())?;
        tracing::debug!(target: "jakartify.cache", entries = self.len(), "saved cache metadata");
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(HEADER.len() + 1 + self.entries.len() * 76);
        out.push_str(HEADER);
        out.push('\n');
        for (hash, date) in &self.entries {
            out.push_str(hash.as_str());
            out.push('|');
            out.push_str(&format_date(*date));
            out.push('\n');
        }
        out
    }

    /// Records an access on `date`. An existing later date is kept.
    pub fn touch(&mut self, hash: &ContentHash, date: Date) {
        let slot = self.entries.entry(hash.clone()).or_insert(date);
        if *slot < date {
            *slot = date;
        }
    }

    /// Sets the last access date of `hash`, replacing any existing value.
    pub fn set(&mut self, hash: ContentHash, date: Date) {
        self.entries.insert(hash, date);
    }

    pub fn last_access(&self, hash: &ContentHash) -> Option<Date> {
        self.entries.get(hash).copied()
    }

    pub fn remove(&mut self, hash: &ContentHash) -> Option<Date> {
        self.entries.remove(hash)
    }

    /// Folds `other` in, keeping the later date per hash.
    pub fn merge(&mut self, other: CacheMetadata) {
        for (hash, date) in other.entries {
            self.touch(&hash, date);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, Date)> {
        self.entries.iter().map(|(hash, date)| (hash, *date))
    }
}

fn parse_line(line: &str) -> Option<(ContentHash, Date)> {
    let (hash, date) = line.split_once('|')?;
    let hash = ContentHash::parse(hash.trim())?;
    let date = Date::parse(date.trim(), format_description!("[year]-[month]-[day]")).ok()?;
    Some((hash, date))
}

fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Every `xx/<hash>.jar` object under `root`.
pub(crate) fn scan_objects(root: &Path) -> Result<Vec<(ContentHash, PathBuf)>> {
    let mut found = Vec::new();
    let shards = match fs::read_dir(root) {
        Ok(shards) => shards,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(found),
        Err(err) => return Err(err.into()),
    };
    for shard in shards {
        let shard = shard?;
        if !shard.file_type()?.is_dir() {
            continue;
        }
        let shard_name = shard.file_name();
        let Some(shard_name) = shard_name.to_str().filter(|name| name.len() == 2) else {
            continue;
        };
        for object in fs::read_dir(shard.path())? {
            let object = object?;
            if !object.file_type()?.is_file() {
                continue;
            }
            let path = object.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(OBJECT_EXTENSION) {
                continue;
            }
            let hash = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(ContentHash::parse)
                .filter(|hash| hash.shard() == shard_name);
            if let Some(hash) = hash {
                found.push((hash, path));
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::macros::date;

    fn hash(seed: &str) -> ContentHash {
        ContentHash::compute("test", seed.as_bytes())
    }

    #[test]
    fn text_round_trips() {
        let mut metadata = CacheMetadata::default();
        metadata.set(hash("a"), date!(2024 - 01 - 05));
        metadata.set(hash("b"), date!(2023 - 12 - 31));
        let text = metadata.to_text();
        assert!(text.starts_with('#'));
        assert!(text.contains(&format!("{}|2024-01-05\n", hash("a"))));
        assert_eq!(CacheMetadata::parse(&text), metadata);
    }

    #[test]
    fn invalid_lines_are_skipped() {
        let text = format!(
            "\n# comment\nnot-a-line\n{}|yesterday\n{}|2024-02-30\n../escape|2024-01-01\n{}|2024-03-01\n",
            hash("a"),
            hash("b"),
            hash("c")
        );
        let metadata = CacheMetadata::parse(&text);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.last_access(&hash("c")), Some(date!(2024 - 03 - 01)));
    }

    #[test]
    fn touch_keeps_the_later_date() {
        let mut metadata = CacheMetadata::default();
        metadata.touch(&hash("a"), date!(2024 - 05 - 01));
        metadata.touch(&hash("a"), date!(2024 - 04 - 01));
        assert_eq!(metadata.last_access(&hash("a")), Some(date!(2024 - 05 - 01)));

        let mut other = CacheMetadata::default();
        other.set(hash("a"), date!(2024 - 06 - 01));
        other.set(hash("b"), date!(2024 - 01 - 01));
        metadata.merge(other);
        assert_eq!(metadata.last_access(&hash("a")), Some(date!(2024 - 06 - 01)));
        assert_eq!(metadata.last_access(&hash("b")), Some(date!(2024 - 01 - 01)));
    }

    #[test]
    fn scan_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = hash("good");
        let shard = dir.path().join(good.shard());
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join(format!("{good}.jar")), b"x").unwrap();
        fs::write(shard.join("notes.txt"), b"x").unwrap();
        fs::write(shard.join(format!("{}.jar", hash("elsewhere"))), b"x").unwrap();
        fs::create_dir_all(dir.path().join("long-name")).unwrap();

        let found: Vec<_> = scan_objects(dir.path())
            .unwrap()
            .into_iter()
            .map(|(hash, _)| hash)
            .collect();
        // "elsewhere" only counts if it happens to share the shard.
        assert!(found.contains(&good));
        assert!(found.iter().all(|h| h.shard() == good.shard()));
    }
}
