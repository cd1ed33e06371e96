use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const TMP_MARKER: &str = ".tmp.";

/// Creates `<dir>/<stem>.tmp.<pid>.<n>` exclusively.
pub(crate) fn open_unique_tmp_file(dir: &Path, stem: &str) -> io::Result<(PathBuf, fs::File)> {
    let pid = std::process::id();
    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = dir.join(format!("{stem}{TMP_MARKER}{pid}.{counter}"));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn is_tmp_file_name(name: &str) -> bool {
    name.contains(TMP_MARKER)
}

pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::debug!(
                target: "jakartify.cache",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove cache file"
            );
            false
        }
    }
}

/// Writes `bytes` to a temporary file next to `path`, then renames it over
/// `path`.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write as _;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file");
    let (tmp_path, mut file) = open_unique_tmp_file(dir, stem)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = written.and_then(|()| rename_replacing(&tmp_path, path)) {
        remove_file_best_effort(&tmp_path, "atomic_write.failed");
        return Err(err);
    }
    Ok(())
}

/// `fs::rename`, replacing an existing destination on every platform.
pub(crate) fn rename_replacing(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if cfg!(windows) && to.exists() => {
            match fs::remove_file(to) {
                Ok(()) => {}
                Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                Err(_) => return Err(err),
            }
            fs::rename(from, to)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_files_are_unique_and_recognisable() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = open_unique_tmp_file(dir.path(), "abc").unwrap();
        let (b, _) = open_unique_tmp_file(dir.path(), "abc").unwrap();
        assert_ne!(a, b);
        for path in [&a, &b] {
            assert!(is_tmp_file_name(path.file_name().unwrap().to_str().unwrap()));
        }
        assert!(!is_tmp_file_name("cache-metadata.txt"));
    }

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.txt");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
