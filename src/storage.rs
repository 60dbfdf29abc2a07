//! Versioned storage for fetched payloads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Filename used for every stored payload inside its version directory.
const CONTENT_FILENAME: &str = "content";

/// Writes payload bytes under a derived relative path.
///
/// Each write lands in its own UTC-timestamped version directory:
/// `<root>/<relative>/<timestamp>/content`. Timestamps are fixed-width so
/// the newest version is always the lexicographically last subdirectory.
#[derive(Debug, Clone)]
pub struct FileWriter {
    root: PathBuf,
}

impl FileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `bytes` under `relative`, returning the final stored path.
    pub fn write(&self, relative: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
        let version = Utc::now().format("%Y-%m-%dT%H-%M-%S%.6fZ").to_string();
        let dir = self.root.join(relative).join(version);
        fs::create_dir_all(&dir)?;

        let path = dir.join(CONTENT_FILENAME);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_returns_the_stored_path() {
        let dir = tempdir().unwrap();
        let writer = FileWriter::new(dir.path());

        let path = writer
            .write(Path::new("example/com/page"), b"payload")
            .unwrap();

        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert!(path.starts_with(dir.path().join("example/com/page")));
        assert!(path.ends_with("content"));
    }

    #[test]
    fn repeated_writes_create_distinct_versions() {
        let dir = tempdir().unwrap();
        let writer = FileWriter::new(dir.path());
        let relative = Path::new("example/com/page");

        let first = writer.write(relative, b"one").unwrap();
        let second = writer.write(relative, b"two").unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());

        // Newest version directory sorts last.
        let mut versions: Vec<_> = fs::read_dir(dir.path().join(relative))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        versions.sort();
        assert_eq!(versions.len(), 2);
        assert!(second.parent().unwrap().ends_with(versions.last().unwrap()));
    }
}
