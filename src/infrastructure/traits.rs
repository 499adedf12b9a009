//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with alternative implementations.

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::Indicator;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write through a temporary file in the target directory, then rename.
    /// Readers never observe a partially written file.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;

    /// Files directly inside `dir` with extension `ext`, sorted by path.
    fn list_files(&self, dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>>;
}

/// Persistence hand-off for indicator systems.
///
/// Implementations only store what they are given; callers check
/// invariants before saving.
pub trait TreeStore: Send + Sync {
    fn save(&self, system_id: &str, tree: &[Indicator]) -> io::Result<()>;

    /// Fails with `ErrorKind::NotFound` for unknown systems.
    fn load(&self, system_id: &str) -> io::Result<Vec<Indicator>>;

    /// Ids of all stored systems, sorted.
    fn list(&self) -> io::Result<Vec<String>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn list_files(&self, dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let matches = entry
                .path()
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            if entry.file_type().is_file() && matches {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}
