//! Resource access
//!
//! Changelogs name other files by path strings (`include(file: ...)`,
//! `includeAll(path: ...)`, `property(file: ...)`). A [`ResourceAccessor`]
//! resolves those strings, so tests and embedders can serve documents from
//! somewhere other than the working directory.

use std::io;
use std::path::{Path, PathBuf};

pub trait ResourceAccessor {
    fn read_to_string(&self, path: &str) -> io::Result<String>;

    /// Regular files directly inside `dir` (non-recursive), as `dir/name`
    /// strings in no particular order.
    fn list_files(&self, dir: &str) -> io::Result<Vec<String>>;

    fn exists(&self, path: &str) -> bool;
}

/// Resolves resource paths against a base directory on the local disk.
#[derive(Debug, Clone)]
pub struct FileSystemAccessor {
    base_dir: PathBuf,
}

impl FileSystemAccessor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> PathBuf {
        // Absolute paths replace the base on join.
        self.base_dir.join(path)
    }
}

impl Default for FileSystemAccessor {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceAccessor for FileSystemAccessor {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path))
    }

    fn list_files(&self, dir: &str) -> io::Result<Vec<String>> {
        let prefix = dir.trim_end_matches(['/', '\\']);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(self.resolve(dir))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if prefix.is_empty() {
                files.push(name);
            } else {
                files.push(format!("{}/{}", prefix, name));
            }
        }
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }
}
