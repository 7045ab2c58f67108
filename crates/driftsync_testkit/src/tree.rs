//! Temporary synchronized roots.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory playing the synchronized root, with helpers that
/// take store keys instead of paths.
pub struct TempTree {
    dir: TempDir,
}

impl TempTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp tree"),
        }
    }

    /// The root path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path behind a store key.
    pub fn resolve(&self, key: &str) -> PathBuf {
        self.dir.path().join(key.trim_end_matches('/'))
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, key: &str, content: &str) {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parents");
        }
        fs::write(path, content).expect("failed to write file");
    }

    /// Creates a directory.
    pub fn mkdir(&self, key: &str) {
        fs::create_dir_all(self.resolve(key)).expect("failed to create directory");
    }

    /// Removes a file or directory tree.
    pub fn remove(&self, key: &str) {
        let path = self.resolve(key);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("failed to remove directory");
        } else if path.exists() {
            fs::remove_file(path).expect("failed to remove file");
        }
    }

    /// Reads a file as text.
    pub fn read(&self, key: &str) -> String {
        fs::read_to_string(self.resolve(key)).expect("failed to read file")
    }

    /// True if the entry exists.
    pub fn exists(&self, key: &str) -> bool {
        self.resolve(key).exists()
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let tree = TempTree::new();
        tree.write("docs/a.txt", "hello");
        assert!(tree.exists("docs/"));
        assert_eq!(tree.read("docs/a.txt"), "hello");

        tree.remove("docs/");
        assert!(!tree.exists("docs/"));
    }
}
