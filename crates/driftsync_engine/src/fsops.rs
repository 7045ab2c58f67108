//! Filesystem helpers shared by the workflows.
//!
//! Store keys are paths relative to the synchronized root, always
//! `/`-separated; directory keys carry a trailing `/`.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// SHA-256 hex digest of file content.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Resolves a store key to its absolute path under `root`.
pub fn key_to_path(root: &Path, key: &str) -> PathBuf {
    root.join(key.trim_end_matches('/'))
}

/// Derives the store key for an absolute path under `root`, or `None` if
/// the path lies outside the root.
pub fn path_to_key(root: &Path, path: &Path, is_dir: bool) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    if key.is_empty() {
        return None;
    }
    if is_dir {
        key.push('/');
    }
    Some(key)
}

/// Reads a synchronized file as text.
pub fn read_text(root: &Path, key: &str) -> io::Result<String> {
    fs::read_to_string(key_to_path(root, key))
}

/// Writes a synchronized file, creating parent directories as needed.
pub fn write_text(root: &Path, key: &str, content: &str) -> io::Result<()> {
    let path = key_to_path(root, key);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Makes sure the directory behind a directory key exists.
pub fn ensure_dir(root: &Path, key: &str) -> io::Result<()> {
    fs::create_dir_all(key_to_path(root, key))
}

/// Removes the filesystem entry behind a key, recursively for
/// directories. An already-absent entry is not an error.
pub fn remove_entry(root: &Path, key: &str) -> io::Result<()> {
    let path = key_to_path(root, key);
    let result = if key.ends_with('/') {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
