//! In-process namespace authority.

use driftsync_kv::{DirectoryListing, KvResult, NamespaceAuthority};
use parking_lot::Mutex;
use std::collections::BTreeSet;

#[derive(Default)]
struct AuthorityState {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
    default_endpoints: Vec<String>,
    created_files: Vec<String>,
    deleted: Vec<String>,
}

/// A namespace authority backed by two in-memory key sets.
///
/// Create/delete calls mutate the namespace so directory listings stay
/// consistent over a test run, and are logged for assertions.
#[derive(Default)]
pub struct MemoryAuthority {
    state: Mutex<AuthorityState>,
}

impl MemoryAuthority {
    /// Creates an empty authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint list handed out for every file.
    pub fn set_default_endpoints(&self, endpoints: Vec<String>) {
        self.state.lock().default_endpoints = endpoints;
    }

    /// Seeds a file into the namespace without logging a create.
    pub fn seed_file(&self, path: &str) {
        self.state.lock().files.insert(path.to_string());
    }

    /// Seeds a directory into the namespace without logging a create.
    pub fn seed_dir(&self, path: &str) {
        self.state.lock().dirs.insert(path.to_string());
    }

    /// Returns true if the namespace knows the file.
    pub fn has_file(&self, path: &str) -> bool {
        self.state.lock().files.contains(path)
    }

    /// Returns true if the namespace knows the directory.
    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().dirs.contains(path)
    }

    /// Every path passed to `create_file`, in call order.
    pub fn created_files(&self) -> Vec<String> {
        self.state.lock().created_files.clone()
    }

    /// Every path passed to `delete`, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }
}

/// True if `key` sits exactly one segment below `dir` (`""` is the root).
fn is_immediate_child(dir: &str, key: &str) -> bool {
    let Some(remainder) = key.strip_prefix(dir) else {
        return false;
    };
    let segment = remainder.strip_suffix('/').unwrap_or(remainder);
    !segment.is_empty() && !segment.contains('/')
}

impl NamespaceAuthority for MemoryAuthority {
    fn create_file(&self, path: &str, _token: &str) -> KvResult<()> {
        let mut state = self.state.lock();
        state.files.insert(path.to_string());
        state.created_files.push(path.to_string());
        Ok(())
    }

    fn create_directory(&self, path: &str, _token: &str) -> KvResult<()> {
        self.state.lock().dirs.insert(path.to_string());
        Ok(())
    }

    fn file_endpoints(&self, _path: &str, _token: &str) -> KvResult<Vec<String>> {
        Ok(self.state.lock().default_endpoints.clone())
    }

    fn delete(&self, path: &str, _token: &str) -> KvResult<()> {
        let mut state = self.state.lock();
        state.files.remove(path);
        state.dirs.remove(path);
        state.deleted.push(path.to_string());
        Ok(())
    }

    fn list_directory(&self, path: &str, _token: &str) -> KvResult<DirectoryListing> {
        let state = self.state.lock();
        Ok(DirectoryListing {
            files: state
                .files
                .iter()
                .filter(|f| is_immediate_child(path, f))
                .cloned()
                .collect(),
            subdirectories: state
                .dirs
                .iter()
                .filter(|d| is_immediate_child(path, d))
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listings_track_creates_and_deletes() {
        let authority = MemoryAuthority::new();
        authority.create_file("a.txt", "t").unwrap();
        authority.create_directory("docs/", "t").unwrap();
        authority.create_file("docs/b.txt", "t").unwrap();

        let root = authority.list_directory("", "t").unwrap();
        assert_eq!(root.files, vec!["a.txt"]);
        assert_eq!(root.subdirectories, vec!["docs/"]);

        let docs = authority.list_directory("docs/", "t").unwrap();
        assert_eq!(docs.files, vec!["docs/b.txt"]);

        authority.delete("docs/b.txt", "t").unwrap();
        assert!(authority.list_directory("docs/", "t").unwrap().files.is_empty());
        assert_eq!(authority.deleted(), vec!["docs/b.txt"]);
    }

    #[test]
    fn immediate_child_rules() {
        assert!(is_immediate_child("", "a.txt"));
        assert!(is_immediate_child("", "docs/"));
        assert!(!is_immediate_child("", "docs/b.txt"));
        assert!(is_immediate_child("docs/", "docs/b.txt"));
        assert!(is_immediate_child("docs/", "docs/sub/"));
        assert!(!is_immediate_child("docs/", "docs/sub/c.txt"));
    }
}
