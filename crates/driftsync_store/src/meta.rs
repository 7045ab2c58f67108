//! Typed metadata layer over a storage backend.

use crate::backend::StoreBackend;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryBackend;
use crate::record::{DirectoryRecord, FileRecord};
use driftsync_proto::{is_directory_key, parent_key};
use std::collections::BTreeSet;

/// The local metadata store: a durable map from path keys to records.
///
/// Not internally synchronized - callers serialize access through one
/// external lock.
pub struct MetaStore {
    backend: Box<dyn StoreBackend>,
}

impl MetaStore {
    /// Creates a store over an arbitrary backend.
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Creates an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryBackend::new()))
    }

    /// Loads a file record, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongKind`] when called with a directory key.
    pub fn load_file(&self, key: &str) -> StoreResult<Option<FileRecord>> {
        if is_directory_key(key) {
            return Err(StoreError::WrongKind {
                key: key.to_string(),
            });
        }
        match self.backend.get(key)? {
            Some(bytes) => Ok(Some(FileRecord::from_bytes(key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Stores a file record under its own key.
    pub fn store_file(&mut self, record: &FileRecord) -> StoreResult<()> {
        self.backend.put(&record.key, &record.to_bytes()?)
    }

    /// Loads a directory record, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongKind`] when called with a file key.
    pub fn load_dir(&self, key: &str) -> StoreResult<Option<DirectoryRecord>> {
        if !is_directory_key(key) {
            return Err(StoreError::WrongKind {
                key: key.to_string(),
            });
        }
        match self.backend.get(key)? {
            Some(bytes) => Ok(Some(DirectoryRecord::from_bytes(key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Stores a directory record under its own key.
    pub fn store_dir(&mut self, record: &DirectoryRecord) -> StoreResult<()> {
        self.backend.put(&record.key, &record.to_bytes()?)
    }

    /// Removes a file record. Absent keys are a no-op.
    pub fn remove_file(&mut self, key: &str) -> StoreResult<()> {
        self.backend.delete(key)
    }

    /// Removes a directory record together with every record reachable
    /// through its stored child lists, depth first.
    ///
    /// Returns `false` if no record exists under `key`. Children are
    /// discovered through the lists the record carries, not through a
    /// storage-level range scan, so records orphaned by an earlier crash
    /// are left behind for the bulk-sync scan to reconcile.
    pub fn remove_dir_recursive(&mut self, key: &str) -> StoreResult<bool> {
        let Some(record) = self.load_dir(key)? else {
            return Ok(false);
        };
        for file_key in &record.files {
            self.backend.delete(file_key)?;
        }
        for dir_key in record.directories.clone() {
            self.remove_dir_recursive(&dir_key)?;
        }
        self.backend.delete(key)?;
        Ok(true)
    }

    /// Returns the stored keys exactly one path segment below `prefix`.
    ///
    /// A key qualifies when the remainder after the prefix is non-empty and
    /// contains no further separator; a trailing directory separator does
    /// not count as "further", so both file and directory children appear.
    pub fn prefix_scan(&self, prefix: &str) -> StoreResult<BTreeSet<String>> {
        let mut children = BTreeSet::new();
        for key in self.backend.keys_with_prefix(prefix)? {
            if key == prefix {
                continue;
            }
            let remainder = &key[prefix.len()..];
            let segment = remainder.strip_suffix('/').unwrap_or(remainder);
            if !segment.is_empty() && !segment.contains('/') {
                children.insert(key);
            }
        }
        Ok(children)
    }

    /// Adds `child_key` to its parent's child list, creating the parent
    /// record if absent. Top-level keys have no parent and are a no-op.
    pub fn register_child(&mut self, child_key: &str) -> StoreResult<()> {
        let Some(parent) = parent_key(child_key) else {
            return Ok(());
        };
        let mut record = self
            .load_dir(&parent)?
            .unwrap_or_else(|| DirectoryRecord::new(parent.clone()));
        if is_directory_key(child_key) {
            record.directories.insert(child_key.to_string());
        } else {
            record.files.insert(child_key.to_string());
        }
        self.store_dir(&record)
    }

    /// Removes `child_key` from its parent's child list, if the parent
    /// record exists.
    pub fn unregister_child(&mut self, child_key: &str) -> StoreResult<()> {
        let Some(parent) = parent_key(child_key) else {
            return Ok(());
        };
        let Some(mut record) = self.load_dir(&parent)? else {
            return Ok(());
        };
        if is_directory_key(child_key) {
            record.directories.remove(child_key);
        } else {
            record.files.remove(child_key);
        }
        self.store_dir(&record)
    }

    /// Returns every stored key, in order.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.backend.keys_with_prefix("")
    }

    /// Flushes the backend.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.backend.flush()
    }

    /// Syncs the backend to durable storage.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.backend.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_tree() -> MetaStore {
        let mut store = MetaStore::in_memory();
        for dir in ["docs/", "docs/sub/"] {
            store.store_dir(&DirectoryRecord::new(dir)).unwrap();
            store.register_child(dir).unwrap();
        }
        for file in ["docs/a.txt", "docs/b.txt", "docs/sub/c.txt", "top.txt"] {
            store.store_file(&FileRecord::new(file)).unwrap();
            store.register_child(file).unwrap();
        }
        store
    }

    #[test]
    fn prefix_scan_returns_immediate_children_only() {
        let store = store_with_tree();
        let children = store.prefix_scan("docs/").unwrap();
        let expected: BTreeSet<String> = ["docs/a.txt", "docs/b.txt", "docs/sub/"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(children, expected);
    }

    #[test]
    fn child_lists_match_prefix_scan() {
        let store = store_with_tree();
        let dir = store.load_dir("docs/").unwrap().unwrap();

        let mut listed: BTreeSet<String> = dir.files.clone();
        listed.extend(dir.directories.clone());
        assert_eq!(listed, store.prefix_scan("docs/").unwrap());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let store = store_with_tree();
        assert!(matches!(
            store.load_file("docs/"),
            Err(StoreError::WrongKind { .. })
        ));
        assert!(matches!(
            store.load_dir("docs/a.txt"),
            Err(StoreError::WrongKind { .. })
        ));
    }

    #[test]
    fn recursive_removal_walks_child_lists() {
        let mut store = store_with_tree();
        assert!(store.remove_dir_recursive("docs/").unwrap());

        assert!(store.load_dir("docs/").unwrap().is_none());
        assert!(store.load_dir("docs/sub/").unwrap().is_none());
        assert!(store.load_file("docs/a.txt").unwrap().is_none());
        assert!(store.load_file("docs/sub/c.txt").unwrap().is_none());
        // Siblings outside the subtree survive.
        assert!(store.load_file("top.txt").unwrap().is_some());
    }

    #[test]
    fn recursive_removal_skips_unlisted_strays() {
        let mut store = store_with_tree();
        // A record below docs/ that no child list mentions.
        store.store_file(&FileRecord::new("docs/stray.txt")).unwrap();

        assert!(store.remove_dir_recursive("docs/").unwrap());
        assert!(store.load_file("docs/stray.txt").unwrap().is_some());
    }

    #[test]
    fn removing_absent_directory_reports_false() {
        let mut store = MetaStore::in_memory();
        assert!(!store.remove_dir_recursive("nope/").unwrap());
    }

    #[test]
    fn unregister_updates_parent() {
        let mut store = store_with_tree();
        store.unregister_child("docs/a.txt").unwrap();
        let dir = store.load_dir("docs/").unwrap().unwrap();
        assert!(!dir.files.contains("docs/a.txt"));
        assert!(dir.files.contains("docs/b.txt"));
    }

    #[test]
    fn register_creates_missing_parent() {
        let mut store = MetaStore::in_memory();
        store.register_child("fresh/new.txt").unwrap();
        let dir = store.load_dir("fresh/").unwrap().unwrap();
        assert!(dir.files.contains("fresh/new.txt"));
    }
}
