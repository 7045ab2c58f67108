//! In-memory storage backend for testing and ephemeral runs.

use crate::backend::StoreBackend;
use crate::error::StoreResult;
use std::collections::BTreeMap;

/// An in-memory backend over a sorted map.
///
/// Prefix queries fall directly out of the map's ordering. Data is lost
/// when the backend is dropped.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    map: BTreeMap<String, Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for InMemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.map.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut backend = InMemoryBackend::new();
        backend.put("a", b"1").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"1".to_vec()));

        backend.put("a", b"2").unwrap();
        assert_eq!(backend.get("a").unwrap(), Some(b"2".to_vec()));

        backend.delete("a").unwrap();
        assert_eq!(backend.get("a").unwrap(), None);
        // Deleting again is fine.
        backend.delete("a").unwrap();
    }

    #[test]
    fn prefix_query_is_sorted_and_bounded() {
        let mut backend = InMemoryBackend::new();
        for key in ["docs/", "docs/a.txt", "docs/b.txt", "docz", "doc"] {
            backend.put(key, b"x").unwrap();
        }

        let keys = backend.keys_with_prefix("docs/").unwrap();
        assert_eq!(keys, vec!["docs/", "docs/a.txt", "docs/b.txt"]);
    }

    #[test]
    fn len_tracks_inserts() {
        let mut backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        backend.put("k", b"v").unwrap();
        assert_eq!(backend.len(), 1);
    }
}
