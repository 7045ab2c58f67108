//! Record types stored under path keys.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata and cached content for one synchronized file.
///
/// `content_hash` and `content` describe the same bytes and are only ever
/// updated together through [`FileRecord::set_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Store key (no trailing separator).
    pub key: String,
    /// Content size in bytes.
    pub size: u64,
    /// Monotonic decimal version string. `"0"` until the first successful
    /// remote write; afterwards always the value the remote store reported.
    pub version: String,
    /// SHA-256 hex digest of `content`.
    pub content_hash: String,
    /// Last content this client uploaded or downloaded. Serves as the
    /// common ancestor for three-way merges.
    pub content: String,
}

impl FileRecord {
    /// Creates an empty record at version `"0"`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            version: "0".to_string(),
            content_hash: String::new(),
            content: String::new(),
        }
    }

    /// Replaces the cached content, its hash, and the size in one step.
    pub fn set_content(&mut self, content: impl Into<String>, content_hash: impl Into<String>) {
        let content = content.into();
        self.size = content.len() as u64;
        self.content = content;
        self.content_hash = content_hash.into();
    }

    /// Adopts the version the remote store reported after a write.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Parses the decimal version, treating garbage as 0.
    pub fn version_number(&self) -> u64 {
        self.version.parse().unwrap_or(0)
    }

    /// Encodes the record to CBOR bytes.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a record from CBOR bytes.
    pub fn from_bytes(key: &str, bytes: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

/// The child lists of one synchronized directory.
///
/// The two sets exactly mirror the set of stored keys one path segment
/// below `key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Store key, always ending with the separator.
    pub key: String,
    /// Immediate child file keys.
    pub files: BTreeSet<String>,
    /// Immediate child directory keys.
    pub directories: BTreeSet<String>,
}

impl DirectoryRecord {
    /// Creates an empty directory record.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            files: BTreeSet::new(),
            directories: BTreeSet::new(),
        }
    }

    /// Returns true if the directory lists no children.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    /// Encodes the record to CBOR bytes.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a record from CBOR bytes.
    pub fn from_bytes(key: &str, bytes: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
