//! Change notifications pushed by the remote store.

use serde::{Deserialize, Serialize};

/// Kind of remote change, using the compact wire tags the notification
/// service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEventKind {
    /// Directory created.
    #[serde(rename = "DIR+")]
    DirCreated,
    /// Directory deleted.
    #[serde(rename = "DIR-")]
    DirDeleted,
    /// File created.
    #[serde(rename = "FILE+")]
    FileCreated,
    /// File modified.
    #[serde(rename = "FILE~")]
    FileModified,
    /// File deleted.
    #[serde(rename = "FILE-")]
    FileDeleted,
}

/// A change notification from another device, relayed by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Device that authored the change. Events from the local device are
    /// ignored by the consumer.
    pub device_id: String,
    /// What changed.
    #[serde(rename = "type")]
    pub kind: RemoteEventKind,
    /// Store key of the changed entry.
    pub path: String,
    /// Declared content hash, present on file create/modify events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl RemoteEvent {
    /// Creates a notification without a content hash.
    pub fn new(device_id: impl Into<String>, kind: RemoteEventKind, path: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            path: path.into(),
            content_hash: None,
        }
    }

    /// Attaches the declared content hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}
