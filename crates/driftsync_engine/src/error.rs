//! Error types for the reconciliation engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconciling.
///
/// None of these are fatal to the process: the consumer loops log the
/// failure, skip the event, and keep going.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Metadata store error.
    #[error("store error: {0}")]
    Store(#[from] driftsync_store::StoreError),

    /// KV cluster or namespace-authority error.
    #[error("kv error: {0}")]
    Kv(#[from] driftsync_kv::KvError),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A workflow needed a record that does not exist.
    #[error("no metadata record for {key}")]
    MissingMetadata {
        /// The absent key.
        key: String,
    },

    /// The authority returned no endpoints for a file.
    #[error("no storage endpoints for {key}")]
    NoEndpoints {
        /// The unservable key.
        key: String,
    },

    /// Stored or fetched state contradicts itself. Logged and aborted,
    /// never repaired automatically.
    #[error("integrity error for {key}: {message}")]
    Integrity {
        /// The affected key.
        key: String,
        /// What did not line up.
        message: String,
    },

    /// The token source could not produce a bearer token.
    #[error("no bearer token available: {0}")]
    Token(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::MissingMetadata {
            key: "docs/a.txt".into(),
        };
        assert!(err.to_string().contains("docs/a.txt"));

        let err = EngineError::NoEndpoints { key: "k".into() };
        assert!(err.to_string().contains("k"));
    }
}
