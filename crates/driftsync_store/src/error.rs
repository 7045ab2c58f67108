//! Error types for the metadata store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored record could not be decoded.
    #[error("decode error for key {key}: {message}")]
    Decode {
        /// Key whose record failed to parse.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The log contains a frame that cannot be read.
    #[error("corrupt log frame at offset {offset}")]
    CorruptLog {
        /// Byte offset of the bad frame.
        offset: u64,
    },

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// A record of the wrong kind was found under a key.
    #[error("wrong record kind for key {key}")]
    WrongKind {
        /// The offending key.
        key: String,
    },
}
