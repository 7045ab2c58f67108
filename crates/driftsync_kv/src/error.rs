//! Error types for the KV client.

use thiserror::Error;

/// Result type for KV operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur talking to the KV cluster or the namespace
/// authority.
#[derive(Debug, Error)]
pub enum KvError {
    /// Network or transport error for a single attempt.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether another candidate is worth trying.
        retryable: bool,
    },

    /// A reply could not be parsed or had an impossible shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A single attempt exceeded its timeout.
    #[error("attempt timed out")]
    Timeout,

    /// The key does not exist (including tombstoned keys).
    #[error("key does not exist: {key}")]
    NotFound {
        /// The absent key.
        key: String,
    },

    /// A write carried a stale version. Not a failure of the protocol -
    /// this is the defined trigger for conflict resolution.
    #[error("version conflict for key {key}")]
    VersionConflict {
        /// The contested key.
        key: String,
    },

    /// Every candidate server was tried without success.
    #[error("all {attempts} candidate servers unreachable or failing")]
    Exhausted {
        /// How many candidates were tried.
        attempts: usize,
    },

    /// Redirects kept pointing elsewhere without ever resolving.
    #[error("redirect loop after {depth} hops")]
    RedirectLoop {
        /// Redirects followed before giving up.
        depth: usize,
    },

    /// The replica reported an explicit failure for a write.
    #[error("server rejected request: {0}")]
    Rejected(String),
}

impl KvError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if trying another candidate could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            KvError::Transport { retryable, .. } => *retryable,
            KvError::Timeout => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(KvError::transport_retryable("connection refused").is_retryable());
        assert!(!KvError::transport_fatal("bad certificate").is_retryable());
        assert!(KvError::Timeout.is_retryable());
        assert!(!KvError::NotFound { key: "k".into() }.is_retryable());
        assert!(!KvError::VersionConflict { key: "k".into() }.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = KvError::Exhausted { attempts: 3 };
        assert!(err.to_string().contains('3'));
    }
}
