//! Configuration for the reconciliation engine.

use driftsync_kv::CacheConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Engine tuning and identity.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the synchronized tree.
    pub root: PathBuf,
    /// Identity writes from this client are attributed to.
    pub device_id: String,
    /// Queue depth at which the batcher wakes without waiting.
    pub batch_threshold: usize,
    /// Longest the batcher waits before draining whatever is queued.
    pub batch_wait: Duration,
    /// Per-attempt network timeout for KV requests.
    pub attempt_timeout: Duration,
    /// Endpoint cache tuning.
    pub cache: CacheConfig,
    /// File extensions (without dot) the client synchronizes.
    pub watched_extensions: Vec<String>,
}

impl EngineConfig {
    /// Creates a configuration with default tuning.
    pub fn new(root: impl Into<PathBuf>, device_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            device_id: device_id.into(),
            batch_threshold: 5,
            batch_wait: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(1),
            cache: CacheConfig::default(),
            watched_extensions: vec!["txt".to_string()],
        }
    }

    /// Sets the batcher wake threshold.
    #[must_use]
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    /// Sets the batcher wait time.
    #[must_use]
    pub fn with_batch_wait(mut self, wait: Duration) -> Self {
        self.batch_wait = wait;
        self
    }

    /// Sets the per-attempt KV timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the endpoint cache tuning.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the watched extension list.
    #[must_use]
    pub fn with_watched_extensions(mut self, extensions: Vec<String>) -> Self {
        self.watched_extensions = extensions;
        self
    }

    /// Returns true if a file with this name falls under the extension
    /// policy.
    pub fn is_watched_name(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .map(|(stem, ext)| !stem.is_empty() && self.watched_extensions.iter().any(|w| w == ext))
            .unwrap_or(false)
    }
}
