//! Client configuration file.

use driftsync_engine::EngineConfig;
use driftsync_kv::CacheConfig;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk client configuration, JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Root of the synchronized tree.
    pub root: PathBuf,
    /// Directory for the metadata store.
    pub store_dir: PathBuf,
    /// Base URL of the namespace authority's load balancer.
    pub authority_url: String,
    /// Bearer token issued by the login flow.
    pub token: String,
    /// Stable device identity; generated and meant to be written back by
    /// the operator when absent.
    #[serde(default)]
    pub device_id: Option<String>,
    /// File extensions to synchronize (default: txt).
    #[serde(default)]
    pub watched_extensions: Option<Vec<String>>,
    /// Batcher wake threshold.
    #[serde(default)]
    pub batch_threshold: Option<usize>,
    /// Batcher wait in milliseconds.
    #[serde(default)]
    pub batch_wait_ms: Option<u64>,
    /// Per-attempt KV timeout in milliseconds.
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,
    /// Endpoint cache byte budget.
    #[serde(default)]
    pub cache_max_bytes: Option<usize>,
    /// Endpoint cache TTL in seconds.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl ClientConfig {
    /// Loads and parses the config file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Builds the engine configuration for the given device identity.
    pub fn engine_config(&self, device_id: &str) -> EngineConfig {
        let mut cache = CacheConfig::default();
        if let Some(bytes) = self.cache_max_bytes {
            cache.max_bytes = bytes;
        }
        if let Some(secs) = self.cache_ttl_secs {
            cache.default_ttl = Duration::from_secs(secs);
        }

        let mut config = EngineConfig::new(self.root.clone(), device_id).with_cache(cache);
        if let Some(threshold) = self.batch_threshold {
            config = config.with_batch_threshold(threshold);
        }
        if let Some(ms) = self.batch_wait_ms {
            config = config.with_batch_wait(Duration::from_millis(ms));
        }
        if let Some(ms) = self.attempt_timeout_ms {
            config = config.with_attempt_timeout(Duration::from_millis(ms));
        }
        if let Some(extensions) = &self.watched_extensions {
            config = config.with_watched_extensions(extensions.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses() {
        let raw = r#"{
            "root": "/data/tree",
            "store_dir": "/data/state",
            "authority_url": "http://meta.example.com:9000",
            "token": "secret"
        }"#;
        let config: ClientConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.root, PathBuf::from("/data/tree"));
        assert!(config.device_id.is_none());

        let engine = config.engine_config("dev-1");
        assert_eq!(engine.batch_threshold, 5);
        assert_eq!(engine.watched_extensions, vec!["txt"]);
    }

    #[test]
    fn tuning_overrides_apply() {
        let raw = r#"{
            "root": "/r",
            "store_dir": "/s",
            "authority_url": "http://a",
            "token": "t",
            "batch_threshold": 12,
            "batch_wait_ms": 40,
            "cache_max_bytes": 2048,
            "watched_extensions": ["txt", "md"]
        }"#;
        let config: ClientConfig = serde_json::from_str(raw).unwrap();
        let engine = config.engine_config("dev-1");
        assert_eq!(engine.batch_threshold, 12);
        assert_eq!(engine.batch_wait, Duration::from_millis(40));
        assert_eq!(engine.cache.max_bytes, 2048);
        assert!(engine.is_watched_name("readme.md"));
    }
}
