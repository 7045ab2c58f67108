//! Bounded LRU+TTL cache of file-key to endpoint-list mappings.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Cache tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when an insert does not specify one.
    pub default_ttl: Duration,
    /// Total byte budget across all stored keys and endpoint strings.
    pub max_bytes: usize,
    /// How often the background sweeper purges expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(15 * 60),
            max_bytes: 64 * 1024,
            sweep_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    endpoints: Vec<String>,
    expires_at: Instant,
    last_used: Instant,
    bytes: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_bytes: usize,
    stopping: bool,
}

struct CacheInner {
    state: Mutex<CacheState>,
    config: CacheConfig,
    sweeper_wake: Condvar,
}

/// Caches endpoint lists so repeated lookups skip the namespace authority.
///
/// Bounded by the total byte size of keys plus endpoint strings, not by
/// entry count. Expired entries are discarded lazily on lookup and
/// proactively by a background sweeper; inserts evict least-recently-used
/// entries until the newcomer fits, and an entry larger than the whole
/// budget is rejected outright.
pub struct EndpointCache {
    inner: Arc<CacheInner>,
    sweeper: Option<JoinHandle<()>>,
}

impl EndpointCache {
    /// Creates a cache and starts its sweeper thread.
    pub fn new(config: CacheConfig) -> Self {
        let inner = Arc::new(CacheInner {
            state: Mutex::new(CacheState::default()),
            config,
            sweeper_wake: Condvar::new(),
        });

        let sweeper_inner = Arc::clone(&inner);
        let sweeper = std::thread::Builder::new()
            .name("endpoint-cache-sweeper".into())
            .spawn(move || sweep_loop(&sweeper_inner))
            .ok();

        Self { inner, sweeper }
    }

    /// Creates a cache with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Looks up the endpoints for `key`, promoting a hit to
    /// most-recently-used. Expired entries are discarded on the spot.
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        let mut state = self.inner.state.lock();
        let now = Instant::now();

        let expired = match state.entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = now;
                trace!(key, "endpoint cache hit");
                return Some(entry.endpoints.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some(stale) = state.entries.remove(key) {
                state.total_bytes -= stale.bytes;
            }
        }
        None
    }

    /// Inserts an endpoint list with the given TTL (default when `None`).
    ///
    /// Returns false if the entry alone exceeds the byte budget; such
    /// entries are never stored.
    pub fn insert(&self, key: &str, endpoints: Vec<String>, ttl: Option<Duration>) -> bool {
        let bytes = key.len() + endpoints.iter().map(String::len).sum::<usize>();
        let mut state = self.inner.state.lock();

        if bytes > self.inner.config.max_bytes {
            debug!(key, bytes, "endpoint list too large for cache");
            return false;
        }

        if let Some(old) = state.entries.remove(key) {
            state.total_bytes -= old.bytes;
        }

        while state.total_bytes + bytes > self.inner.config.max_bytes {
            let Some(victim) = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            if let Some(evicted) = state.entries.remove(&victim) {
                state.total_bytes -= evicted.bytes;
                trace!(key = victim.as_str(), "evicted least-recently-used entry");
            }
        }

        let now = Instant::now();
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                endpoints,
                expires_at: now + ttl.unwrap_or(self.inner.config.default_ttl),
                last_used: now,
                bytes,
            },
        );
        state.total_bytes += bytes;
        true
    }

    /// Drops every entry whose TTL has passed.
    pub fn purge_expired(&self) {
        let mut state = self.inner.state.lock();
        purge(&mut state);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// True if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current byte footprint.
    pub fn total_bytes(&self) -> usize {
        self.inner.state.lock().total_bytes
    }
}

impl Drop for EndpointCache {
    fn drop(&mut self) {
        self.inner.state.lock().stopping = true;
        self.inner.sweeper_wake.notify_all();
        if let Some(handle) = self.sweeper.take() {
            let _ = handle.join();
        }
    }
}

fn purge(state: &mut CacheState) {
    let now = Instant::now();
    let expired: Vec<String> = state
        .entries
        .iter()
        .filter(|(_, e)| e.expires_at <= now)
        .map(|(k, _)| k.clone())
        .collect();
    for key in expired {
        if let Some(entry) = state.entries.remove(&key) {
            state.total_bytes -= entry.bytes;
        }
    }
}

fn sweep_loop(inner: &CacheInner) {
    let mut state = inner.state.lock();
    loop {
        inner
            .sweeper_wake
            .wait_for(&mut state, inner.config.sweep_interval);
        if state.stopping {
            break;
        }
        purge(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn cache(max_bytes: usize) -> EndpointCache {
        EndpointCache::new(CacheConfig {
            default_ttl: Duration::from_secs(60),
            max_bytes,
            sweep_interval: Duration::from_millis(20),
        })
    }

    fn eps(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn entry_lives_through_half_its_ttl_and_not_past_it() {
        let cache = cache(1024);
        cache.insert("k", eps(&["e1"]), Some(Duration::from_millis(100)));

        sleep(Duration::from_millis(50));
        assert!(cache.get("k").is_some());

        sleep(Duration::from_millis(100));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn sweeper_purges_without_lookups() {
        let cache = cache(1024);
        cache.insert("k", eps(&["e1"]), Some(Duration::from_millis(30)));
        assert_eq!(cache.len(), 1);

        // No get() in between: only the sweeper can remove it.
        sleep(Duration::from_millis(120));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn lru_eviction_until_newcomer_fits() {
        // Each entry: 2-byte key + 8-byte endpoint = 10 bytes.
        let cache = cache(30);
        cache.insert("k1", eps(&["12345678"]), None);
        sleep(Duration::from_millis(2));
        cache.insert("k2", eps(&["12345678"]), None);
        sleep(Duration::from_millis(2));
        cache.insert("k3", eps(&["12345678"]), None);
        assert_eq!(cache.len(), 3);

        // Touch k1 so k2 becomes the oldest.
        sleep(Duration::from_millis(2));
        assert!(cache.get("k1").is_some());

        cache.insert("k4", eps(&["12345678"]), None);
        assert_eq!(cache.len(), 3);
        assert!(cache.get("k2").is_none());
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k3").is_some());
        assert!(cache.get("k4").is_some());
    }

    #[test]
    fn oversized_entry_is_rejected() {
        let cache = cache(16);
        let stored = cache.insert("key", eps(&["an-endpoint-string-well-over-budget"]), None);
        assert!(!stored);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn reinsert_replaces_and_reaccounts() {
        let cache = cache(1024);
        cache.insert("k", eps(&["aaaa"]), None);
        let first = cache.total_bytes();
        cache.insert("k", eps(&["bb"]), None);
        assert!(cache.total_bytes() < first);
        assert_eq!(cache.get("k").unwrap(), eps(&["bb"]));
    }

    #[test]
    fn read_promotes_entry() {
        let cache = cache(20);
        cache.insert("a", eps(&["12345678"]), None);
        sleep(Duration::from_millis(2));
        cache.insert("b", eps(&["12345678"]), None);

        // Promote "a"; inserting "c" must evict "b".
        sleep(Duration::from_millis(2));
        assert!(cache.get("a").is_some());
        cache.insert("c", eps(&["12345678"]), None);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }
}
