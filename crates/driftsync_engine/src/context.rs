//! The explicit context object every workflow runs against.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::notifier::Notifier;
use crate::token::TokenSource;
use driftsync_kv::{EndpointCache, KvClient, NamespaceAuthority};
use driftsync_store::MetaStore;
use parking_lot::Mutex;

/// Everything the workflows share: the metadata store behind its
/// store-wide lock, the endpoint cache, the KV client, and the
/// collaborator seams.
///
/// Constructed once at startup and passed into the engine; there is no
/// hidden global state, so tests substitute fakes freely.
pub struct SyncContext {
    /// Engine configuration.
    pub config: EngineConfig,
    /// The metadata store. The mutex is the store-wide lock: it is held
    /// for the duration of each processed event.
    pub store: Mutex<MetaStore>,
    /// Endpoint cache in front of the namespace authority.
    pub cache: EndpointCache,
    /// Distributed KV client.
    pub kv: KvClient,
    /// Namespace authority collaborator.
    pub authority: Box<dyn NamespaceAuthority>,
    /// Best-effort notification collaborator.
    pub notifier: Box<dyn Notifier>,
    /// Login-flow collaborator.
    pub token: Box<dyn TokenSource>,
}

impl SyncContext {
    /// Assembles a context. The endpoint cache is built from the config's
    /// cache section and starts its sweeper immediately.
    pub fn new(
        config: EngineConfig,
        store: MetaStore,
        kv: KvClient,
        authority: Box<dyn NamespaceAuthority>,
        notifier: Box<dyn Notifier>,
        token: Box<dyn TokenSource>,
    ) -> Self {
        let cache = EndpointCache::new(config.cache.clone());
        Self {
            config,
            store: Mutex::new(store),
            cache,
            kv,
            authority,
            notifier,
            token,
        }
    }

    /// Returns a bearer token for the next remote call.
    pub(crate) fn bearer_token(&self) -> EngineResult<String> {
        self.token.bearer_token().map_err(EngineError::Token)
    }

    /// Returns the storage endpoints for a file key, going through the
    /// cache and falling back to the authority on a miss.
    pub(crate) fn endpoints_for(&self, key: &str) -> EngineResult<Vec<String>> {
        if let Some(endpoints) = self.cache.get(key) {
            return Ok(endpoints);
        }
        let token = self.bearer_token()?;
        let endpoints = self.authority.file_endpoints(key, &token)?;
        if endpoints.is_empty() {
            return Err(EngineError::NoEndpoints {
                key: key.to_string(),
            });
        }
        self.cache.insert(key, endpoints.clone(), None);
        Ok(endpoints)
    }
}
