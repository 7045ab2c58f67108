//! Single-replica KV store behind the transport seam.

use driftsync_kv::{KvResult, KvTransport};
use driftsync_proto::{FileEnvelope, KvReply, KvRequest, RequestType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct KvState {
    values: HashMap<String, String>,
    puts: Vec<(String, String)>,
}

/// A transport that behaves like one healthy replica.
///
/// File envelopes get real version semantics: a put whose envelope carries
/// the currently stored version is committed with the version bumped by
/// one; any other version is rejected as stale. Non-envelope values
/// (tombstones included) are stored verbatim. Every put is logged for
/// assertions.
#[derive(Default)]
pub struct InMemoryKv {
    state: Mutex<KvState>,
}

impl InMemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).cloned()
    }

    /// Stores a raw value directly, bypassing version checks. Used to
    /// simulate writes from other devices.
    pub fn set_raw(&self, key: &str, value: impl Into<String>) {
        self.state.lock().values.insert(key.to_string(), value.into());
    }

    /// Returns the stored file envelope under `key`, if it parses as one.
    pub fn envelope(&self, key: &str) -> Option<FileEnvelope> {
        self.raw(key).and_then(|raw| FileEnvelope::from_wire(&raw).ok())
    }

    /// How many puts hit `key`.
    pub fn put_count(&self, key: &str) -> usize {
        self.state.lock().puts.iter().filter(|(k, _)| k == key).count()
    }

    /// Every put, in order.
    pub fn puts(&self) -> Vec<(String, String)> {
        self.state.lock().puts.clone()
    }
}

impl KvTransport for InMemoryKv {
    fn send(&self, _address: &str, request: &KvRequest, _timeout: Duration) -> KvResult<KvReply> {
        let key = request.payload.key.clone();
        let mut state = self.state.lock();

        match request.request_type {
            RequestType::Get => match state.values.get(&key) {
                Some(value) => Ok(KvReply::value(value.clone())),
                None => Ok(KvReply::fail()),
            },
            RequestType::Put => {
                let Some(value) = request.payload.value.clone() else {
                    return Ok(KvReply::fail());
                };
                state.puts.push((key.clone(), value.clone()));

                match FileEnvelope::from_wire(&value) {
                    Ok(incoming) => {
                        let current = state
                            .values
                            .get(&key)
                            .and_then(|raw| FileEnvelope::from_wire(raw).ok());
                        if let Some(current) = current {
                            if current.version_number != incoming.version_number {
                                return Ok(KvReply::version_conflict());
                            }
                        }
                        let bumped: u64 =
                            incoming.version_number.parse::<u64>().unwrap_or(0) + 1;
                        let committed = bumped.to_string();
                        state.values.insert(
                            key,
                            FileEnvelope::new(committed.clone(), incoming.data).to_wire(),
                        );
                        Ok(KvReply::committed(committed))
                    }
                    Err(_) => {
                        state.values.insert(key, value);
                        Ok(KvReply::value("ok"))
                    }
                }
            }
        }
    }
}
