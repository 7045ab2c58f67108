//! Shuffle-retry KV client with leader-redirect following.

use crate::error::{KvError, KvResult};
use crate::transport::KvTransport;
use driftsync_proto::{FileEnvelope, KvReply, KvRequest, TOMBSTONE};
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-attempt network timeout.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Redirect hops before a rotating leader is treated as a loop.
const MAX_REDIRECTS: usize = 8;

/// Client for get/set/delete against a replica group with a possibly
/// rotating leader.
///
/// Candidates are shuffled to spread load, then tried in turn with a short
/// per-attempt timeout. A redirect reply is followed transparently without
/// consuming a candidate slot. There is no native delete: deleting writes a
/// reserved tombstone, and reads translate the tombstone into "key does not
/// exist".
pub struct KvClient {
    transport: Box<dyn KvTransport>,
    device_id: String,
    attempt_timeout: Duration,
}

impl KvClient {
    /// Creates a client over the given transport.
    pub fn new(transport: Box<dyn KvTransport>, device_id: impl Into<String>) -> Self {
        Self {
            transport,
            device_id: device_id.into(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Returns the device identity writes are attributed to.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Reads the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] for absent and tombstoned keys.
    pub fn get(&self, servers: &[String], key: &str, token: &str) -> KvResult<String> {
        debug!(key, "kv get");
        let reply = self.try_servers(servers, &KvRequest::get(key, token))?;
        if reply.is_failure() {
            return Err(KvError::NotFound {
                key: key.to_string(),
            });
        }
        match reply.stored_value() {
            None => Err(KvError::NotFound {
                key: key.to_string(),
            }),
            Some(TOMBSTONE) => Err(KvError::NotFound {
                key: key.to_string(),
            }),
            Some(value) => Ok(value.to_string()),
        }
    }

    /// Writes `value` under `key`, attributed to this device.
    pub fn put(&self, servers: &[String], key: &str, token: &str, value: &str) -> KvResult<KvReply> {
        debug!(key, "kv put");
        let request = KvRequest::put(key, token, self.device_id.clone(), value);
        let reply = self.try_servers(servers, &request)?;
        if reply.is_version_conflict() {
            return Err(KvError::VersionConflict {
                key: key.to_string(),
            });
        }
        if reply.is_failure() {
            return Err(KvError::Rejected(format!("put of {key} rejected")));
        }
        Ok(reply)
    }

    /// Deletes `key` by writing the tombstone value.
    pub fn delete(&self, servers: &[String], key: &str, token: &str) -> KvResult<()> {
        self.put(servers, key, token, TOMBSTONE).map(|_| ())
    }

    /// Reads a file value and unwraps its versioned envelope.
    pub fn get_file(&self, servers: &[String], key: &str, token: &str) -> KvResult<FileEnvelope> {
        let raw = self.get(servers, key, token)?;
        FileEnvelope::from_wire(&raw)
            .map_err(|e| KvError::Protocol(format!("bad file envelope for {key}: {e}")))
    }

    /// Writes a file envelope and returns the version the store reports.
    ///
    /// Replicas that omit the committed version in the acknowledgement fall
    /// back to the envelope's version plus one, which is the same number a
    /// conforming replica would report.
    pub fn put_file(
        &self,
        servers: &[String],
        key: &str,
        token: &str,
        envelope: &FileEnvelope,
    ) -> KvResult<String> {
        let reply = self.put(servers, key, token, &envelope.to_wire())?;
        let reported = reply
            .payload
            .as_ref()
            .and_then(|p| p.version_number.clone());
        Ok(reported.unwrap_or_else(|| {
            let current: u64 = envelope.version_number.parse().unwrap_or(0);
            (current + 1).to_string()
        }))
    }

    /// Shuffles the candidate list and tries each in turn, following
    /// redirects, until a reply arrives.
    fn try_servers(&self, servers: &[String], request: &KvRequest) -> KvResult<KvReply> {
        let mut order: Vec<&String> = servers.iter().collect();
        order.shuffle(&mut rand::thread_rng());

        for address in &order {
            match self.follow_redirects(address, request) {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    warn!(address = address.as_str(), %err, "kv attempt failed");
                }
            }
        }
        Err(KvError::Exhausted {
            attempts: order.len(),
        })
    }

    /// Sends to one candidate, chasing leader redirects until a
    /// non-redirect result. Redirect hops do not consume candidate slots.
    fn follow_redirects(&self, address: &str, request: &KvRequest) -> KvResult<KvReply> {
        let mut current = address.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let reply = self
                .transport
                .send(&current, request, self.attempt_timeout)?;
            match reply.redirect_target() {
                Some(target) => {
                    debug!(from = current.as_str(), to = target, "following leader redirect");
                    current = target.to_string();
                }
                None => return Ok(reply),
            }
        }
        Err(KvError::RedirectLoop {
            depth: MAX_REDIRECTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn client_with(transport: MockTransport) -> KvClient {
        KvClient::new(Box::new(transport), "dev-test")
    }

    fn servers(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn follows_exactly_one_redirect_to_success() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::redirect("s2"));
        transport.enqueue("s2", KvReply::value("hello"));
        let client = client_with(transport);

        // A single candidate: the redirect must not consume another slot.
        let value = client.get(&servers(&["s1"]), "k", "tok").unwrap();
        assert_eq!(value, "hello");
    }

    #[test]
    fn redirect_chain_stops_at_loop_guard() {
        let transport = MockTransport::new();
        for _ in 0..=MAX_REDIRECTS {
            transport.enqueue("s1", KvReply::redirect("s1"));
        }
        transport.enqueue("s1", KvReply::redirect("s1"));
        let client = client_with(transport);

        let err = client.get(&servers(&["s1"]), "k", "tok").unwrap_err();
        // The failed candidate chain ends in an aggregate failure.
        assert!(matches!(err, KvError::Exhausted { attempts: 1 }));
    }

    #[test]
    fn dead_candidates_are_skipped_until_one_answers() {
        let transport = MockTransport::new();
        transport.enqueue_unreachable("s1", "connection refused");
        transport.enqueue_unreachable("s2", "connection refused");
        transport.enqueue("s3", KvReply::value("v"));
        let client = client_with(transport);

        let value = client.get(&servers(&["s1", "s2", "s3"]), "k", "tok").unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn all_candidates_down_is_aggregate_failure() {
        let client = client_with(MockTransport::new());
        let err = client.get(&servers(&["s1", "s2"]), "k", "tok").unwrap_err();
        assert!(matches!(err, KvError::Exhausted { attempts: 2 }));
    }

    #[test]
    fn tombstone_reads_as_absent() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::value(TOMBSTONE));
        let client = client_with(transport);

        let err = client.get(&servers(&["s1"]), "gone", "tok").unwrap_err();
        assert!(matches!(err, KvError::NotFound { .. }));
    }

    #[test]
    fn explicit_failure_reads_as_absent() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::fail());
        let client = client_with(transport);

        let err = client.get(&servers(&["s1"]), "never-set", "tok").unwrap_err();
        assert!(matches!(err, KvError::NotFound { .. }));
    }

    #[test]
    fn put_carries_device_id_and_tombstone_value() {
        let transport = std::sync::Arc::new(MockTransport::new());
        transport.enqueue("s1", KvReply::committed("1"));

        let client = KvClient::new(Box::new(std::sync::Arc::clone(&transport)), "dev-9");
        client.delete(&servers(&["s1"]), "k", "tok").unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.payload.device_id.as_deref(), Some("dev-9"));
        assert_eq!(sent[0].1.payload.value.as_deref(), Some(TOMBSTONE));
    }

    #[test]
    fn put_file_returns_reported_version() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::committed("7"));
        let client = client_with(transport);

        let envelope = FileEnvelope::new("6", "content");
        let version = client
            .put_file(&servers(&["s1"]), "k", "tok", &envelope)
            .unwrap();
        assert_eq!(version, "7");
    }

    #[test]
    fn put_file_falls_back_to_increment() {
        let transport = MockTransport::new();
        // Bare acknowledgement without a version number.
        transport.enqueue(
            "s1",
            KvReply {
                code: None,
                payload: Some(driftsync_proto::KvReplyPayload {
                    value: Some("ok".into()),
                    ..Default::default()
                }),
            },
        );
        let client = client_with(transport);

        let envelope = FileEnvelope::new("4", "content");
        let version = client
            .put_file(&servers(&["s1"]), "k", "tok", &envelope)
            .unwrap();
        assert_eq!(version, "5");
    }

    #[test]
    fn stale_put_surfaces_version_conflict() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::version_conflict());
        let client = client_with(transport);

        let envelope = FileEnvelope::new("2", "content");
        let err = client
            .put_file(&servers(&["s1"]), "k", "tok", &envelope)
            .unwrap_err();
        assert!(matches!(err, KvError::VersionConflict { .. }));
    }

    #[test]
    fn get_file_unwraps_envelope() {
        let transport = MockTransport::new();
        let stored = FileEnvelope::new("3", "A\nB\n");
        transport.enqueue("s1", KvReply::value(stored.to_wire()));
        let client = client_with(transport);

        let envelope = client.get_file(&servers(&["s1"]), "k", "tok").unwrap();
        assert_eq!(envelope, stored);
    }
}
