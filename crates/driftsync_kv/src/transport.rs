//! Transport seam for KV requests.

use crate::error::{KvError, KvResult};
use driftsync_proto::{KvReply, KvRequest};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Sends one KV request to one server address.
///
/// Implementations own connection handling and the per-attempt timeout.
/// A returned `Ok` means a well-formed reply arrived - including explicit
/// failure envelopes; only network-level problems surface as errors.
pub trait KvTransport: Send + Sync {
    /// Sends `request` to `address`, waiting at most `timeout`.
    fn send(&self, address: &str, request: &KvRequest, timeout: Duration) -> KvResult<KvReply>;
}

impl<T: KvTransport + ?Sized> KvTransport for std::sync::Arc<T> {
    fn send(&self, address: &str, request: &KvRequest, timeout: Duration) -> KvResult<KvReply> {
        (**self).send(address, request, timeout)
    }
}

/// Scripted reply for the mock transport.
enum Scripted {
    Reply(KvReply),
    Unreachable(String),
}

/// A scripted transport for tests.
///
/// Replies are queued per address and consumed in order; an address with
/// an empty queue reports a retryable transport error, like a server that
/// is down. Every request is recorded for later inspection.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    sent: Mutex<Vec<(String, KvRequest)>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for `address`.
    pub fn enqueue(&self, address: impl Into<String>, reply: KvReply) {
        self.scripts
            .lock()
            .entry(address.into())
            .or_default()
            .push_back(Scripted::Reply(reply));
    }

    /// Queues a network failure for `address`.
    pub fn enqueue_unreachable(&self, address: impl Into<String>, message: impl Into<String>) {
        self.scripts
            .lock()
            .entry(address.into())
            .or_default()
            .push_back(Scripted::Unreachable(message.into()));
    }

    /// Returns the addresses contacted so far, in order.
    pub fn contacted(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(a, _)| a.clone()).collect()
    }

    /// Returns every request sent so far.
    pub fn requests(&self) -> Vec<(String, KvRequest)> {
        self.sent.lock().clone()
    }
}

impl KvTransport for MockTransport {
    fn send(&self, address: &str, request: &KvRequest, _timeout: Duration) -> KvResult<KvReply> {
        self.sent
            .lock()
            .push((address.to_string(), request.clone()));

        match self
            .scripts
            .lock()
            .get_mut(address)
            .and_then(|queue| queue.pop_front())
        {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Unreachable(message)) => Err(KvError::transport_retryable(message)),
            None => Err(KvError::transport_retryable(format!(
                "no route to {address}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replies_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::value("first"));
        transport.enqueue("s1", KvReply::fail());

        let req = KvRequest::get("k", "t");
        let reply = transport.send("s1", &req, Duration::from_secs(1)).unwrap();
        assert_eq!(reply.stored_value(), Some("first"));

        let reply = transport.send("s1", &req, Duration::from_secs(1)).unwrap();
        assert!(reply.is_failure());

        // Queue exhausted: behaves like a dead server.
        let err = transport.send("s1", &req, Duration::from_secs(1)).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn requests_are_recorded() {
        let transport = MockTransport::new();
        transport.enqueue("s1", KvReply::value("v"));
        let req = KvRequest::put("k", "t", "dev", "v");
        transport.send("s1", &req, Duration::from_secs(1)).unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "s1");
        assert_eq!(sent[0].1.payload.device_id.as_deref(), Some("dev"));
    }
}
