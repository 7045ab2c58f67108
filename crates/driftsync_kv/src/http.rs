//! HTTP transport implementation.

use crate::error::{KvError, KvResult};
use crate::transport::KvTransport;
use driftsync_proto::{KvReply, KvRequest};
use std::time::Duration;

/// Request path every replica serves.
const REQUEST_PATH: &str = "/request";

/// Sends KV envelopes over HTTP, one POST per attempt.
///
/// The per-attempt timeout is applied to the whole request; a timed-out or
/// unreachable replica surfaces as a retryable error so the client can move
/// on to the next candidate.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a new HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns a fatal transport error if the underlying client cannot be
    /// constructed.
    pub fn new() -> KvResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| KvError::transport_fatal(e.to_string()))?;
        Ok(Self { client })
    }

    fn url_for(address: &str) -> String {
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{address}{REQUEST_PATH}")
        } else {
            format!("http://{address}{REQUEST_PATH}")
        }
    }
}

impl KvTransport for HttpTransport {
    fn send(&self, address: &str, request: &KvRequest, timeout: Duration) -> KvResult<KvReply> {
        let url = Self::url_for(address);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    KvError::Timeout
                } else {
                    KvError::transport_retryable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KvError::transport_retryable(format!(
                "{url} returned HTTP {status}"
            )));
        }

        response
            .json::<KvReply>()
            .map_err(|e| KvError::Protocol(format!("malformed reply from {url}: {e}")))
    }
}
