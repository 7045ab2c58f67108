//! Wire envelopes for the distributed KV protocol.
//!
//! Requests and replies are JSON. A request is
//! `{"type": "get"|"put", "payload": {key, token, device_id?, value?}}`.
//! A success reply carries a `payload`; a leader redirect carries
//! `{"payload": {"message": "<new-address>"}}`; an explicit failure carries
//! `{"code": "fail"}`.

use serde::{Deserialize, Serialize};

/// Reserved value written in place of a true delete. A `get` that finds
/// this value reports the key as absent.
pub const TOMBSTONE: &str = "__deleted__";

/// Failure message a replica returns when a put carries a stale version.
pub const VERSION_CONFLICT: &str = "version-conflict";

/// KV request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    /// Read a value.
    #[serde(rename = "get")]
    Get,
    /// Write a value.
    #[serde(rename = "put")]
    Put,
}

/// Request payload: key, bearer token, and for writes the authoring device
/// and the value itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvPayload {
    /// Store key.
    pub key: String,
    /// Bearer token from the login flow.
    pub token: String,
    /// Authoring device, present on writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Value to write, present on writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A complete KV request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvRequest {
    /// Request kind.
    #[serde(rename = "type")]
    pub request_type: RequestType,
    /// Request payload.
    pub payload: KvPayload,
}

impl KvRequest {
    /// Builds a get request.
    pub fn get(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            request_type: RequestType::Get,
            payload: KvPayload {
                key: key.into(),
                token: token.into(),
                device_id: None,
                value: None,
            },
        }
    }

    /// Builds a put request.
    pub fn put(
        key: impl Into<String>,
        token: impl Into<String>,
        device_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            request_type: RequestType::Put,
            payload: KvPayload {
                key: key.into(),
                token: token.into(),
                device_id: Some(device_id.into()),
                value: Some(value.into()),
            },
        }
    }
}

/// Reply payload. Which fields are present depends on the reply kind:
/// `message` for redirects and failure detail, `value`/`data` for get
/// results, `version_number` for the committed version after a put.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvReplyPayload {
    /// Redirect target or failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stored value (get).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Stored value under its alternate field name (get).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Version the store committed (put).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<String>,
}

/// A complete KV reply envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvReply {
    /// `"fail"` on an explicit failure, absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Reply payload, absent when the key was never set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<KvReplyPayload>,
}

impl KvReply {
    /// Returns true if the replica reported an explicit failure.
    pub fn is_failure(&self) -> bool {
        self.code.as_deref() == Some("fail")
    }

    /// Returns true if this failure is a stale-version rejection.
    pub fn is_version_conflict(&self) -> bool {
        self.is_failure()
            && self
                .payload
                .as_ref()
                .and_then(|p| p.message.as_deref())
                .map(|m| m == VERSION_CONFLICT)
                .unwrap_or(false)
    }

    /// Returns the new leader address if this reply is a redirect.
    ///
    /// A redirect is a non-failure reply whose payload carries only a
    /// `message`.
    pub fn redirect_target(&self) -> Option<&str> {
        if self.is_failure() {
            return None;
        }
        let payload = self.payload.as_ref()?;
        if payload.value.is_some() || payload.data.is_some() || payload.version_number.is_some() {
            return None;
        }
        payload.message.as_deref()
    }

    /// Returns the stored value, whichever field name the replica used.
    pub fn stored_value(&self) -> Option<&str> {
        let payload = self.payload.as_ref()?;
        payload.value.as_deref().or(payload.data.as_deref())
    }

    /// Builds a success reply carrying a value.
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            code: None,
            payload: Some(KvReplyPayload {
                value: Some(value.into()),
                ..Default::default()
            }),
        }
    }

    /// Builds a redirect reply pointing at `address`.
    pub fn redirect(address: impl Into<String>) -> Self {
        Self {
            code: None,
            payload: Some(KvReplyPayload {
                message: Some(address.into()),
                ..Default::default()
            }),
        }
    }

    /// Builds an explicit failure reply.
    pub fn fail() -> Self {
        Self {
            code: Some("fail".into()),
            payload: None,
        }
    }

    /// Builds a stale-version rejection.
    pub fn version_conflict() -> Self {
        Self {
            code: Some("fail".into()),
            payload: Some(KvReplyPayload {
                message: Some(VERSION_CONFLICT.into()),
                ..Default::default()
            }),
        }
    }

    /// Builds a put acknowledgement carrying the committed version.
    pub fn committed(version: impl Into<String>) -> Self {
        Self {
            code: None,
            payload: Some(KvReplyPayload {
                version_number: Some(version.into()),
                ..Default::default()
            }),
        }
    }
}

/// How file values travel through the KV store: the content together with
/// the version the write is based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEnvelope {
    /// Monotonic decimal version string.
    pub version_number: String,
    /// File content.
    pub data: String,
}

impl FileEnvelope {
    /// Creates a new envelope.
    pub fn new(version_number: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            version_number: version_number.into(),
            data: data.into(),
        }
    }

    /// Serializes the envelope to its JSON wire form.
    pub fn to_wire(&self) -> String {
        // A struct of two strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses an envelope from its JSON wire form.
    pub fn from_wire(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
