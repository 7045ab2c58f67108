//! # Driftsync Protocol
//!
//! Shared event and wire types for the driftsync client.
//!
//! This crate provides:
//! - [`ChangeEvent`] for local filesystem change notifications
//! - [`RemoteEvent`] for change notifications pushed by the remote store
//! - KV wire envelopes ([`KvRequest`], [`KvReply`], [`FileEnvelope`])
//! - Path-key helpers shared by every layer
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod key;
mod kv;
mod remote;

pub use event::{ChangeEvent, EntityKind, EventKind};
pub use key::{is_directory_key, parent_key};
pub use kv::{
    FileEnvelope, KvPayload, KvReply, KvReplyPayload, KvRequest, RequestType, TOMBSTONE,
    VERSION_CONFLICT,
};
pub use remote::{RemoteEvent, RemoteEventKind};
