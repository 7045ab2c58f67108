//! # Driftsync KV
//!
//! Fault-tolerant client for the sharded, replicated KV store, plus the
//! endpoint cache that amortizes namespace-authority lookups.
//!
//! This crate provides:
//! - [`KvTransport`] - network seam with an HTTP implementation and a
//!   scripted mock for tests
//! - [`KvClient`] - shuffle-retry across replica candidates with
//!   transparent leader-redirect following and tombstone translation
//! - [`EndpointCache`] - bounded LRU+TTL cache of file-key to endpoint-list
//!   mappings with a background expiry sweeper
//! - [`NamespaceAuthority`] - seam for the remote namespace service

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authority;
mod cache;
mod client;
mod error;
mod http;
mod transport;

pub use authority::{DirectoryListing, HttpAuthority, NamespaceAuthority};
pub use cache::{CacheConfig, EndpointCache};
pub use client::KvClient;
pub use error::{KvError, KvResult};
pub use http::HttpTransport;
pub use transport::{KvTransport, MockTransport};
