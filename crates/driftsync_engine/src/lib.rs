//! # Driftsync Engine
//!
//! The reconciliation engine: event-driven workflows that converge the
//! local filesystem, the local metadata store, and the remote KV cluster.
//!
//! This crate provides:
//! - [`ChangeQueue`] / [`EventQueue`] - thread-safe feeds from the watcher
//!   and the remote notification channel
//! - [`Batcher`] - debounces and de-duplicates local change events
//! - local-origin and remote-origin workflows, including the conflict
//!   resolution path (automatic merge, remote-wins fallback, conflict copy)
//! - an initial bulk-sync pass
//! - [`SyncContext`] - one explicit context object holding the store, the
//!   endpoint cache, the KV client, and the collaborator seams
//! - [`SyncEngine`] - thread lifecycle with cooperative shutdown
//!
//! ## Key invariants
//!
//! - A directory record's child lists always equal the stored keys one
//!   segment below its key
//! - A file record's cached content and content hash change together
//! - A record's version is only ever the value the remote store reported
//! - Every metadata mutation runs under the store-wide lock; queue pushes
//!   never take that lock

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batcher;
mod bootsync;
mod config;
mod context;
mod engine;
mod error;
mod fsops;
mod local;
mod notifier;
mod queue;
mod remote;
mod resolve;
mod token;

pub use batcher::Batcher;
pub use bootsync::BulkSyncReport;
pub use config::EngineConfig;
pub use context::SyncContext;
pub use engine::SyncEngine;
pub use error::{EngineError, EngineResult};
pub use fsops::{content_hash, key_to_path, path_to_key};
pub use notifier::{LogNotifier, Notifier};
pub use queue::{ChangeQueue, Drained, EventQueue, Polled};
pub use remote::RemoteConsumer;
pub use token::{StaticToken, TokenSource};
