//! # Driftsync Store
//!
//! Durable path-keyed metadata store for the driftsync client.
//!
//! This crate provides the local metadata half of the sync engine:
//!
//! - [`StoreBackend`] - opaque key/value byte store trait
//! - [`InMemoryBackend`] - for testing and ephemeral runs
//! - [`FileBackend`] - append-only log replayed at open, with an advisory
//!   lock for single-process access
//! - [`FileRecord`] / [`DirectoryRecord`] - the two record kinds
//! - [`MetaStore`] - typed layer with prefix scans, parent child-list
//!   registration, and recursive directory removal
//!
//! ## Synchronization
//!
//! The store is **not** internally synchronized. Every caller serializes
//! access through one external lock; the engine wraps the [`MetaStore`] in
//! a mutex held for the duration of each processed event.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod meta;
mod record;

pub use backend::StoreBackend;
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use meta::MetaStore;
pub use record::{DirectoryRecord, FileRecord};
