//! # Driftsync Testkit
//!
//! Shared fixtures for workspace tests:
//! - [`MemoryAuthority`] - an in-process namespace authority with a real
//!   namespace model and a call log
//! - [`InMemoryKv`] - a transport that behaves like a single healthy
//!   replica, including version bumping and stale-write rejection
//! - [`TempTree`] - a temporary synchronized root with path helpers

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authority;
mod kv;
mod tree;

pub use authority::MemoryAuthority;
pub use kv::InMemoryKv;
pub use tree::TempTree;
