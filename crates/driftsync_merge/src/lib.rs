//! # Driftsync Merge
//!
//! Line-oriented three-way merge and deterministic conflict-copy naming.
//!
//! [`merge3`] takes the last-known-common ancestor of a file plus the
//! diverged local and remote contents and either produces merged content or
//! reports a conflict. Merging is pure and CPU-bound; what happens on a
//! conflict (remote wins, local preserved as a copy) is the engine's job.
//!
//! This is deliberately a dependency-free crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod naming;

pub use diff::{merge3, MergeOutcome};
pub use naming::conflict_key;
