//! Local change batcher: the consumer side of the watcher feed.

use crate::context::SyncContext;
use crate::local;
use crate::queue::{ChangeQueue, Drained};
use driftsync_proto::{ChangeEvent, EntityKind, EventKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Drains the change queue in batches and dispatches each event to the
/// local-origin workflows.
///
/// The batcher wakes when the queue depth reaches the configured threshold
/// or the configured wait elapses, whichever comes first, then drains the
/// whole queue. Each event is processed with the store-wide lock held;
/// failures are logged and the event is skipped, never fatal.
pub struct Batcher {
    ctx: Arc<SyncContext>,
    queue: Arc<ChangeQueue>,
}

impl Batcher {
    /// Creates a batcher over the given feed.
    pub fn new(ctx: Arc<SyncContext>, queue: Arc<ChangeQueue>) -> Self {
        Self { ctx, queue }
    }

    /// Consumes the queue until it is closed.
    pub fn run(&self) {
        loop {
            match self
                .queue
                .drain_wait(self.ctx.config.batch_threshold, self.ctx.config.batch_wait)
            {
                Drained::Closed => break,
                Drained::Batch(events) => {
                    for event in events {
                        self.dispatch(&event);
                    }
                }
            }
        }
        debug!("change batcher stopped");
    }

    /// Processes one event under the store-wide lock.
    pub fn dispatch(&self, event: &ChangeEvent) {
        debug!(kind = %event.kind, path = event.path.as_str(), "processing local event");
        let mut store = self.ctx.store.lock();

        let result = match (event.kind, event.entity) {
            (EventKind::Created | EventKind::MovedTo, EntityKind::File) => {
                local::file_created(&self.ctx, &mut store, &event.path)
            }
            (EventKind::Created | EventKind::MovedTo, EntityKind::Directory) => {
                local::dir_created(&self.ctx, &mut store, &event.path)
            }
            (EventKind::Modified, EntityKind::File) => {
                local::file_modified(&self.ctx, &mut store, &event.path)
            }
            (EventKind::Deleted | EventKind::MovedFrom, entity) => {
                local::removed(&self.ctx, &mut store, &event.path, entity)
            }
            (kind, entity) => {
                // Nothing to reconcile for e.g. a directory modify.
                debug!(%kind, ?entity, path = event.path.as_str(), "dropping unhandled event");
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(path = event.path.as_str(), %err, "local event failed; skipping");
        }
    }
}
