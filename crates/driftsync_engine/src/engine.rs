//! Engine lifecycle: thread spawning and cooperative shutdown.

use crate::batcher::Batcher;
use crate::bootsync::{self, BulkSyncReport};
use crate::context::SyncContext;
use crate::error::EngineResult;
use crate::queue::{ChangeQueue, EventQueue};
use crate::remote::RemoteConsumer;
use driftsync_proto::RemoteEvent;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// The synchronization engine.
///
/// Owns the two consumer threads (change batcher, remote consumer) and the
/// feeds the external collaborators push into. Shutdown is cooperative:
/// closing the feeds wakes both consumers at their blocking waits and
/// [`SyncEngine::shutdown`] joins them; the endpoint cache stops its own
/// sweeper when the context drops.
pub struct SyncEngine {
    ctx: Arc<SyncContext>,
    changes: Arc<ChangeQueue>,
    remote_events: Arc<EventQueue<RemoteEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl SyncEngine {
    /// Wraps a context into an engine. No threads run yet.
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            changes: Arc::new(ChangeQueue::new()),
            remote_events: Arc::new(EventQueue::new()),
            workers: Vec::new(),
        }
    }

    /// The feed the filesystem watcher pushes into.
    pub fn changes(&self) -> Arc<ChangeQueue> {
        Arc::clone(&self.changes)
    }

    /// The feed the remote notification channel pushes into.
    pub fn remote_events(&self) -> Arc<EventQueue<RemoteEvent>> {
        Arc::clone(&self.remote_events)
    }

    /// The shared context, mainly for inspection in tests and tooling.
    pub fn context(&self) -> Arc<SyncContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the initial bulk-sync passes.
    pub fn bulk_sync(&self) -> EngineResult<BulkSyncReport> {
        bootsync::run(&self.ctx)
    }

    /// Spawns the consumer threads. Calling this twice is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!(device = self.ctx.config.device_id.as_str(), "starting sync engine");

        let batcher = Batcher::new(Arc::clone(&self.ctx), Arc::clone(&self.changes));
        if let Ok(handle) = std::thread::Builder::new()
            .name("change-batcher".into())
            .spawn(move || batcher.run())
        {
            self.workers.push(handle);
        }

        let consumer = RemoteConsumer::new(Arc::clone(&self.ctx), Arc::clone(&self.remote_events));
        if let Ok(handle) = std::thread::Builder::new()
            .name("remote-consumer".into())
            .spawn(move || consumer.run())
        {
            self.workers.push(handle);
        }
    }

    /// True while consumer threads are alive.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Closes both feeds and joins the consumers. Queued events are still
    /// processed before the threads exit.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        info!("stopping sync engine");
        self.changes.close();
        self.remote_events.close();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        if let Err(err) = self.ctx.store.lock().sync() {
            warn!(%err, "final store sync failed");
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
