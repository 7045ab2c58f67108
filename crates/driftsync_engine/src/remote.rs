//! Remote-origin reconciliation workflows.

use crate::context::SyncContext;
use crate::error::{EngineError, EngineResult};
use crate::fsops;
use crate::queue::{EventQueue, Polled};
use crate::resolve;
use driftsync_proto::{RemoteEvent, RemoteEventKind};
use driftsync_store::{DirectoryRecord, FileRecord, MetaStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poll interval for the remote feed; the close signal interrupts it.
const POLL_WAIT: Duration = Duration::from_millis(200);

/// Consumes remote change notifications and applies them locally.
pub struct RemoteConsumer {
    ctx: Arc<SyncContext>,
    queue: Arc<EventQueue<RemoteEvent>>,
}

impl RemoteConsumer {
    /// Creates a consumer over the given feed.
    pub fn new(ctx: Arc<SyncContext>, queue: Arc<EventQueue<RemoteEvent>>) -> Self {
        Self { ctx, queue }
    }

    /// Consumes the queue until it is closed.
    pub fn run(&self) {
        loop {
            match self.queue.pop_wait(POLL_WAIT) {
                Polled::Closed => break,
                Polled::TimedOut => continue,
                Polled::Event(event) => self.dispatch(&event),
            }
        }
        debug!("remote consumer stopped");
    }

    /// Processes one notification under the store-wide lock.
    pub fn dispatch(&self, event: &RemoteEvent) {
        if event.device_id == self.ctx.config.device_id {
            debug!(path = event.path.as_str(), "ignoring echo of our own write");
            return;
        }
        debug!(kind = ?event.kind, path = event.path.as_str(), "processing remote event");
        let mut store = self.ctx.store.lock();

        let result = match event.kind {
            RemoteEventKind::DirCreated => dir_created(&self.ctx, &mut store, &event.path),
            RemoteEventKind::DirDeleted => dir_deleted(&self.ctx, &mut store, &event.path),
            RemoteEventKind::FileCreated | RemoteEventKind::FileModified => {
                file_upserted(&self.ctx, &mut store, event)
            }
            RemoteEventKind::FileDeleted => file_deleted(&self.ctx, &mut store, &event.path),
        };

        if let Err(err) = result {
            warn!(path = event.path.as_str(), %err, "remote event failed; skipping");
        }
    }
}

/// Another device created a directory: materialize it locally if absent.
fn dir_created(ctx: &SyncContext, store: &mut MetaStore, key: &str) -> EngineResult<()> {
    fsops::ensure_dir(&ctx.config.root, key)?;
    if store.load_dir(key)?.is_some() {
        debug!(key, "directory already known");
        return Ok(());
    }
    store.store_dir(&DirectoryRecord::new(key))?;
    store.register_child(key)?;
    info!(key, "materialized remote directory");
    Ok(())
}

/// Another device deleted a directory: drop the local tree and records.
fn dir_deleted(ctx: &SyncContext, store: &mut MetaStore, key: &str) -> EngineResult<()> {
    fsops::remove_entry(&ctx.config.root, key)?;
    store.remove_dir_recursive(key)?;
    store.unregister_child(key)?;
    info!(key, "removed directory");
    Ok(())
}

/// Another device deleted a file: drop the local copy and record.
fn file_deleted(ctx: &SyncContext, store: &mut MetaStore, key: &str) -> EngineResult<()> {
    fsops::remove_entry(&ctx.config.root, key)?;
    store.remove_file(key)?;
    store.unregister_child(key)?;
    info!(key, "removed file");
    Ok(())
}

/// Another device created or modified a file. Absent locally means fetch
/// and materialize; present means compare the stored hash with the event's
/// declared hash - equal is a metadata-only refresh, different goes to the
/// conflict resolver.
fn file_upserted(ctx: &SyncContext, store: &mut MetaStore, event: &RemoteEvent) -> EngineResult<()> {
    let key = &event.path;
    let Some(record) = store.load_file(key)? else {
        return fetch_and_materialize(ctx, store, key);
    };

    match event.content_hash.as_deref() {
        Some(declared) if declared == record.content_hash => refresh_metadata(ctx, store, record),
        _ => {
            let endpoints = ctx.endpoints_for(key)?;
            let token = ctx.bearer_token()?;
            let remote = ctx.kv.get_file(&endpoints, key, &token)?;
            resolve::resolve_conflict(ctx, store, key, remote)
        }
    }
}

/// Downloads a file this client has never seen and creates its record.
pub(crate) fn fetch_and_materialize(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
) -> EngineResult<()> {
    let endpoints = ctx.endpoints_for(key)?;
    let token = ctx.bearer_token()?;
    let envelope = ctx.kv.get_file(&endpoints, key, &token)?;

    fsops::write_text(&ctx.config.root, key, &envelope.data)?;
    let mut record = FileRecord::new(key);
    record.set_content(envelope.data.clone(), fsops::content_hash(&envelope.data));
    record.set_version(envelope.version_number.clone());
    store.store_file(&record)?;
    store.register_child(key)?;
    info!(key, version = envelope.version_number.as_str(), "materialized remote file");
    Ok(())
}

/// Content is already identical; only the advertised version moved.
fn refresh_metadata(
    ctx: &SyncContext,
    store: &mut MetaStore,
    mut record: FileRecord,
) -> EngineResult<()> {
    let key = record.key.clone();
    let endpoints = ctx.endpoints_for(&key)?;
    let token = ctx.bearer_token()?;
    let envelope = ctx.kv.get_file(&endpoints, &key, &token)?;

    if fsops::content_hash(&envelope.data) != record.content_hash {
        return Err(EngineError::Integrity {
            key,
            message: "declared hash matched but fetched content differs".to_string(),
        });
    }
    record.set_version(envelope.version_number);
    store.store_file(&record)?;
    debug!(key = record.key.as_str(), "metadata-only refresh");
    Ok(())
}
