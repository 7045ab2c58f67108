//! Local-origin reconciliation workflows.

use crate::context::SyncContext;
use crate::error::{EngineError, EngineResult};
use crate::fsops;
use crate::resolve;
use driftsync_kv::KvError;
use driftsync_proto::{EntityKind, FileEnvelope};
use driftsync_store::{DirectoryRecord, FileRecord, MetaStore};
use tracing::{debug, info, warn};

/// A file appeared locally: store metadata if absent, register it with its
/// parent, announce it to the authority, and upload the content.
///
/// Replaying the event for an already-materialized file is a no-op, so no
/// duplicate record and no duplicate upload happen.
pub(crate) fn file_created(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
) -> EngineResult<()> {
    if store.load_file(key)?.is_some() {
        debug!(key, "file already materialized");
        return Ok(());
    }
    store.store_file(&FileRecord::new(key))?;
    store.register_child(key)?;

    let token = ctx.bearer_token()?;
    ctx.authority.create_file(key, &token)?;
    upload(ctx, store, key)
}

/// A directory appeared locally: register it with its parent, announce it
/// to the authority, then store its record.
pub(crate) fn dir_created(ctx: &SyncContext, store: &mut MetaStore, key: &str) -> EngineResult<()> {
    if store.load_dir(key)?.is_some() {
        debug!(key, "directory already materialized");
        return Ok(());
    }
    store.register_child(key)?;

    let token = ctx.bearer_token()?;
    ctx.authority.create_directory(key, &token)?;
    store.store_dir(&DirectoryRecord::new(key))?;
    Ok(())
}

/// A file was modified locally. Saves that do not change the content hash
/// are suppressed; real changes upload, and a version mismatch reported by
/// the remote store hands over to the conflict resolver.
pub(crate) fn file_modified(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
) -> EngineResult<()> {
    let Some(record) = store.load_file(key)? else {
        // Some editors emit modify for a brand-new file.
        return file_created(ctx, store, key);
    };
    let content = fsops::read_text(&ctx.config.root, key)?;
    if fsops::content_hash(&content) == record.content_hash {
        debug!(key, "content unchanged; suppressing upload");
        return Ok(());
    }
    upload(ctx, store, key)
}

/// A file or directory was deleted or moved away: delete the remote copy,
/// drop the metadata, and unregister from the parent, recursing into
/// children for directories.
pub(crate) fn removed(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
    entity: EntityKind,
) -> EngineResult<()> {
    match entity {
        EntityKind::File => {
            if store.load_file(key)?.is_none() {
                debug!(key, "no record for removed file");
                return Ok(());
            }
            remote_delete_file(ctx, key);
            store.remove_file(key)?;
            store.unregister_child(key)?;
        }
        EntityKind::Directory => {
            if store.load_dir(key)?.is_none() {
                debug!(key, "no record for removed directory");
                return Ok(());
            }
            remote_delete_tree(ctx, store, key);
            store.remove_dir_recursive(key)?;
            store.unregister_child(key)?;
        }
    }
    Ok(())
}

/// Uploads the current filesystem content of `key` and adopts the version
/// the remote store reports. A stale-version rejection triggers the
/// conflict resolver instead of failing.
pub(crate) fn upload(ctx: &SyncContext, store: &mut MetaStore, key: &str) -> EngineResult<()> {
    let mut record = store
        .load_file(key)?
        .ok_or_else(|| EngineError::MissingMetadata {
            key: key.to_string(),
        })?;

    let endpoints = ctx.endpoints_for(key)?;
    let content = fsops::read_text(&ctx.config.root, key)?;
    let token = ctx.bearer_token()?;
    let envelope = FileEnvelope::new(record.version.clone(), content.clone());

    match ctx.kv.put_file(&endpoints, key, &token, &envelope) {
        Ok(version) => {
            record.set_content(content.clone(), fsops::content_hash(&content));
            record.set_version(version);
            store.store_file(&record)?;
            info!(key, version = record.version.as_str(), "uploaded");
            Ok(())
        }
        Err(KvError::VersionConflict { .. }) => {
            info!(key, "remote version moved on; resolving");
            let remote = ctx.kv.get_file(&endpoints, key, &token)?;
            resolve::resolve_conflict(ctx, store, key, remote)
        }
        Err(err) => Err(err.into()),
    }
}

/// Tombstones a file's KV value and drops it from the namespace.
/// Best-effort: failures are logged and local cleanup proceeds; the next
/// bulk sync reconciles any remote leftovers.
fn remote_delete_file(ctx: &SyncContext, key: &str) {
    let token = match ctx.bearer_token() {
        Ok(token) => token,
        Err(err) => {
            warn!(key, %err, "cannot delete remote copy");
            return;
        }
    };
    match ctx.endpoints_for(key) {
        Ok(endpoints) => {
            if let Err(err) = ctx.kv.delete(&endpoints, key, &token) {
                warn!(key, %err, "tombstone write failed");
            }
        }
        Err(err) => warn!(key, %err, "no endpoints for remote delete"),
    }
    if let Err(err) = ctx.authority.delete(key, &token) {
        warn!(key, %err, "authority delete failed");
    }
}

/// Walks a directory's stored child lists and deletes every remote
/// counterpart, depth first. Read-only against the store.
fn remote_delete_tree(ctx: &SyncContext, store: &MetaStore, key: &str) {
    if let Ok(Some(record)) = store.load_dir(key) {
        for file_key in &record.files {
            remote_delete_file(ctx, file_key);
        }
        for dir_key in &record.directories {
            remote_delete_tree(ctx, store, dir_key);
        }
    }
    match ctx.bearer_token() {
        Ok(token) => {
            if let Err(err) = ctx.authority.delete(key, &token) {
                warn!(key, %err, "authority delete failed");
            }
        }
        Err(err) => warn!(key, %err, "cannot delete remote directory"),
    }
}
