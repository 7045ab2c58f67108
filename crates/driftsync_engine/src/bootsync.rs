//! Initial bulk synchronization.
//!
//! Three passes run at startup, before the event consumers loop:
//!
//! 1. *local scan* - walk the watched tree, create missing records,
//!    rebuild every directory's child lists, and prune records whose
//!    filesystem entry vanished while the client was down;
//! 2. *local to remote* - create and upload anything the remote namespace
//!    lacks;
//! 3. *remote to local* - fetch anything the local tree lacks, and run
//!    divergent files through the conflict resolver.

use crate::context::SyncContext;
use crate::error::EngineResult;
use crate::fsops;
use crate::local;
use crate::remote;
use crate::resolve;
use driftsync_proto::is_directory_key;
use driftsync_store::{DirectoryRecord, FileRecord, MetaStore};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Summary of a completed bulk-sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSyncReport {
    /// Records created for files found on disk.
    pub files_indexed: usize,
    /// Stale records pruned during the local scan.
    pub records_pruned: usize,
    /// Files pushed to the remote store.
    pub files_uploaded: usize,
    /// Files fetched from the remote store.
    pub files_downloaded: usize,
}

/// Runs all three passes. Pass-level failures are logged and the next
/// pass still runs; per-entry failures are logged and skipped.
pub fn run(ctx: &SyncContext) -> EngineResult<BulkSyncReport> {
    let mut report = BulkSyncReport::default();
    let mut store = ctx.store.lock();

    info!("bulk sync: scanning local tree");
    let root = ctx.config.root.clone();
    scan_dir(ctx, &mut store, &root, "", &mut report)?;

    info!("bulk sync: pushing local-only entries");
    if let Err(err) = push_dir(ctx, &mut store, "", &mut report) {
        warn!(%err, "local-to-remote pass aborted");
    }

    info!("bulk sync: pulling remote-only entries");
    if let Err(err) = pull_dir(ctx, &mut store, "", &mut report) {
        warn!(%err, "remote-to-local pass aborted");
    }

    info!(
        indexed = report.files_indexed,
        pruned = report.records_pruned,
        uploaded = report.files_uploaded,
        downloaded = report.files_downloaded,
        "bulk sync finished"
    );
    Ok(report)
}

/// Depth-first walk of one directory: records for what exists, pruning
/// for what does not.
fn scan_dir(
    ctx: &SyncContext,
    store: &mut MetaStore,
    dir_path: &Path,
    dir_key: &str,
    report: &mut BulkSyncReport,
) -> EngineResult<()> {
    let mut files = BTreeSet::new();
    let mut dirs = BTreeSet::new();

    for entry in fs::read_dir(dir_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Dot entries hold client state, never synchronized data.
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            let child_key = format!("{dir_key}{name}/");
            dirs.insert(child_key.clone());
            scan_dir(ctx, store, &entry.path(), &child_key, report)?;
        } else if ctx.config.is_watched_name(&name) {
            let child_key = format!("{dir_key}{name}");
            if store.load_file(&child_key)?.is_none() {
                store.store_file(&FileRecord::new(&child_key))?;
                report.files_indexed += 1;
            }
            files.insert(child_key);
        }
    }

    // The root has no record of its own; every other level rebuilds its
    // child lists from what the walk observed.
    if !dir_key.is_empty() {
        let mut record = store
            .load_dir(dir_key)?
            .unwrap_or_else(|| DirectoryRecord::new(dir_key));
        record.files = files.clone();
        record.directories = dirs.clone();
        store.store_dir(&record)?;
    }

    for stale in store.prefix_scan(dir_key)? {
        if files.contains(&stale) || dirs.contains(&stale) {
            continue;
        }
        info!(key = stale.as_str(), "pruning record without filesystem entry");
        if is_directory_key(&stale) {
            store.remove_dir_recursive(&stale)?;
        } else {
            store.remove_file(&stale)?;
        }
        report.records_pruned += 1;
    }
    Ok(())
}

/// Splits the immediate children of `dir_key` into files and directories.
fn local_children(
    store: &MetaStore,
    dir_key: &str,
) -> EngineResult<(BTreeSet<String>, BTreeSet<String>)> {
    let mut files = BTreeSet::new();
    let mut dirs = BTreeSet::new();
    for child in store.prefix_scan(dir_key)? {
        if is_directory_key(&child) {
            dirs.insert(child);
        } else {
            files.insert(child);
        }
    }
    Ok((files, dirs))
}

/// Pushes entries the remote namespace lacks, recursing into shared
/// subdirectories.
fn push_dir(
    ctx: &SyncContext,
    store: &mut MetaStore,
    dir_key: &str,
    report: &mut BulkSyncReport,
) -> EngineResult<()> {
    let token = ctx.bearer_token()?;
    let listing = ctx.authority.list_directory(dir_key, &token)?;
    let remote_files: BTreeSet<String> = listing.files.into_iter().collect();
    let remote_dirs: BTreeSet<String> = listing.subdirectories.into_iter().collect();
    let (local_files, local_dirs) = local_children(store, dir_key)?;

    for file_key in local_files.difference(&remote_files) {
        info!(key = file_key.as_str(), "pushing file missing remotely");
        if let Err(err) = ctx
            .authority
            .create_file(file_key, &token)
            .map_err(crate::error::EngineError::from)
            .and_then(|()| local::upload(ctx, store, file_key))
        {
            warn!(key = file_key.as_str(), %err, "push failed; skipping");
        } else {
            report.files_uploaded += 1;
        }
    }

    for dir in &local_dirs {
        if remote_dirs.contains(dir) {
            push_dir(ctx, store, dir, report)?;
        } else {
            send_dir_recursively(ctx, store, dir, report)?;
        }
    }
    Ok(())
}

/// Creates a whole local-only subtree remotely.
fn send_dir_recursively(
    ctx: &SyncContext,
    store: &mut MetaStore,
    dir_key: &str,
    report: &mut BulkSyncReport,
) -> EngineResult<()> {
    let token = ctx.bearer_token()?;
    if let Err(err) = ctx.authority.create_directory(dir_key, &token) {
        warn!(key = dir_key, %err, "remote directory create failed");
        return Ok(());
    }
    let (files, dirs) = local_children(store, dir_key)?;
    for file_key in &files {
        if let Err(err) = ctx
            .authority
            .create_file(file_key, &token)
            .map_err(crate::error::EngineError::from)
            .and_then(|()| local::upload(ctx, store, file_key))
        {
            warn!(key = file_key.as_str(), %err, "push failed; skipping");
        } else {
            report.files_uploaded += 1;
        }
    }
    for dir in &dirs {
        send_dir_recursively(ctx, store, dir, report)?;
    }
    Ok(())
}

/// Fetches entries the local tree lacks, recursing into shared
/// subdirectories; files present on both sides reconcile by hash.
fn pull_dir(
    ctx: &SyncContext,
    store: &mut MetaStore,
    dir_key: &str,
    report: &mut BulkSyncReport,
) -> EngineResult<()> {
    let token = ctx.bearer_token()?;
    let listing = ctx.authority.list_directory(dir_key, &token)?;
    let (local_files, local_dirs) = local_children(store, dir_key)?;

    for file_key in &listing.files {
        let result = if local_files.contains(file_key) {
            reconcile_shared_file(ctx, store, file_key)
        } else {
            info!(key = file_key.as_str(), "fetching file missing locally");
            remote::fetch_and_materialize(ctx, store, file_key).map(|()| {
                report.files_downloaded += 1;
            })
        };
        if let Err(err) = result {
            warn!(key = file_key.as_str(), %err, "pull failed; skipping");
        }
    }

    for dir in &listing.subdirectories {
        if !local_dirs.contains(dir) {
            info!(key = dir.as_str(), "materializing directory missing locally");
            fsops::ensure_dir(&ctx.config.root, dir)?;
            store.store_dir(&DirectoryRecord::new(dir))?;
            store.register_child(dir)?;
        }
        pull_dir(ctx, store, dir, report)?;
    }
    Ok(())
}

/// A file both sides know: identical hashes only refresh the version,
/// divergent hashes go through the conflict resolver.
fn reconcile_shared_file(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
) -> EngineResult<()> {
    let Some(mut record) = store.load_file(key)? else {
        return remote::fetch_and_materialize(ctx, store, key);
    };
    let endpoints = ctx.endpoints_for(key)?;
    let token = ctx.bearer_token()?;
    let envelope = ctx.kv.get_file(&endpoints, key, &token)?;

    if fsops::content_hash(&envelope.data) == record.content_hash {
        if record.version != envelope.version_number {
            record.set_version(envelope.version_number);
            store.store_file(&record)?;
        }
        return Ok(());
    }
    resolve::resolve_conflict(ctx, store, key, envelope)
}
