//! Conflict resolution: automatic merge with a remote-wins fallback.

use crate::context::SyncContext;
use crate::error::{EngineError, EngineResult};
use crate::fsops;
use crate::local;
use driftsync_merge::{conflict_key, merge3, MergeOutcome};
use driftsync_proto::FileEnvelope;
use driftsync_store::{FileRecord, MetaStore};
use tracing::{info, warn};

/// Reconciles a file whose local and remote contents diverged.
///
/// The record's cached content is the last state both sides agreed on and
/// serves as the merge ancestor. A successful merge becomes canonical:
/// written to the filesystem, uploaded, and recorded with the version the
/// store reports. On a failed merge the remote version wins; the local
/// content is preserved as a device-tagged conflict copy that is
/// registered, announced, and uploaded as a brand-new file, and a
/// best-effort notification is attempted.
pub(crate) fn resolve_conflict(
    ctx: &SyncContext,
    store: &mut MetaStore,
    key: &str,
    remote: FileEnvelope,
) -> EngineResult<()> {
    let mut record = store
        .load_file(key)?
        .ok_or_else(|| EngineError::MissingMetadata {
            key: key.to_string(),
        })?;
    let local_content = fsops::read_text(&ctx.config.root, key)?;

    match merge3(&record.content, &local_content, &remote.data) {
        MergeOutcome::Merged(merged) => {
            fsops::write_text(&ctx.config.root, key, &merged)?;

            let endpoints = ctx.endpoints_for(key)?;
            let token = ctx.bearer_token()?;
            let envelope = FileEnvelope::new(remote.version_number.clone(), merged.clone());
            let version = ctx.kv.put_file(&endpoints, key, &token, &envelope)?;

            let merged_hash = fsops::content_hash(&merged);
            record.set_content(merged, merged_hash);
            record.set_version(version);
            store.store_file(&record)?;
            info!(key, "merged concurrent edits");
            Ok(())
        }
        MergeOutcome::Conflict => {
            // Remote wins the canonical path.
            fsops::write_text(&ctx.config.root, key, &remote.data)?;
            record.set_content(remote.data.clone(), fsops::content_hash(&remote.data));
            record.set_version(remote.version_number.clone());
            store.store_file(&record)?;

            // The local edit survives as an independent new file.
            let copy_key = conflict_key(key, &ctx.config.device_id);
            fsops::write_text(&ctx.config.root, &copy_key, &local_content)?;
            store.store_file(&FileRecord::new(&copy_key))?;
            store.register_child(&copy_key)?;

            let token = ctx.bearer_token()?;
            ctx.authority.create_file(&copy_key, &token)?;
            local::upload(ctx, store, &copy_key)?;

            info!(key, copy = copy_key.as_str(), "kept remote version, saved conflict copy");
            if let Err(err) = ctx.notifier.notify(
                "Sync conflict",
                &format!("Conflicting edits to {key}; your version was saved as {copy_key}"),
            ) {
                warn!(key, %err, "conflict notification failed");
            }
            Ok(())
        }
    }
}
