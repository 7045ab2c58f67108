//! Adapter from filesystem notifications to change events.
//!
//! Translates `notify` events into [`ChangeEvent`]s and pushes them into
//! the engine's change queue. Only text files matching the extension
//! policy are forwarded; directories always are. For entries that no
//! longer exist (deletes, rename sources) the entity kind is inferred from
//! the name, since the filesystem can no longer be asked.

use driftsync_engine::{path_to_key, ChangeQueue, EngineConfig};
use driftsync_proto::{ChangeEvent, EntityKind, EventKind};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind as FsEventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watches `root` recursively and feeds the queue until the watch backend
/// fails. Blocks the calling thread.
pub fn watch(root: &Path, config: &EngineConfig, queue: Arc<ChangeQueue>) -> notify::Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "watching for changes");

    for result in rx {
        match result {
            Ok(event) => forward(root, config, &queue, &event),
            Err(err) => warn!(%err, "watch backend error"),
        }
    }
    Ok(())
}

fn forward(root: &Path, config: &EngineConfig, queue: &ChangeQueue, event: &notify::Event) {
    match &event.kind {
        FsEventKind::Create(_) => {
            for path in &event.paths {
                push(root, config, queue, EventKind::Created, path);
            }
        }
        FsEventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                for path in &event.paths {
                    push(root, config, queue, EventKind::MovedFrom, path);
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    push(root, config, queue, EventKind::MovedTo, path);
                }
            }
            RenameMode::Both => {
                if let [from, to] = event.paths.as_slice() {
                    push(root, config, queue, EventKind::MovedFrom, from);
                    push(root, config, queue, EventKind::MovedTo, to);
                }
            }
            _ => {
                for path in &event.paths {
                    push(root, config, queue, EventKind::MovedFrom, path);
                }
            }
        },
        FsEventKind::Modify(_) => {
            for path in &event.paths {
                push(root, config, queue, EventKind::Modified, path);
            }
        }
        FsEventKind::Remove(_) => {
            for path in &event.paths {
                push(root, config, queue, EventKind::Deleted, path);
            }
        }
        other => debug!(kind = ?other, "dropping unhandled notification"),
    }
}

fn push(root: &Path, config: &EngineConfig, queue: &ChangeQueue, kind: EventKind, path: &Path) {
    let Some(entity) = classify(config, path) else {
        return;
    };
    let Some(key) = path_to_key(root, path, entity == EntityKind::Directory) else {
        return;
    };
    debug!(%kind, key = key.as_str(), "queueing change");
    queue.push(ChangeEvent::new(kind, key, entity));
}

/// Classifies a path, or filters it out entirely.
///
/// Hidden entries and files outside the extension policy return `None`.
/// For entries that no longer exist the name decides: a watched extension
/// means it was a file, anything else is treated as a directory.
fn classify(config: &EngineConfig, path: &Path) -> Option<EntityKind> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    if name.starts_with('.') {
        return None;
    }
    if path.is_dir() {
        return Some(EntityKind::Directory);
    }
    let watched = config.is_watched_name(&name);
    if path.is_file() {
        return watched.then_some(EntityKind::File);
    }
    if watched {
        Some(EntityKind::File)
    } else {
        Some(EntityKind::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config(root: &Path) -> EngineConfig {
        EngineConfig::new(root, "dev")
    }

    #[test]
    fn vanished_paths_classify_by_extension() {
        let root = tempdir().unwrap();
        let config = config(root.path());
        assert_eq!(
            classify(&config, &root.path().join("gone.txt")),
            Some(EntityKind::File)
        );
        assert_eq!(
            classify(&config, &root.path().join("gone-dir")),
            Some(EntityKind::Directory)
        );
    }

    #[test]
    fn unwatched_files_are_filtered() {
        let root = tempdir().unwrap();
        let config = config(root.path());
        fs::write(root.path().join("image.png"), b"png").unwrap();
        fs::write(root.path().join("notes.txt"), b"text").unwrap();

        let queue = Arc::new(ChangeQueue::new());
        push(
            root.path(),
            &config,
            &queue,
            EventKind::Created,
            &root.path().join("image.png"),
        );
        assert!(queue.is_empty());

        push(
            root.path(),
            &config,
            &queue,
            EventKind::Created,
            &root.path().join("notes.txt"),
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn hidden_entries_are_filtered() {
        let root = tempdir().unwrap();
        let config = config(root.path());
        assert_eq!(classify(&config, &root.path().join(".state.txt")), None);
    }

    #[test]
    fn existing_directories_are_forwarded() {
        let root = tempdir().unwrap();
        let config = config(root.path());
        fs::create_dir(root.path().join("docs")).unwrap();

        let queue = Arc::new(ChangeQueue::new());
        push(
            root.path(),
            &config,
            &queue,
            EventKind::Created,
            &root.path().join("docs"),
        );
        assert_eq!(queue.len(), 1);
    }
}
