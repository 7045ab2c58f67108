//! End-to-end reconciliation flows against in-process collaborators.

use driftsync_engine::{
    content_hash, Batcher, EngineConfig, Notifier, RemoteConsumer, StaticToken, SyncContext,
    SyncEngine,
};
use driftsync_kv::KvClient;
use driftsync_proto::{
    ChangeEvent, EntityKind, EventKind, FileEnvelope, RemoteEvent, RemoteEventKind, TOMBSTONE,
};
use driftsync_store::{FileRecord, MetaStore};
use driftsync_testkit::{InMemoryKv, MemoryAuthority, TempTree};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEVICE: &str = "dev-local01";
const OTHER_DEVICE: &str = "dev-other99";

#[derive(Default)]
struct CollectingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl CollectingNotifier {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), String> {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

struct Harness {
    tree: TempTree,
    authority: Arc<MemoryAuthority>,
    kv_store: Arc<InMemoryKv>,
    notices: Arc<CollectingNotifier>,
    engine: SyncEngine,
}

impl Harness {
    fn new() -> Self {
        let tree = TempTree::new();
        let authority = Arc::new(MemoryAuthority::new());
        authority.set_default_endpoints(vec!["kv-1".to_string()]);
        let kv_store = Arc::new(InMemoryKv::new());
        let notices = Arc::new(CollectingNotifier::default());

        let config = EngineConfig::new(tree.path(), DEVICE)
            .with_batch_threshold(1)
            .with_batch_wait(Duration::from_millis(20));
        let ctx = SyncContext::new(
            config,
            MetaStore::in_memory(),
            KvClient::new(Box::new(Arc::clone(&kv_store)), DEVICE),
            Box::new(Arc::clone(&authority)),
            Box::new(Arc::clone(&notices)),
            Box::new(StaticToken::new("tok")),
        );

        Self {
            tree,
            authority,
            kv_store,
            notices,
            engine: SyncEngine::new(ctx),
        }
    }

    fn local(&self, kind: EventKind, key: &str, entity: EntityKind) {
        let batcher = Batcher::new(self.engine.context(), self.engine.changes());
        batcher.dispatch(&ChangeEvent::new(kind, key, entity));
    }

    fn remote(&self, event: RemoteEvent) {
        let consumer = RemoteConsumer::new(self.engine.context(), self.engine.remote_events());
        consumer.dispatch(&event);
    }

    fn file_record(&self, key: &str) -> Option<FileRecord> {
        self.engine.context().store.lock().load_file(key).unwrap()
    }
}

#[test]
fn local_create_uploads_and_registers() {
    let h = Harness::new();
    h.tree.write("docs/a.txt", "hello\n");
    h.local(EventKind::Created, "docs/a.txt", EntityKind::File);

    let record = h.file_record("docs/a.txt").expect("record stored");
    assert_eq!(record.version, "1");
    assert_eq!(record.content, "hello\n");
    assert_eq!(record.content_hash, content_hash("hello\n"));

    let envelope = h.kv_store.envelope("docs/a.txt").expect("uploaded");
    assert_eq!(envelope.version_number, "1");
    assert_eq!(envelope.data, "hello\n");

    assert!(h.authority.has_file("docs/a.txt"));
    let ctx = h.engine.context();
    let store = ctx.store.lock();
    let parent = store.load_dir("docs/").unwrap().expect("parent record");
    assert!(parent.files.contains("docs/a.txt"));
}

#[test]
fn replayed_create_is_idempotent() {
    let h = Harness::new();
    h.tree.write("i.txt", "x\n");
    h.local(EventKind::Created, "i.txt", EntityKind::File);
    h.local(EventKind::Created, "i.txt", EntityKind::File);

    assert_eq!(h.kv_store.put_count("i.txt"), 1);
    assert_eq!(h.authority.created_files(), vec!["i.txt"]);
    assert_eq!(h.file_record("i.txt").unwrap().version, "1");
}

#[test]
fn unchanged_save_is_suppressed() {
    let h = Harness::new();
    h.tree.write("n.txt", "same\n");
    h.local(EventKind::Created, "n.txt", EntityKind::File);
    assert_eq!(h.kv_store.put_count("n.txt"), 1);

    // The editor saved without changing anything.
    h.tree.write("n.txt", "same\n");
    h.local(EventKind::Modified, "n.txt", EntityKind::File);
    assert_eq!(h.kv_store.put_count("n.txt"), 1);
}

#[test]
fn versions_count_successful_uploads() {
    let h = Harness::new();
    h.tree.write("v.txt", "round 1\n");
    h.local(EventKind::Created, "v.txt", EntityKind::File);

    for round in 2..=5 {
        h.tree.write("v.txt", &format!("round {round}\n"));
        h.local(EventKind::Modified, "v.txt", EntityKind::File);
    }

    assert_eq!(h.file_record("v.txt").unwrap().version, "5");
    assert_eq!(h.kv_store.envelope("v.txt").unwrap().version_number, "5");
}

#[test]
fn concurrent_disjoint_edits_merge() {
    let h = Harness::new();
    h.tree.write("m.txt", "A\nB\n");
    h.local(EventKind::Created, "m.txt", EntityKind::File);

    // Another device changed the first line and committed version 2.
    h.kv_store
        .set_raw("m.txt", FileEnvelope::new("2", "Z\nB\n").to_wire());

    // We appended a line; our upload is now stale.
    h.tree.write("m.txt", "A\nB\nLOCAL\n");
    h.local(EventKind::Modified, "m.txt", EntityKind::File);

    assert_eq!(h.tree.read("m.txt"), "Z\nB\nLOCAL\n");
    let record = h.file_record("m.txt").unwrap();
    assert_eq!(record.version, "3");
    assert_eq!(record.content, "Z\nB\nLOCAL\n");
    assert_eq!(h.kv_store.envelope("m.txt").unwrap().data, "Z\nB\nLOCAL\n");
    assert_eq!(h.notices.count(), 0);
}

#[test]
fn overlapping_edits_keep_remote_and_save_conflict_copy() {
    let h = Harness::new();
    h.tree.write("c.txt", "A\nB\n");
    h.local(EventKind::Created, "c.txt", EntityKind::File);

    h.kv_store
        .set_raw("c.txt", FileEnvelope::new("2", "A\nR\n").to_wire());
    h.tree.write("c.txt", "A\nL\n");
    h.local(EventKind::Modified, "c.txt", EntityKind::File);

    // Remote wins the canonical file.
    assert_eq!(h.tree.read("c.txt"), "A\nR\n");
    let record = h.file_record("c.txt").unwrap();
    assert_eq!(record.version, "2");
    assert_eq!(record.content, "A\nR\n");

    // The local edit survives as a new tracked, uploaded file.
    let copy_key = "c.conflict-dev-loca.txt";
    assert_eq!(h.tree.read(copy_key), "A\nL\n");
    let copy = h.file_record(copy_key).expect("conflict copy record");
    assert_eq!(copy.version, "1");
    assert_eq!(h.kv_store.envelope(copy_key).unwrap().data, "A\nL\n");
    assert!(h.authority.created_files().contains(&copy_key.to_string()));

    assert_eq!(h.notices.count(), 1);
}

#[test]
fn remote_create_materializes_file() {
    let h = Harness::new();
    h.kv_store
        .set_raw("docs/new.txt", FileEnvelope::new("3", "remote\n").to_wire());

    h.remote(
        RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::FileCreated, "docs/new.txt")
            .with_hash(content_hash("remote\n")),
    );

    assert_eq!(h.tree.read("docs/new.txt"), "remote\n");
    let record = h.file_record("docs/new.txt").unwrap();
    assert_eq!(record.version, "3");

    let ctx = h.engine.context();
    let store = ctx.store.lock();
    let parent = store.load_dir("docs/").unwrap().unwrap();
    assert!(parent.files.contains("docs/new.txt"));
}

#[test]
fn own_device_echo_is_ignored() {
    let h = Harness::new();
    h.kv_store
        .set_raw("echo.txt", FileEnvelope::new("1", "x\n").to_wire());

    h.remote(RemoteEvent::new(DEVICE, RemoteEventKind::FileCreated, "echo.txt"));

    assert!(!h.tree.exists("echo.txt"));
    assert!(h.file_record("echo.txt").is_none());
}

#[test]
fn matching_hash_refreshes_metadata_only() {
    let h = Harness::new();
    h.tree.write("s.txt", "same\n");
    h.local(EventKind::Created, "s.txt", EntityKind::File);

    // Another device re-uploaded identical content at version 4.
    h.kv_store
        .set_raw("s.txt", FileEnvelope::new("4", "same\n").to_wire());
    h.remote(
        RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::FileModified, "s.txt")
            .with_hash(content_hash("same\n")),
    );

    let record = h.file_record("s.txt").unwrap();
    assert_eq!(record.version, "4");
    assert_eq!(h.tree.read("s.txt"), "same\n");
    assert_eq!(h.notices.count(), 0);
}

#[test]
fn remote_divergent_content_resolves() {
    let h = Harness::new();
    h.tree.write("r.txt", "A\nB\n");
    h.local(EventKind::Created, "r.txt", EntityKind::File);

    // Remote edit touching a line we did not.
    h.kv_store
        .set_raw("r.txt", FileEnvelope::new("2", "A\nB2\n").to_wire());
    h.remote(
        RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::FileModified, "r.txt")
            .with_hash(content_hash("A\nB2\n")),
    );

    // Local side untouched since upload: merge yields the remote content.
    assert_eq!(h.tree.read("r.txt"), "A\nB2\n");
    assert_eq!(h.file_record("r.txt").unwrap().version, "3");
}

#[test]
fn remote_delete_removes_everything() {
    let h = Harness::new();
    h.tree.write("docs/gone.txt", "bye\n");
    h.local(EventKind::Created, "docs/gone.txt", EntityKind::File);

    h.remote(RemoteEvent::new(
        OTHER_DEVICE,
        RemoteEventKind::FileDeleted,
        "docs/gone.txt",
    ));

    assert!(!h.tree.exists("docs/gone.txt"));
    assert!(h.file_record("docs/gone.txt").is_none());
    let ctx = h.engine.context();
    let store = ctx.store.lock();
    let parent = store.load_dir("docs/").unwrap().unwrap();
    assert!(!parent.files.contains("docs/gone.txt"));
}

#[test]
fn remote_directory_created_and_deleted() {
    let h = Harness::new();
    h.remote(RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::DirCreated, "shared/"));
    assert!(h.tree.exists("shared/"));
    {
        let ctx = h.engine.context();
        let store = ctx.store.lock();
        assert!(store.load_dir("shared/").unwrap().is_some());
    }

    h.remote(RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::DirDeleted, "shared/"));
    assert!(!h.tree.exists("shared/"));
    let ctx = h.engine.context();
    let store = ctx.store.lock();
    assert!(store.load_dir("shared/").unwrap().is_none());
}

#[test]
fn local_delete_tombstones_and_unregisters() {
    let h = Harness::new();
    h.tree.write("d.txt", "data\n");
    h.local(EventKind::Created, "d.txt", EntityKind::File);

    h.tree.remove("d.txt");
    h.local(EventKind::Deleted, "d.txt", EntityKind::File);

    assert!(h.file_record("d.txt").is_none());
    assert_eq!(h.kv_store.raw("d.txt").as_deref(), Some(TOMBSTONE));
    assert!(h.authority.deleted().contains(&"d.txt".to_string()));
}

#[test]
fn local_directory_delete_recurses_into_children() {
    let h = Harness::new();
    h.tree.mkdir("docs/");
    h.local(EventKind::Created, "docs/", EntityKind::Directory);
    h.tree.write("docs/x.txt", "x\n");
    h.local(EventKind::Created, "docs/x.txt", EntityKind::File);

    h.tree.remove("docs/");
    h.local(EventKind::Deleted, "docs/", EntityKind::Directory);

    assert!(h.file_record("docs/x.txt").is_none());
    {
        let ctx = h.engine.context();
        let store = ctx.store.lock();
        assert!(store.load_dir("docs/").unwrap().is_none());
    }
    assert_eq!(h.kv_store.raw("docs/x.txt").as_deref(), Some(TOMBSTONE));
    let deleted = h.authority.deleted();
    assert!(deleted.contains(&"docs/x.txt".to_string()));
    assert!(deleted.contains(&"docs/".to_string()));
}

#[test]
fn directory_child_lists_match_stored_keys() {
    let h = Harness::new();
    h.tree.mkdir("docs/");
    h.local(EventKind::Created, "docs/", EntityKind::Directory);
    h.tree.write("docs/a.txt", "a\n");
    h.local(EventKind::Created, "docs/a.txt", EntityKind::File);
    h.tree.write("docs/b.txt", "b\n");
    h.local(EventKind::Created, "docs/b.txt", EntityKind::File);

    h.remote(RemoteEvent::new(
        OTHER_DEVICE,
        RemoteEventKind::FileDeleted,
        "docs/b.txt",
    ));

    let ctx = h.engine.context();
    let store = ctx.store.lock();
    let record = store.load_dir("docs/").unwrap().unwrap();
    let mut listed = record.files.clone();
    listed.extend(record.directories.clone());
    assert_eq!(listed, store.prefix_scan("docs/").unwrap());
}

#[test]
fn bulk_sync_converges_both_directions() {
    let h = Harness::new();

    // Local-only file, remote-only file, and a stale record.
    h.tree.write("local.txt", "local\n");
    h.authority.seed_file("remote.txt");
    h.kv_store
        .set_raw("remote.txt", FileEnvelope::new("2", "remote\n").to_wire());
    h.engine
        .context()
        .store
        .lock()
        .store_file(&FileRecord::new("ghost.txt"))
        .unwrap();

    let report = h.engine.bulk_sync().unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.records_pruned, 1);
    assert_eq!(report.files_uploaded, 1);
    assert_eq!(report.files_downloaded, 1);

    // Local-only content went up.
    assert_eq!(h.kv_store.envelope("local.txt").unwrap().data, "local\n");
    assert!(h.authority.has_file("local.txt"));
    // Remote-only content came down.
    assert_eq!(h.tree.read("remote.txt"), "remote\n");
    assert_eq!(h.file_record("remote.txt").unwrap().version, "2");
    // The stale record is gone.
    assert!(h.file_record("ghost.txt").is_none());
}

#[test]
fn bulk_sync_sends_and_fetches_nested_directories() {
    let h = Harness::new();

    // A local-only subtree and a remote-only subtree.
    h.tree.write("notes/deep/n.txt", "n\n");
    h.authority.seed_dir("shared/");
    h.authority.seed_file("shared/s.txt");
    h.kv_store
        .set_raw("shared/s.txt", FileEnvelope::new("1", "s\n").to_wire());

    h.engine.bulk_sync().unwrap();

    // The local subtree was created remotely, depth first.
    assert!(h.authority.has_dir("notes/"));
    assert!(h.authority.has_dir("notes/deep/"));
    assert!(h.authority.has_file("notes/deep/n.txt"));
    assert_eq!(h.kv_store.envelope("notes/deep/n.txt").unwrap().data, "n\n");

    // The remote subtree came down with records and parent registration.
    assert_eq!(h.tree.read("shared/s.txt"), "s\n");
    assert_eq!(h.file_record("shared/s.txt").unwrap().version, "1");
    let ctx = h.engine.context();
    let store = ctx.store.lock();
    let shared = store.load_dir("shared/").unwrap().expect("dir record");
    assert!(shared.files.contains("shared/s.txt"));
}

#[test]
fn engine_threads_process_and_shut_down() {
    let mut h = Harness::new();
    h.engine.start();
    assert!(h.engine.is_running());

    h.tree.write("live.txt", "threaded\n");
    h.engine.changes().push(ChangeEvent::new(
        EventKind::Created,
        "live.txt",
        EntityKind::File,
    ));
    h.kv_store
        .set_raw("inbound.txt", FileEnvelope::new("1", "in\n").to_wire());
    h.engine.remote_events().push(
        RemoteEvent::new(OTHER_DEVICE, RemoteEventKind::FileCreated, "inbound.txt")
            .with_hash(content_hash("in\n")),
    );

    // Give both consumers a moment; shutdown still drains queued work.
    std::thread::sleep(Duration::from_millis(300));
    h.engine.shutdown();
    assert!(!h.engine.is_running());

    assert_eq!(h.file_record("live.txt").unwrap().version, "1");
    assert_eq!(h.tree.read("inbound.txt"), "in\n");
}
