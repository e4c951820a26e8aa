// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use folio_core::FakeClock;
use folio_remote::FakeRemote;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    remote: FakeRemote,
    clock: FakeClock,
    root_id: RemoteId,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let root_id = RemoteId::new("root");
    init_workspace(dir.path(), &WorkspaceConfig::new(root_id.clone())).unwrap();
    Harness { dir, remote: FakeRemote::new("root"), clock: FakeClock::new(), root_id }
}

impl Harness {
    fn engine(&self) -> SyncEngine<FakeRemote, FakeClock> {
        SyncEngine::open(self.dir.path(), self.remote.clone(), self.clock.clone()).unwrap()
    }

    fn write(&self, rel: &str, text: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, text).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).unwrap()
    }

    fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    fn remove(&self, rel: &str) {
        std::fs::remove_file(self.dir.path().join(rel)).unwrap()
    }

    fn mutation_calls(&self) -> Vec<String> {
        self.remote
            .calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create") || c.starts_with("update") || c.starts_with("delete")
            })
            .collect()
    }
}

fn token() -> CancellationToken {
    CancellationToken::new()
}

async fn sync(engine: &mut SyncEngine<FakeRemote, FakeClock>) -> SyncReport {
    engine.run(Mode::Sync, &token()).await.unwrap()
}

// ── Scenario: fresh pull ──────────────────────────────────────────────────

#[tokio::test]
async fn fresh_pull_writes_canonical_file_and_clean_state() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    let report = engine.run(Mode::Pull { force: false }, &token()).await.unwrap();

    assert_eq!(report.synced, vec!["Notes.md"]);
    assert_eq!(h.read("Notes.md"), "hello\n");
    let row = engine.db().get_by_path("Notes.md").unwrap();
    assert_eq!(row.status, SyncStatus::Clean);
    assert_eq!(row.local_hash, Some(ContentHash::of_str("hello\n")));
    assert_eq!(row.local_hash, row.remote_hash);
    assert!(row.remote_mtime.is_some());
}

#[tokio::test]
async fn pull_is_idempotent() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    engine.run(Mode::Pull { force: false }, &token()).await.unwrap();
    let calls_after_first = h.remote.calls().len();

    let second = engine.run(Mode::Pull { force: false }, &token()).await.unwrap();
    assert!(second.synced.is_empty());
    assert!(second.conflicts.is_empty());
    assert!(second.failed.is_empty());
    // Only the tree fetch: content was unchanged, nothing rewritten.
    assert_eq!(h.remote.calls().len(), calls_after_first + 1);
    assert_eq!(h.read("Notes.md"), "hello\n");
}

// ── Scenario: local edit, push ────────────────────────────────────────────

#[tokio::test]
async fn local_edit_then_push_updates_remote_and_state() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "hello world\n");

    let status = engine.status().await.unwrap();
    assert_eq!(status.pending, vec![("Notes.md".to_string(), "push")]);

    let report = engine.run(Mode::Push { force: false }, &token()).await.unwrap();
    assert_eq!(report.synced, vec!["Notes.md"]);
    assert_eq!(h.remote.markdown_of(&id).unwrap(), "hello world\n");
    let row = engine.db().get_by_path("Notes.md").unwrap();
    assert_eq!(row.status, SyncStatus::Clean);
    assert_eq!(row.local_hash, Some(ContentHash::of_str("hello world\n")));
}

#[tokio::test]
async fn push_is_idempotent() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "edited\n");
    engine.run(Mode::Push { force: false }, &token()).await.unwrap();
    let mutations = h.mutation_calls().len();

    let second = engine.run(Mode::Push { force: false }, &token()).await.unwrap();
    assert!(second.synced.is_empty());
    assert_eq!(h.mutation_calls().len(), mutations);
}

#[tokio::test]
async fn completed_sync_then_sync_performs_zero_side_effects() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");
    h.write("Local.md", "local\n");

    let mut engine = h.engine();
    let first = sync(&mut engine).await;
    assert_eq!(first.synced.len(), 2);

    let mutations = h.mutation_calls().len();
    let second = sync(&mut engine).await;
    assert!(second.synced.is_empty());
    assert!(second.failed.is_empty());
    assert_eq!(h.mutation_calls().len(), mutations);
}

// ── Scenario: conflict ────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_edits_conflict_and_keep_local_resolves() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;

    h.write("Notes.md", "local edit\n");
    h.remote.edit(&id, "remote edit");

    let report = sync(&mut engine).await;
    assert_eq!(report.conflicts, vec!["Notes.md"]);
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::Conflict);
    // Neither side was touched.
    assert_eq!(h.read("Notes.md"), "local edit\n");
    assert_eq!(h.remote.markdown_of(&id).unwrap(), "remote edit");

    engine.resolve("Notes.md", Resolution::KeepLocal).await.unwrap();
    let after = sync(&mut engine).await;
    assert!(after.conflicts.is_empty());
    assert_eq!(h.remote.markdown_of(&id).unwrap(), "local edit\n");
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::Clean);
}

#[tokio::test]
async fn conflict_is_sticky_across_runs_and_forces() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "local edit\n");
    h.remote.edit(&id, "remote edit");
    sync(&mut engine).await;

    for mode in [Mode::Sync, Mode::Pull { force: true }, Mode::Push { force: true }] {
        let report = engine.run(mode, &token()).await.unwrap();
        assert_eq!(report.conflicts, vec!["Notes.md"]);
        assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::Conflict);
    }
    assert_eq!(h.read("Notes.md"), "local edit\n");
    assert_eq!(h.remote.markdown_of(&id).unwrap(), "remote edit");
}

#[tokio::test]
async fn conflict_outlives_both_sides_until_resolved() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "local edit\n");
    h.remote.edit(&id, "remote edit");
    sync(&mut engine).await;

    // The document disappears from both sides; the row must stay put.
    h.remove("Notes.md");
    h.remote.remove(&id);
    let report = sync(&mut engine).await;
    assert_eq!(report.conflicts, vec!["Notes.md"]);
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::Conflict);

    // Only an explicit resolution clears it, whichever is named.
    engine.resolve("Notes.md", Resolution::KeepLocal).await.unwrap();
    assert!(engine.db().get_by_path("Notes.md").is_none());
    let after = sync(&mut engine).await;
    assert!(after.conflicts.is_empty());
}

#[tokio::test]
async fn keep_remote_overwrites_local() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "local edit\n");
    h.remote.edit(&id, "remote edit");
    sync(&mut engine).await;

    engine.resolve("Notes.md", Resolution::KeepRemote).await.unwrap();
    assert_eq!(h.read("Notes.md"), "remote edit\n");
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::Clean);

    let after = sync(&mut engine).await;
    assert!(after.conflicts.is_empty());
    assert_eq!(h.remote.markdown_of(&id).unwrap(), "remote edit");
}

#[tokio::test]
async fn keep_both_renames_local_copy_aside() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "local edit\n");
    h.remote.edit(&id, "remote edit");
    sync(&mut engine).await;

    // FakeClock starts at epoch 1_000_000 ms.
    engine.resolve("Notes.md", Resolution::KeepBoth).await.unwrap();
    assert_eq!(h.read("Notes.md"), "remote edit\n");
    assert_eq!(h.read("Notes.conflict.1000.md"), "local edit\n");

    // The copy becomes a new local entry on the next run.
    let report = sync(&mut engine).await;
    assert!(report.synced.contains(&"Notes.conflict.1000.md".to_string()));
    assert_eq!(h.remote.live_count(), 2);
}

#[tokio::test]
async fn resolve_requires_a_conflict() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");
    let mut engine = h.engine();
    sync(&mut engine).await;

    let err = engine.resolve("Notes.md", Resolution::KeepLocal).await.unwrap_err();
    assert!(matches!(err, EngineError::NotInConflict(_)));
    let err = engine.resolve("Missing.md", Resolution::KeepLocal).await.unwrap_err();
    assert!(matches!(err, EngineError::NoSuchEntry(_)));
}

// ── Deletions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_deletion_with_local_edit_keeps_the_file() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "local edit\n");
    h.remote.remove(&id);

    let report = sync(&mut engine).await;
    assert_eq!(report.flagged, vec!["Notes.md"]);
    assert!(h.exists("Notes.md"));
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::DeletedRemote);
}

#[tokio::test]
async fn clean_remote_deletion_removes_local_file_and_state() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.remote.remove(&id);

    let report = sync(&mut engine).await;
    assert_eq!(report.synced, vec!["Notes.md"]);
    assert!(!h.exists("Notes.md"));
    assert!(engine.db().get_by_path("Notes.md").is_none());
}

#[tokio::test]
async fn clean_local_deletion_archives_remote() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.remove("Notes.md");

    let report = sync(&mut engine).await;
    assert_eq!(report.synced, vec!["Notes.md"]);
    assert!(h.remote.is_archived(&id));
    assert!(engine.db().get_by_path("Notes.md").is_none());
}

#[tokio::test]
async fn local_deletion_with_remote_edit_keeps_the_remote() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.remove("Notes.md");
    h.remote.edit(&id, "remote edit");

    let report = sync(&mut engine).await;
    assert_eq!(report.flagged, vec!["Notes.md"]);
    assert!(!h.remote.is_archived(&id));
    assert_eq!(engine.db().get_by_path("Notes.md").unwrap().status, SyncStatus::DeletedLocal);
}

// ── Scenario: parent-first creation ───────────────────────────────────────

#[tokio::test]
async fn push_creates_parent_before_child() {
    let h = harness();
    h.write("Projects/_index.md", "projects\n");
    h.write("Projects/Alpha.md", "alpha\n");

    let mut engine = h.engine();
    let report = engine.run(Mode::Push { force: false }, &token()).await.unwrap();
    assert_eq!(report.synced, vec!["Projects", "Projects/Alpha.md"]);

    let creates: Vec<String> =
        h.remote.calls().into_iter().filter(|c| c.starts_with("create")).collect();
    assert_eq!(creates, vec!["create Projects", "create Alpha"]);

    let parent = engine.db().get_by_path("Projects").unwrap().remote_id.clone();
    let child = engine.db().get_by_path("Projects/Alpha.md").unwrap();
    assert_eq!(h.remote.parent_of(&child.remote_id), Some(parent.clone()));
    assert_eq!(child.parent_remote_id, Some(parent));
}

// ── Round trip and adoption ───────────────────────────────────────────────

#[tokio::test]
async fn round_trip_survives_state_loss_without_duplicating() {
    let h = harness();
    h.write("Doc.md", "# Title\n\ntext\n");

    {
        let mut engine = h.engine();
        sync(&mut engine).await;
        assert_eq!(h.remote.live_count(), 1);
    }

    // Lose the state database; the file and the remote remain.
    std::fs::remove_file(h.dir.path().join(".folio/state")).unwrap();

    let mut engine = h.engine();
    let report = sync(&mut engine).await;
    assert!(report.failed.is_empty());

    // Re-adopted, not re-created: same bytes, one remote document.
    assert_eq!(h.read("Doc.md"), "# Title\n\ntext\n");
    assert_eq!(h.remote.live_count(), 1);
    assert_eq!(
        h.remote.calls().iter().filter(|c| c.starts_with("create")).count(),
        1
    );
    let row = engine.db().get_by_path("Doc.md").unwrap();
    assert_eq!(row.status, SyncStatus::Clean);
}

// ── Database entries ──────────────────────────────────────────────────────

#[tokio::test]
async fn database_pull_materializes_schema_and_frontmatter() {
    let h = harness();
    let db_id = h.remote.seed_database(&h.root_id, "Tasks", "title: text");
    let mut props = std::collections::BTreeMap::new();
    props.insert("done".to_string(), serde_yaml::Value::Bool(false));
    h.remote.seed_entry(&db_id, "Buy milk", "body", props);

    let mut engine = h.engine();
    let report = sync(&mut engine).await;
    assert_eq!(report.synced.len(), 2);

    assert_eq!(h.read("Tasks/_schema"), "title: text\n");
    assert_eq!(h.read("Tasks/Buy milk.md"), "---\ndone: false\n---\n\nbody\n");
    assert_eq!(engine.db().get_by_path("Tasks").unwrap().kind, EntryKind::Database);
    assert_eq!(
        engine.db().get_by_path("Tasks/Buy milk.md").unwrap().kind,
        EntryKind::DatabaseEntry
    );
}

// ── Sticky conversion errors ──────────────────────────────────────────────

#[tokio::test]
async fn broken_frontmatter_is_sticky_until_the_file_changes() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    h.write("Notes.md", "---\nstatus: Done\nnever closed\n");

    let first = sync(&mut engine).await;
    assert_eq!(first.failed.len(), 1);
    assert!(first.failed[0].message.contains("never closed") || first.failed[0].message.contains("frontmatter"));
    let row = engine.db().get_by_path("Notes.md").unwrap();
    assert!(row.error_message.is_some());

    // Skipped while the bytes are unchanged: no further remote mutations.
    let mutations = h.mutation_calls().len();
    let second = sync(&mut engine).await;
    assert_eq!(second.failed.len(), 1);
    assert_eq!(h.mutation_calls().len(), mutations);

    // Fixing the file clears the error and pushes.
    h.write("Notes.md", "---\nstatus: Done\n---\n\nfixed\n");
    let third = sync(&mut engine).await;
    assert_eq!(third.synced, vec!["Notes.md"]);
    assert!(engine.db().get_by_path("Notes.md").unwrap().error_message.is_none());
}

// ── Cancellation and locking ──────────────────────────────────────────────

#[tokio::test]
async fn cancelled_run_stops_between_entries() {
    let h = harness();
    h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    let cancel = token();
    cancel.cancel();
    let report = engine.run(Mode::Sync, &cancel).await.unwrap();
    assert!(report.cancelled);
    assert!(report.synced.is_empty());
    assert!(!h.exists("Notes.md"));
}

#[tokio::test]
async fn second_engine_on_same_workspace_is_refused() {
    let h = harness();
    let _engine = h.engine();
    let second = SyncEngine::open(h.dir.path(), h.remote.clone(), h.clock.clone());
    assert!(matches!(second, Err(EngineError::Lock(_))));
}

// ── Remote poll ───────────────────────────────────────────────────────────

#[tokio::test]
async fn remote_changed_tracks_new_edits_and_deletions() {
    let h = harness();
    let id = h.remote.seed_page(&h.root_id, "Notes", "hello");

    let mut engine = h.engine();
    sync(&mut engine).await;
    assert!(!engine.remote_changed().await.unwrap());

    h.remote.edit(&id, "newer");
    assert!(engine.remote_changed().await.unwrap());
    sync(&mut engine).await;
    assert!(!engine.remote_changed().await.unwrap());

    h.remote.remove(&id);
    assert!(engine.remote_changed().await.unwrap());
}
