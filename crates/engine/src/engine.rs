// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: orchestrates one run, executes planned actions, and
//! commits state per entry.
//!
//! Execution discipline: side-effect first, state commit second, one entry
//! at a time. A crash between the two leaves a side-effect the next
//! reconcile rediscovers (hashes match, or the adoption probe finds the
//! orphan remote). Per-entry failures never abort the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use folio_core::config::{INDEX_FILE, META_DIR, SCHEMA_FILE, STATE_FILE};
use folio_core::{
    document, Clock, ConfigError, ContentHash, Document, DocumentError, Entry, EntryKind,
    RemoteId, Resolution, SyncStatus, WorkspaceConfig,
};
use folio_remote::{ContentPatch, NodeKind, RemoteClient, RemoteError};
use folio_store::{LockError, StateDb, StateError, WorkspaceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reconcile::{reconcile, Decision, Mode, Plan, PlannedAction};
use crate::snapshot::{walk_local, LocalDoc, LocalSnapshot, RemoteSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("no synced entry at {0}")]
    NoSuchEntry(String),
    #[error("entry at {0} is not in conflict")]
    NotInConflict(String),
}

/// One entry that failed this run.
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub path: String,
    pub message: String,
}

/// Summary of one run: succeeded, conflicted, failed.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Entries whose side effects and state commits completed.
    pub synced: Vec<String>,
    /// Entries in conflict (newly marked or still unresolved).
    pub conflicts: Vec<String>,
    /// Entries flagged deleted-local / deleted-remote, awaiting attention.
    pub flagged: Vec<String>,
    pub failed: Vec<EntryFailure>,
    /// Run was cancelled between entries.
    pub cancelled: bool,
}

impl SyncReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// `status`: pending per-path actions, no writes.
#[derive(Debug, Default)]
pub struct StatusReport {
    pub pending: Vec<(String, &'static str)>,
}

impl StatusReport {
    fn from_plan(plan: &Plan) -> Self {
        Self {
            pending: plan
                .actions
                .iter()
                .map(|a| (a.path.clone(), a.decision.label()))
                .collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
    }
}

enum Executed {
    Synced,
    Conflict,
    Flagged,
}

/// Create the metadata directory and bind the workspace to a remote root.
pub fn init_workspace(root: &Path, config: &WorkspaceConfig) -> Result<(), EngineError> {
    std::fs::create_dir_all(root.join(META_DIR))?;
    config.save(root)?;
    info!(root = %root.display(), remote_root = %config.remote_root, "workspace initialized");
    Ok(())
}

/// One engine per workspace, enforced by the workspace lock.
pub struct SyncEngine<C: RemoteClient, K: Clock> {
    root: PathBuf,
    config: WorkspaceConfig,
    db: StateDb,
    client: C,
    clock: K,
    _lock: WorkspaceLock,
}

impl<C: RemoteClient, K: Clock> SyncEngine<C, K> {
    pub fn open(root: impl Into<PathBuf>, client: C, clock: K) -> Result<Self, EngineError> {
        let root = root.into();
        let config = WorkspaceConfig::load(&root)?;
        let lock = WorkspaceLock::acquire(&root)?;
        let db = StateDb::open(&root.join(META_DIR).join(STATE_FILE))?;
        Ok(Self { root, config, db, client, clock, _lock: lock })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn db(&self) -> &StateDb {
        &self.db
    }

    async fn snapshots(
        &self,
        mode: Mode,
    ) -> Result<(LocalSnapshot, RemoteSnapshot), EngineError> {
        let local = walk_local(&self.root)?;
        let fetch_all = mode == Mode::Pull { force: true };
        let remote =
            RemoteSnapshot::load(&self.client, &self.config.remote_root, &self.db, fetch_all)
                .await?;
        Ok((local, remote))
    }

    /// Reconcile without executing.
    pub async fn status(&self) -> Result<StatusReport, EngineError> {
        let (local, remote) = self.snapshots(Mode::Sync).await?;
        let plan = reconcile(&local, &remote, &self.db, Mode::Sync);
        Ok(StatusReport::from_plan(&plan))
    }

    /// Run one pull, push, or sync pass.
    pub async fn run(
        &mut self,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, EngineError> {
        let (local, remote) = self.snapshots(mode).await?;
        let plan = reconcile(&local, &remote, &self.db, mode);

        let mut report = SyncReport::default();
        for skip in plan.skips() {
            match skip.decision {
                Decision::SkipConflict => report.conflicts.push(skip.path.clone()),
                Decision::SkipStickyError => {
                    let message = self
                        .db
                        .get_by_path(&skip.path)
                        .and_then(|row| row.error_message.clone())
                        .unwrap_or_else(|| "conversion error".to_string());
                    report.failed.push(EntryFailure { path: skip.path.clone(), message });
                }
                Decision::SkipRemoteError => {
                    let message = skip
                        .remote_id
                        .as_ref()
                        .and_then(|id| remote.error(id))
                        .unwrap_or("remote content unavailable")
                        .to_string();
                    report.failed.push(EntryFailure { path: skip.path.clone(), message });
                }
                _ => {}
            }
        }

        // Remote ids created this run, so children find parents made moments ago.
        let mut created: HashMap<String, RemoteId> = HashMap::new();
        for action in plan.ordered_for(mode) {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.execute(action, &local, &remote, &mut created).await {
                Ok(Executed::Synced) => report.synced.push(action.path.clone()),
                Ok(Executed::Conflict) => report.conflicts.push(action.path.clone()),
                Ok(Executed::Flagged) => report.flagged.push(action.path.clone()),
                Err(message) => {
                    warn!(path = %action.path, %message, "entry failed");
                    report.failed.push(EntryFailure { path: action.path.clone(), message });
                }
            }
        }

        info!(
            synced = report.synced.len(),
            conflicts = report.conflicts.len(),
            flagged = report.flagged.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "run complete"
        );
        Ok(report)
    }

    async fn execute(
        &mut self,
        action: &PlannedAction,
        local: &LocalSnapshot,
        remote: &RemoteSnapshot,
        created: &mut HashMap<String, RemoteId>,
    ) -> Result<Executed, String> {
        debug!(path = %action.path, decision = ?action.decision, "executing");
        match action.decision {
            Decision::MarkConflict(reason) => {
                self.mark_status(&action.path, SyncStatus::Conflict)
                    .map_err(|e| e.to_string())?;
                debug!(path = %action.path, %reason, "conflict");
                Ok(Executed::Conflict)
            }
            Decision::MarkDeletedLocal => {
                self.mark_status(&action.path, SyncStatus::DeletedLocal)
                    .map_err(|e| e.to_string())?;
                Ok(Executed::Flagged)
            }
            Decision::MarkDeletedRemote => {
                self.mark_status(&action.path, SyncStatus::DeletedRemote)
                    .map_err(|e| e.to_string())?;
                Ok(Executed::Flagged)
            }
            Decision::ForgetState => {
                let path = action.path.clone();
                self.db
                    .transaction(|txn| {
                        txn.delete_by_path(&path);
                        Ok(())
                    })
                    .map_err(|e| e.to_string())?;
                Ok(Executed::Synced)
            }
            Decision::Adopt { overwrite_local } => {
                self.pull_entry(&action.path, remote, overwrite_local).map_err(|e| e.to_string())
            }
            Decision::PullCreate | Decision::PullUpdate => {
                self.pull_entry(&action.path, remote, true).map_err(|e| e.to_string())
            }
            Decision::PushUpdate => self.push_update(&action.path, local).await,
            Decision::PushCreate => self.push_create(&action.path, local, remote, created).await,
            Decision::DeleteLocal => self.delete_local(&action.path).map_err(|e| e.to_string()),
            Decision::DeleteRemote => self.delete_remote(&action.path).await,
            Decision::Noop
            | Decision::SkipConflict
            | Decision::SkipStickyError
            | Decision::SkipRemoteError => Ok(Executed::Synced),
        }
    }

    /// Write remote content to the local file, then record clean state.
    fn pull_entry(
        &mut self,
        path: &str,
        remote: &RemoteSnapshot,
        overwrite_local: bool,
    ) -> Result<Executed, EngineError> {
        let doc = remote
            .get(path)
            .ok_or_else(|| EngineError::NoSuchEntry(path.to_string()))?
            .clone();
        let content = remote
            .content(&doc.node.id)
            .ok_or_else(|| EngineError::NoSuchEntry(format!("{path} (content not fetched)")))?
            .clone();

        if overwrite_local {
            self.write_content(path, doc.kind, content.canonical.as_bytes())?;
        }

        let parent_remote_id = self.parent_field(&doc.parent);
        let entry = Entry {
            path: path.to_string(),
            remote_id: doc.node.id.clone(),
            remote_url: doc.node.url.clone(),
            parent_remote_id,
            kind: doc.kind,
            // When not overwriting, the live file already hashed equal.
            local_hash: Some(content.hash),
            remote_hash: Some(content.hash),
            remote_mtime: Some(doc.node.mtime),
            status: SyncStatus::Clean,
            error_hash: None,
            error_message: None,
        };
        self.db.transaction(|txn| txn.upsert(entry))?;
        Ok(Executed::Synced)
    }

    async fn push_update(&mut self, path: &str, local: &LocalSnapshot) -> Result<Executed, String> {
        let doc = local
            .get(path)
            .ok_or_else(|| format!("{path} missing from local snapshot"))?
            .clone();
        let row = self
            .db
            .get_by_path(path)
            .ok_or_else(|| format!("{path} missing from state"))?
            .clone();

        let patch = match self.local_patch(&doc) {
            Ok(patch) => patch,
            Err(e) => return Err(self.record_sticky_error(&row, &doc, e)),
        };
        let canonical_hash = patch_hash(&patch);

        let mtime = self.client.update(&row.remote_id, &patch).await.map_err(|e| e.to_string())?;
        let mut entry = Entry {
            local_hash: Some(doc.hash),
            remote_hash: Some(canonical_hash),
            remote_mtime: Some(mtime),
            status: SyncStatus::Clean,
            ..row
        };
        entry.clear_error();
        self.db.transaction(|txn| txn.upsert(entry)).map_err(|e| e.to_string())?;
        Ok(Executed::Synced)
    }

    async fn push_create(
        &mut self,
        path: &str,
        local: &LocalSnapshot,
        remote: &RemoteSnapshot,
        created: &mut HashMap<String, RemoteId>,
    ) -> Result<Executed, String> {
        let doc = local
            .get(path)
            .ok_or_else(|| format!("{path} missing from local snapshot"))?
            .clone();
        let parent = self.resolve_parent(path, remote, created)?;
        let title = local_title(path, doc.kind);

        let patch = match self.local_patch(&doc) {
            Ok(patch) => patch,
            Err(e) => return Err(format!("{path}: {e}")),
        };
        let canonical_hash = patch_hash(&patch);

        // Adoption probe: an orphan remote from a crashed create must be
        // adopted, never duplicated. Exact title under the exact parent.
        let orphans: Vec<&crate::snapshot::RemoteTreeDoc> = remote
            .docs
            .values()
            .filter(|d| {
                d.parent == parent
                    && d.node.title == title
                    && self.db.get_by_remote_id(&d.node.id).is_none()
            })
            .collect();
        if orphans.len() > 1 {
            return Err(format!(
                "ambiguous adoption: {} remote documents titled {:?} under the same parent",
                orphans.len(),
                title
            ));
        }

        let (remote_id, remote_url, mtime, remote_hash) = match orphans.first() {
            Some(orphan) => {
                let id = orphan.node.id.clone();
                info!(path, remote_id = %id, "adopting orphan remote document");
                let same = remote
                    .content(&id)
                    .is_some_and(|content| content.hash == canonical_hash);
                if same {
                    (id, orphan.node.url.clone(), orphan.node.mtime, canonical_hash)
                } else {
                    let mtime =
                        self.client.update(&id, &patch).await.map_err(|e| e.to_string())?;
                    (id, None, mtime, canonical_hash)
                }
            }
            None => {
                let kind = push_kind(doc.kind);
                let created_doc = self
                    .client
                    .create(&parent, kind, &title, &patch)
                    .await
                    .map_err(|e| e.to_string())?;
                (created_doc.id, created_doc.url, created_doc.mtime, canonical_hash)
            }
        };

        if doc.kind.is_directory() {
            created.insert(path.to_string(), remote_id.clone());
        }
        let entry = Entry {
            path: path.to_string(),
            remote_id,
            remote_url,
            parent_remote_id: self.parent_field(&parent),
            kind: doc.kind,
            local_hash: Some(doc.hash),
            remote_hash: Some(remote_hash),
            remote_mtime: Some(mtime),
            status: SyncStatus::Clean,
            error_hash: None,
            error_message: None,
        };
        self.db.transaction(|txn| txn.upsert(entry)).map_err(|e| e.to_string())?;
        Ok(Executed::Synced)
    }

    fn delete_local(&mut self, path: &str) -> Result<Executed, EngineError> {
        let row = self
            .db
            .get_by_path(path)
            .ok_or_else(|| EngineError::NoSuchEntry(path.to_string()))?
            .clone();
        let file = self.content_file(path, row.kind);
        if file.exists() {
            std::fs::remove_file(&file)?;
        }
        if row.kind.is_directory() {
            // Children were deleted first (deepest-first ordering); a dir
            // still holding stray untracked files is left in place.
            let dir = self.root.join(path);
            if dir.is_dir() && std::fs::remove_dir(&dir).is_err() {
                warn!(path, "directory not empty after remote deletion, keeping it");
            }
        }
        let path = path.to_string();
        self.db.transaction(|txn| {
            txn.delete_by_path(&path);
            Ok(())
        })?;
        Ok(Executed::Synced)
    }

    async fn delete_remote(&mut self, path: &str) -> Result<Executed, String> {
        let row = self
            .db
            .get_by_path(path)
            .ok_or_else(|| format!("{path} missing from state"))?
            .clone();
        self.client.delete(&row.remote_id).await.map_err(|e| e.to_string())?;
        let path = path.to_string();
        self.db
            .transaction(|txn| {
                txn.delete_by_path(&path);
                Ok(())
            })
            .map_err(|e| e.to_string())?;
        Ok(Executed::Synced)
    }

    /// Manual transition out of conflict.
    pub async fn resolve(
        &mut self,
        path: &str,
        resolution: Resolution,
    ) -> Result<(), EngineError> {
        let row = self
            .db
            .get_by_path(path)
            .ok_or_else(|| EngineError::NoSuchEntry(path.to_string()))?
            .clone();
        if !row.is_conflict() {
            return Err(EngineError::NotInConflict(path.to_string()));
        }
        info!(path, resolution = %resolution, "resolving conflict");

        // A conflicted document gone from both sides stays conflicted
        // through sync runs; resolving it just drops the row, whichever
        // resolution was named.
        if !self.content_file(path, row.kind).exists() {
            if let Err(RemoteError::NotFound(_)) = self.client.fetch_content(&row.remote_id).await
            {
                info!(path, "conflicted document vanished on both sides, dropping state row");
                let path = path.to_string();
                self.db.transaction(|txn| {
                    txn.delete_by_path(&path);
                    Ok(())
                })?;
                return Ok(());
            }
        }

        match resolution {
            Resolution::KeepLocal => {
                let file = self.content_file(path, row.kind);
                let bytes = std::fs::read(&file)?;
                let text = String::from_utf8_lossy(&bytes).into_owned();
                let parsed = Document::parse(&text)?;
                let patch = ContentPatch {
                    markdown: document::normalize_newlines(&parsed.body),
                    properties: parsed.properties,
                };
                let canonical_hash = patch_hash(&patch);
                let mtime = self.client.update(&row.remote_id, &patch).await?;
                let mut entry = Entry {
                    local_hash: Some(ContentHash::of_bytes(&bytes)),
                    remote_hash: Some(canonical_hash),
                    remote_mtime: Some(mtime),
                    status: SyncStatus::Clean,
                    ..row
                };
                entry.clear_error();
                self.db.transaction(|txn| txn.upsert(entry))?;
            }
            Resolution::KeepRemote => {
                self.apply_remote_over_local(path, &row).await?;
            }
            Resolution::KeepBoth => {
                let aside = self.conflict_copy_path(path, row.kind);
                let from = self.root.join(path);
                if from.exists() {
                    std::fs::rename(&from, self.root.join(&aside))?;
                    info!(path, copy = %aside, "kept local copy aside");
                }
                self.apply_remote_over_local(path, &row).await?;
            }
        }
        Ok(())
    }

    /// Fetch the document's current content and make it the local file.
    /// The mtime is left unset so the next run refreshes it from the tree.
    async fn apply_remote_over_local(&mut self, path: &str, row: &Entry) -> Result<(), EngineError> {
        let doc = self.client.fetch_content(&row.remote_id).await?;
        let canonical =
            Document { properties: doc.properties, body: doc.markdown }.render()?;
        let hash = ContentHash::of_str(&canonical);
        self.write_content(path, row.kind, canonical.as_bytes())?;
        let mut entry = Entry {
            local_hash: Some(hash),
            remote_hash: Some(hash),
            remote_mtime: None,
            status: SyncStatus::Clean,
            ..row.clone()
        };
        entry.clear_error();
        self.db.transaction(|txn| txn.upsert(entry))?;
        Ok(())
    }

    /// True when any remote node is unknown, newer than recorded, or gone.
    pub async fn remote_changed(&self) -> Result<bool, EngineError> {
        let nodes = self.client.fetch_tree(&self.config.remote_root).await?;
        let mut seen = std::collections::HashSet::new();
        for node in &nodes {
            seen.insert(&node.id);
            match self.db.get_by_remote_id(&node.id) {
                None => return Ok(true),
                Some(row) => {
                    if row.remote_mtime.is_none_or(|stored| node.mtime > stored) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(self.db.list_all().any(|row| !seen.contains(&row.remote_id)))
    }

    // ── helpers ───────────────────────────────────────────────────────────

    fn mark_status(&mut self, path: &str, status: SyncStatus) -> Result<(), EngineError> {
        let row = self
            .db
            .get_by_path(path)
            .ok_or_else(|| EngineError::NoSuchEntry(path.to_string()))?
            .clone();
        if row.status == status {
            return Ok(());
        }
        let entry = Entry { status, ..row };
        self.db.transaction(|txn| txn.upsert(entry))?;
        Ok(())
    }

    /// Where an entry's content bytes live on disk.
    fn content_file(&self, path: &str, kind: EntryKind) -> PathBuf {
        let base = self.root.join(path);
        match kind {
            EntryKind::ContainerPage => base.join(INDEX_FILE),
            EntryKind::Database => base.join(SCHEMA_FILE),
            EntryKind::Leaf | EntryKind::DatabaseEntry => base,
        }
    }

    fn write_content(&self, path: &str, kind: EntryKind, bytes: &[u8]) -> Result<(), EngineError> {
        let file = self.content_file(path, kind);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file, bytes)?;
        Ok(())
    }

    /// Parse a local document into the patch pushed to the remote.
    fn local_patch(&self, doc: &LocalDoc) -> Result<ContentPatch, DocumentError> {
        let text = String::from_utf8_lossy(&doc.bytes).into_owned();
        let parsed = Document::parse(&text)?;
        Ok(ContentPatch {
            markdown: document::normalize_newlines(&parsed.body),
            properties: parsed.properties,
        })
    }

    /// Record a sticky conversion error; the entry is skipped until the
    /// file's bytes change.
    fn record_sticky_error(&mut self, row: &Entry, doc: &LocalDoc, err: DocumentError) -> String {
        let message = err.to_string();
        let mut entry = row.clone();
        entry.mark_error(doc.hash, message.clone());
        if let Err(e) = self.db.transaction(|txn| txn.upsert(entry)) {
            warn!(path = %row.path, error = %e, "failed to record sticky error");
        }
        format!("{}: {}", row.path, message)
    }

    /// Remote id of the parent for a path, trying state, this run's
    /// creations, and the remote snapshot.
    fn resolve_parent(
        &self,
        path: &str,
        remote: &RemoteSnapshot,
        created: &HashMap<String, RemoteId>,
    ) -> Result<RemoteId, String> {
        let parent_path = match path.rsplit_once('/') {
            None => return Ok(self.config.remote_root.clone()),
            Some((dir, _)) => dir,
        };
        if let Some(id) = created.get(parent_path) {
            return Ok(id.clone());
        }
        if let Some(row) = self.db.get_by_path(parent_path) {
            return Ok(row.remote_id.clone());
        }
        if let Some(doc) = remote.get(parent_path) {
            return Ok(doc.node.id.clone());
        }
        Err(format!("parent {parent_path:?} has no remote counterpart yet"))
    }

    /// `parent_remote_id` is null for children of the workspace root.
    fn parent_field(&self, parent: &RemoteId) -> Option<RemoteId> {
        if *parent == self.config.remote_root {
            None
        } else {
            Some(parent.clone())
        }
    }

    fn conflict_copy_path(&self, path: &str, kind: EntryKind) -> String {
        let ts = self.clock.conflict_stamp();
        if kind.is_directory() {
            format!("{path}.conflict.{ts}")
        } else {
            let stem = path.strip_suffix(".md").unwrap_or(path);
            format!("{stem}.conflict.{ts}.md")
        }
    }
}

fn patch_hash(patch: &ContentPatch) -> ContentHash {
    let doc = Document {
        properties: patch.properties.clone(),
        body: patch.markdown.clone(),
    };
    match doc.render() {
        Ok(canonical) => ContentHash::of_str(&canonical),
        // Properties came from parsing, so rendering cannot fail in
        // practice; fall back to hashing the body.
        Err(_) => ContentHash::of_str(&patch.markdown),
    }
}

/// Title a local entry pushes under: its stem (dirs: the dir name).
fn local_title(path: &str, kind: EntryKind) -> String {
    let name = path.rsplit_once('/').map_or(path, |(_, n)| n);
    if kind.is_directory() {
        name.to_string()
    } else {
        document::name_to_title(name).to_string()
    }
}

fn push_kind(kind: EntryKind) -> NodeKind {
    match kind {
        EntryKind::Leaf | EntryKind::ContainerPage => NodeKind::Page,
        EntryKind::Database => NodeKind::Database,
        EntryKind::DatabaseEntry => NodeKind::DatabaseEntry,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
