// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pure reconciler: (local, remote, state) → actions.
//!
//! `decide` handles exactly one join row and never touches the filesystem,
//! the network, or the store; `reconcile` assembles the per-path rows and
//! orders the plan (creations parents-first, deletions deepest-first).

use chrono::{DateTime, Utc};
use folio_core::entry::depth_of;
use folio_core::{ContentHash, Entry, EntryKind, RemoteId};
use folio_store::StateDb;

use crate::snapshot::{LocalSnapshot, RemoteSnapshot};

/// The local half of a join row.
#[derive(Debug, Clone)]
pub struct LocalSide {
    pub hash: ContentHash,
    pub kind: EntryKind,
}

/// The remote half of a join row.
#[derive(Debug, Clone)]
pub struct RemoteSide {
    pub id: RemoteId,
    pub kind: EntryKind,
    pub mtime: DateTime<Utc>,
    /// Canonical content hash; `None` when content was not fetched because
    /// the recorded mtime shows it unchanged.
    pub hash: Option<ContentHash>,
    /// Content fetch or conversion failed for this node.
    pub errored: bool,
}

/// What kind of run is asking, and whether it overrides one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pull { force: bool },
    Push { force: bool },
    Sync,
}

impl Mode {
    pub fn pulls(&self) -> bool {
        matches!(self, Mode::Pull { .. } | Mode::Sync)
    }

    pub fn pushes(&self) -> bool {
        matches!(self, Mode::Push { .. } | Mode::Sync)
    }

    fn force_pull(&self) -> bool {
        matches!(self, Mode::Pull { force: true })
    }

    fn force_push(&self) -> bool {
        matches!(self, Mode::Push { force: true })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    BothChanged,
    KindChanged,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConflictReason::BothChanged => "both sides changed",
            ConflictReason::KindChanged => "kind changed",
        })
    }
}

/// One entry's reconciliation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Noop,
    /// Both sides exist, state does not: record the pairing, rewriting the
    /// local file from remote content when the hashes differ.
    Adopt { overwrite_local: bool },
    /// Remote-only, unknown: write local file, create state.
    PullCreate,
    /// Remote changed (or pull --force): overwrite local.
    PullUpdate,
    /// Local changed (or push --force): update remote.
    PushUpdate,
    /// Local-only, unknown: create remote (after the adoption probe).
    PushCreate,
    /// Remote deleted cleanly: remove the local file and the state row.
    DeleteLocal,
    /// Local deleted cleanly: archive the remote and drop the state row.
    DeleteRemote,
    /// Both sides gone: drop the state row.
    ForgetState,
    MarkConflict(ConflictReason),
    /// Local deleted while remote changed.
    MarkDeletedLocal,
    /// Remote deleted while local changed.
    MarkDeletedRemote,
    /// Sticky conflict: untouched until `resolve`.
    SkipConflict,
    /// Sticky conversion error still applies to the live content.
    SkipStickyError,
    /// Remote content could not be fetched or converted this run.
    SkipRemoteError,
}

impl Decision {
    /// Mutates local files.
    pub fn is_pull_effect(&self) -> bool {
        matches!(
            self,
            Decision::Adopt { .. }
                | Decision::PullCreate
                | Decision::PullUpdate
                | Decision::DeleteLocal
        )
    }

    /// Mutates the remote.
    pub fn is_push_effect(&self) -> bool {
        matches!(
            self,
            Decision::PushUpdate | Decision::PushCreate | Decision::DeleteRemote
        )
    }

    /// State-only bookkeeping, applied on any run direction.
    pub fn is_mark(&self) -> bool {
        matches!(
            self,
            Decision::MarkConflict(_)
                | Decision::MarkDeletedLocal
                | Decision::MarkDeletedRemote
                | Decision::ForgetState
        )
    }

    pub fn is_creation(&self) -> bool {
        matches!(self, Decision::Adopt { .. } | Decision::PullCreate | Decision::PushCreate)
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Decision::DeleteLocal | Decision::DeleteRemote)
    }

    /// Short label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Noop => "clean",
            Decision::Adopt { .. } => "adopt",
            Decision::PullCreate | Decision::PullUpdate => "pull",
            Decision::PushUpdate | Decision::PushCreate => "push",
            Decision::DeleteLocal => "delete local",
            Decision::DeleteRemote => "delete remote",
            Decision::ForgetState => "forget",
            Decision::MarkConflict(_) => "conflict",
            Decision::MarkDeletedLocal => "deleted locally",
            Decision::MarkDeletedRemote => "deleted remotely",
            Decision::SkipConflict => "conflict (unresolved)",
            Decision::SkipStickyError => "error (sticky)",
            Decision::SkipRemoteError => "error (remote)",
        }
    }
}

/// Decide one join row.
pub fn decide(
    local: Option<&LocalSide>,
    remote: Option<&RemoteSide>,
    state: Option<&Entry>,
    mode: Mode,
) -> Decision {
    // A pre-existing conflict overrides every other row. Even a document
    // gone from both sides keeps the status until an explicit resolution.
    if let Some(row) = state {
        if row.is_conflict() {
            return Decision::SkipConflict;
        }
    }

    match (local, remote, state) {
        (Some(local), Some(remote), None) => {
            if remote.errored {
                return Decision::SkipRemoteError;
            }
            let same = remote.hash.is_some_and(|h| h == local.hash);
            Decision::Adopt { overwrite_local: !same }
        }
        (Some(local), Some(remote), Some(row)) => {
            if remote.errored {
                return Decision::SkipRemoteError;
            }
            if row.error_applies_to(&local.hash) {
                return Decision::SkipStickyError;
            }
            if remote.kind != row.kind {
                return Decision::MarkConflict(ConflictReason::KindChanged);
            }
            let local_changed = row.local_hash != Some(local.hash);
            let remote_changed = remote_changed(remote.mtime, row);
            match (local_changed, remote_changed) {
                (false, false) => Decision::Noop,
                (true, false) => {
                    if mode.force_pull() {
                        Decision::PullUpdate
                    } else {
                        Decision::PushUpdate
                    }
                }
                (false, true) => {
                    if mode.force_push() {
                        Decision::PushUpdate
                    } else {
                        Decision::PullUpdate
                    }
                }
                (true, true) => {
                    if mode.force_pull() {
                        Decision::PullUpdate
                    } else if mode.force_push() {
                        Decision::PushUpdate
                    } else {
                        Decision::MarkConflict(ConflictReason::BothChanged)
                    }
                }
            }
        }
        (None, Some(remote), None) => {
            if remote.errored {
                Decision::SkipRemoteError
            } else {
                Decision::PullCreate
            }
        }
        (None, Some(remote), Some(row)) => {
            if remote.errored {
                Decision::SkipRemoteError
            } else if remote_changed(remote.mtime, row) {
                Decision::MarkDeletedLocal
            } else {
                Decision::DeleteRemote
            }
        }
        (Some(local), None, Some(row)) => {
            if row.local_hash == Some(local.hash) {
                Decision::DeleteLocal
            } else {
                Decision::MarkDeletedRemote
            }
        }
        (Some(_), None, None) => Decision::PushCreate,
        (None, None, Some(_)) => Decision::ForgetState,
        (None, None, None) => Decision::Noop,
    }
}

/// Strictly-greater mtime counts as changed; equality does not. A row with
/// no recorded mtime has never observed the remote, so any mtime counts.
fn remote_changed(mtime: DateTime<Utc>, row: &Entry) -> bool {
    match row.remote_mtime {
        Some(stored) => mtime > stored,
        None => true,
    }
}

/// One path's planned work.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub path: String,
    pub decision: Decision,
    /// The remote id involved, when one is known.
    pub remote_id: Option<RemoteId>,
    pub depth: usize,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub actions: Vec<PlannedAction>,
}

impl Plan {
    /// Actions this mode executes, in side-effect-safe order: marks, then
    /// creations parents-first, then updates, then deletions deepest-first.
    pub fn ordered_for(&self, mode: Mode) -> Vec<&PlannedAction> {
        let executable = |a: &&PlannedAction| {
            a.decision.is_mark()
                || (mode.pulls() && a.decision.is_pull_effect())
                || (mode.pushes() && a.decision.is_push_effect())
        };

        let mut marks: Vec<&PlannedAction> = Vec::new();
        let mut creations: Vec<&PlannedAction> = Vec::new();
        let mut updates: Vec<&PlannedAction> = Vec::new();
        let mut deletions: Vec<&PlannedAction> = Vec::new();
        for action in self.actions.iter().filter(executable) {
            if action.decision.is_mark() {
                marks.push(action);
            } else if action.decision.is_creation() {
                creations.push(action);
            } else if action.decision.is_deletion() {
                deletions.push(action);
            } else {
                updates.push(action);
            }
        }
        creations.sort_by_key(|a| a.depth);
        deletions.sort_by_key(|a| std::cmp::Reverse(a.depth));

        let mut ordered = marks;
        ordered.extend(creations);
        ordered.extend(updates);
        ordered.extend(deletions);
        ordered
    }

    /// Skipped rows (sticky conflicts and errors) for reporting.
    pub fn skips(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter().filter(|a| {
            matches!(
                a.decision,
                Decision::SkipConflict | Decision::SkipStickyError | Decision::SkipRemoteError
            )
        })
    }
}

/// Join the three sources over the union of their keys and decide each row.
pub fn reconcile(
    local: &LocalSnapshot,
    remote: &RemoteSnapshot,
    state: &StateDb,
    mode: Mode,
) -> Plan {
    let mut paths: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    paths.extend(local.docs.keys().map(String::as_str));
    paths.extend(remote.docs.keys().map(String::as_str));
    paths.extend(state.list_all().map(|e| e.path.as_str()));

    let mut plan = Plan::default();
    for path in paths {
        let local_side = local.get(path).map(|doc| LocalSide { hash: doc.hash, kind: doc.kind });
        let remote_side = remote.get(path).map(|doc| RemoteSide {
            id: doc.node.id.clone(),
            kind: doc.kind,
            mtime: doc.node.mtime,
            hash: remote.hash_of(&doc.node.id, state),
            errored: remote.error(&doc.node.id).is_some(),
        });
        let row = state.get_by_path(path);

        let decision = decide(local_side.as_ref(), remote_side.as_ref(), row, mode);
        if decision == Decision::Noop {
            continue;
        }
        let remote_id = remote_side
            .map(|r| r.id)
            .or_else(|| row.map(|r| r.remote_id.clone()));
        plan.actions.push(PlannedAction {
            path: path.to_string(),
            decision,
            remote_id,
            depth: depth_of(path),
        });
    }
    plan
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
