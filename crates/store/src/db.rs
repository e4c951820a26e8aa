// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable entry metadata, one versioned JSON document per workspace.
//!
//! The store is authoritative for metadata, never for content. Recovery at
//! startup is "load current rows"; a file that fails to load is corruption
//! and the engine refuses to run. Every commit rewrites the file atomically
//! (tmp + rename), parking the previous state in a `backups/` directory
//! beside it (`state.1` newest through `state.3`).

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use folio_core::{Entry, RemoteId, SyncStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Current state schema version
pub const CURRENT_STATE_VERSION: u32 = 1;

const MAX_BACKUPS: u32 = 3;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "state database corrupt at {path}: {reason}\n\
         recover by deleting {path} and running `folio pull` to rebuild it"
    )]
    Corrupt { path: PathBuf, reason: String },
    #[error("remote id {remote_id} already mapped to {existing_path}")]
    DuplicateRemoteId { remote_id: RemoteId, existing_path: String },
}

/// On-disk document wrapping the rows.
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    /// Schema version for migrations
    #[serde(rename = "v")]
    version: u32,
    entries: Vec<Entry>,
}

/// The workspace state database. Single writer per workspace, guarded by
/// [`crate::WorkspaceLock`].
#[derive(Debug)]
pub struct StateDb {
    path: PathBuf,
    entries: BTreeMap<String, Entry>,
    by_remote: HashMap<RemoteId, String>,
}

impl StateDb {
    /// Load the state file, or start empty when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StateError> {
        let mut db = Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
            by_remote: HashMap::new(),
        };
        if !path.exists() {
            debug!(path = %path.display(), "no state file, starting empty");
            return Ok(db);
        }

        let text = std::fs::read_to_string(path)?;
        let doc: StateDocument = serde_json::from_str(&text).map_err(|e| StateError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if doc.version > CURRENT_STATE_VERSION {
            return Err(StateError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "state version {} is newer than supported version {}",
                    doc.version, CURRENT_STATE_VERSION
                ),
            });
        }

        for entry in doc.entries {
            if db.entries.contains_key(&entry.path) {
                return Err(StateError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!("duplicate path {:?}", entry.path),
                });
            }
            if let Some(existing) = db.by_remote.get(&entry.remote_id) {
                return Err(StateError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!(
                        "remote id {} mapped to both {:?} and {:?}",
                        entry.remote_id, existing, entry.path
                    ),
                });
            }
            db.by_remote.insert(entry.remote_id.clone(), entry.path.clone());
            db.entries.insert(entry.path.clone(), entry);
        }
        debug!(rows = db.entries.len(), "loaded state");
        Ok(db)
    }

    pub fn get_by_path(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn get_by_remote_id(&self, remote_id: &RemoteId) -> Option<&Entry> {
        self.by_remote.get(remote_id).and_then(|p| self.entries.get(p))
    }

    /// Snapshot iteration in path order.
    pub fn list_all(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn list_where(&self, statuses: &[SyncStatus]) -> Vec<&Entry> {
        self.entries.values().filter(|e| statuses.contains(&e.status)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a group of upserts/deletes that become visible and durable
    /// atomically. On any failure nothing is applied, in memory or on disk.
    pub fn transaction<T>(
        &mut self,
        body: impl FnOnce(&mut Txn) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let mut txn = Txn {
            entries: self.entries.clone(),
            by_remote: self.by_remote.clone(),
        };
        let out = body(&mut txn)?;
        self.persist(&txn)?;
        self.entries = txn.entries;
        self.by_remote = txn.by_remote;
        Ok(out)
    }

    fn persist(&self, txn: &Txn) -> Result<(), StateError> {
        let doc = StateDocument {
            version: CURRENT_STATE_VERSION,
            entries: txn.entries.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
        }
        if self.path.exists() {
            let slot = backup_slot(&self.path)?;
            std::fs::copy(&self.path, slot)?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Staged mutations inside [`StateDb::transaction`].
pub struct Txn {
    entries: BTreeMap<String, Entry>,
    by_remote: HashMap<RemoteId, String>,
}

impl Txn {
    /// Atomic insert-or-update keyed by path.
    pub fn upsert(&mut self, entry: Entry) -> Result<(), StateError> {
        if let Some(existing_path) = self.by_remote.get(&entry.remote_id) {
            if existing_path != &entry.path {
                return Err(StateError::DuplicateRemoteId {
                    remote_id: entry.remote_id.clone(),
                    existing_path: existing_path.clone(),
                });
            }
        }
        if let Some(old) = self.entries.get(&entry.path) {
            if old.remote_id != entry.remote_id {
                self.by_remote.remove(&old.remote_id);
            }
        }
        self.by_remote.insert(entry.remote_id.clone(), entry.path.clone());
        self.entries.insert(entry.path.clone(), entry);
        Ok(())
    }

    pub fn delete_by_path(&mut self, path: &str) {
        if let Some(old) = self.entries.remove(path) {
            self.by_remote.remove(&old.remote_id);
        }
    }

    pub fn get_by_path(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }
}

/// Shift the numbered slots in `backups/` up by one and hand back slot 1
/// for the copy about to be taken. `state.1` is always the most recent
/// pre-commit state; `state.{MAX_BACKUPS}` falls off the end.
fn backup_slot(state_path: &Path) -> std::io::Result<PathBuf> {
    let dir = state_path.parent().unwrap_or(Path::new(".")).join("backups");
    std::fs::create_dir_all(&dir)?;
    let name = state_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let slot = |n: u32| dir.join(format!("{name}.{n}"));

    let _ = std::fs::remove_file(slot(MAX_BACKUPS));
    for n in (1..MAX_BACKUPS).rev() {
        if slot(n).exists() {
            let _ = std::fs::rename(slot(n), slot(n + 1));
        }
    }
    Ok(slot(1))
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
