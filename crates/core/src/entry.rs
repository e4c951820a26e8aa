// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of sync: one document, identified by local path and remote id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Opaque remote document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for RemoteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RemoteId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RemoteId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// What shape a synced document takes locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// One page, one file.
    Leaf,
    /// A page with children: a directory holding `_index.md` plus child entries.
    ContainerPage,
    /// A database: a directory holding `_schema` plus entry files.
    Database,
    /// A row of a database: one file with frontmatter properties.
    DatabaseEntry,
}

impl EntryKind {
    /// Kinds whose local path is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, EntryKind::ContainerPage | EntryKind::Database)
    }

    /// Kinds whose files carry YAML frontmatter properties.
    pub fn has_properties(&self) -> bool {
        matches!(self, EntryKind::DatabaseEntry)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntryKind::Leaf => "leaf",
            EntryKind::ContainerPage => "container-page",
            EntryKind::Database => "database",
            EntryKind::DatabaseEntry => "database-entry",
        })
    }
}

/// Per-entry sync state.
///
/// `Conflict` is sticky: no pull/push/sync run leaves it, only an explicit
/// resolution does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Clean,
    LocalModified,
    RemoteModified,
    Conflict,
    DeletedLocal,
    DeletedRemote,
    NewLocal,
    NewRemote,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncStatus::Clean => "clean",
            SyncStatus::LocalModified => "local-modified",
            SyncStatus::RemoteModified => "remote-modified",
            SyncStatus::Conflict => "conflict",
            SyncStatus::DeletedLocal => "deleted-local",
            SyncStatus::DeletedRemote => "deleted-remote",
            SyncStatus::NewLocal => "new-local",
            SyncStatus::NewRemote => "new-remote",
        })
    }
}

/// How to leave a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Local bytes win: push, then mark clean.
    KeepLocal,
    /// Remote content wins: overwrite local, mark clean.
    KeepRemote,
    /// Rename local aside, apply remote as the canonical entry.
    KeepBoth,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Resolution::KeepLocal => "keep-local",
            Resolution::KeepRemote => "keep-remote",
            Resolution::KeepBoth => "keep-both",
        })
    }
}

/// One synchronized document.
///
/// `path` is relative to the workspace root with forward slashes, unique per
/// workspace; `remote_id` is unique as well. Hashes are the fingerprints at
/// the last successful sync, never of live content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub remote_id: RemoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_remote_id: Option<RemoteId>,
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_hash: Option<ContentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_hash: Option<ContentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_mtime: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    /// Hash of local content that failed conversion. The entry is skipped
    /// while the live file still hashes to this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_hash: Option<ContentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Entry {
    /// Number of path components; orders parent-before-child work.
    pub fn depth(&self) -> usize {
        depth_of(&self.path)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == SyncStatus::Conflict
    }

    /// Record a sticky conversion error against the given content.
    pub fn mark_error(&mut self, hash: ContentHash, message: impl Into<String>) {
        self.error_hash = Some(hash);
        self.error_message = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error_hash = None;
        self.error_message = None;
    }

    /// True while the sticky error still applies to the given live content.
    pub fn error_applies_to(&self, live_hash: &ContentHash) -> bool {
        self.error_hash.as_ref() == Some(live_hash)
    }
}

/// Depth of a workspace-relative path (component count).
pub fn depth_of(path: &str) -> usize {
    path.split('/').filter(|c| !c.is_empty()).count()
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
