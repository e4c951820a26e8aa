// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed client surface the sync engine consumes.

use async_trait::async_trait;
use folio_core::RemoteId;

use crate::types::{ContentPatch, Created, NodeKind, RemoteDoc, RemoteError, RemoteNode};

/// Access to the remote document service.
///
/// `update` is idempotent by content: re-applying the same patch produces
/// the same remote state. `create` is not — callers record the returned id
/// before relying on it, and probe by title+parent before re-creating after
/// a crash.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Enumerate the subtree under `root`, excluding `root` itself.
    /// `parent_id` is `None` for direct children of `root`.
    async fn fetch_tree(&self, root: &RemoteId) -> Result<Vec<RemoteNode>, RemoteError>;

    /// Retrieve one document's rendered content and properties.
    async fn fetch_content(&self, id: &RemoteId) -> Result<RemoteDoc, RemoteError>;

    /// Create a new remote document under `parent`.
    async fn create(
        &self,
        parent: &RemoteId,
        kind: NodeKind,
        title: &str,
        content: &ContentPatch,
    ) -> Result<Created, RemoteError>;

    /// Apply content to an existing document; returns the new mtime.
    async fn update(
        &self,
        id: &RemoteId,
        patch: &ContentPatch,
    ) -> Result<chrono::DateTime<chrono::Utc>, RemoteError>;

    /// Archive a remote document.
    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError>;
}
