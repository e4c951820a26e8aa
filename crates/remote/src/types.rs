// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-independent remote types and the remote error taxonomy.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_core::RemoteId;
use thiserror::Error;

/// The remote's own classification of a document.
///
/// Whether a page materializes as a leaf file or a container directory is a
/// local decision (does it have children), not a remote property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Page,
    Database,
    DatabaseEntry,
}

/// One node of the remote tree, as enumerated by `fetch_tree`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteNode {
    pub id: RemoteId,
    /// None for direct children of the traversal root.
    pub parent_id: Option<RemoteId>,
    pub kind: NodeKind,
    pub title: String,
    /// The remote's authoritative last-modified timestamp.
    pub mtime: DateTime<Utc>,
    pub url: Option<String>,
}

/// One document's content, already rendered to markdown by the converter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteDoc {
    pub markdown: String,
    /// Database property values (frontmatter for database entries).
    pub properties: BTreeMap<String, serde_yaml::Value>,
}

/// Content to apply to a remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPatch {
    pub markdown: String,
    pub properties: BTreeMap<String, serde_yaml::Value>,
}

impl ContentPatch {
    pub fn markdown_only(markdown: impl Into<String>) -> Self {
        Self { markdown: markdown.into(), properties: BTreeMap::new() }
    }
}

/// Result of a successful `create`.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub id: RemoteId,
    pub url: Option<String>,
    pub mtime: DateTime<Utc>,
}

/// Remote failure taxonomy. Retryable variants are transient; everything
/// else fails the call immediately.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("throttled by remote")]
    Throttled { retry_after: Option<Duration> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote server error: {status}")]
    Server { status: u16 },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("authentication with the remote failed")]
    Auth,
    #[error("remote document {0} not found")]
    NotFound(RemoteId),
    #[error("remote rejected request: {status} {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed remote response: {0}")]
    Malformed(String),
    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<RemoteError> },
}

impl RemoteError {
    /// Transient failures that the retry schedule applies to.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Throttled { .. }
                | RemoteError::Transport(_)
                | RemoteError::Server { .. }
                | RemoteError::Timeout(_)
        )
    }

    pub fn is_auth(&self) -> bool {
        match self {
            RemoteError::Auth => true,
            RemoteError::RetriesExhausted { last, .. } => last.is_auth(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
