// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory remote for tests: a deterministic document tree with scripted
//! failures and a call log.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::RemoteId;
use parking_lot::Mutex;

use crate::client::RemoteClient;
use crate::types::{ContentPatch, Created, NodeKind, RemoteDoc, RemoteError, RemoteNode};

#[derive(Debug, Clone)]
struct FakeDoc {
    parent_id: RemoteId,
    kind: NodeKind,
    title: String,
    markdown: String,
    properties: BTreeMap<String, serde_yaml::Value>,
    mtime: DateTime<Utc>,
    archived: bool,
}

struct FakeState {
    root: RemoteId,
    docs: BTreeMap<String, FakeDoc>,
    next_id: u64,
    now_ms: i64,
    failures: VecDeque<RemoteError>,
    calls: Vec<String>,
}

/// Cloneable handle; clones share the same tree.
#[derive(Clone)]
pub struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    pub fn new(root: impl Into<RemoteId>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                root: root.into(),
                docs: BTreeMap::new(),
                next_id: 1,
                now_ms: 1_700_000_000_000,
                failures: VecDeque::new(),
                calls: Vec::new(),
            })),
        }
    }

    fn tick(state: &mut FakeState) -> DateTime<Utc> {
        state.now_ms += 1_000;
        DateTime::from_timestamp_millis(state.now_ms).unwrap_or_default()
    }

    fn seed(
        &self,
        parent: &RemoteId,
        kind: NodeKind,
        title: &str,
        markdown: &str,
        properties: BTreeMap<String, serde_yaml::Value>,
    ) -> RemoteId {
        let mut state = self.state.lock();
        let id = RemoteId::new(format!("r-{}", state.next_id));
        state.next_id += 1;
        let mtime = Self::tick(&mut state);
        state.docs.insert(
            id.as_str().to_string(),
            FakeDoc {
                parent_id: parent.clone(),
                kind,
                title: title.to_string(),
                markdown: markdown.to_string(),
                properties,
                mtime,
                archived: false,
            },
        );
        id
    }

    // ── Test setup (no call log, no scripted failures) ────────────────────

    pub fn seed_page(&self, parent: &RemoteId, title: &str, markdown: &str) -> RemoteId {
        self.seed(parent, NodeKind::Page, title, markdown, BTreeMap::new())
    }

    pub fn seed_database(&self, parent: &RemoteId, title: &str, schema: &str) -> RemoteId {
        self.seed(parent, NodeKind::Database, title, schema, BTreeMap::new())
    }

    pub fn seed_entry(
        &self,
        parent: &RemoteId,
        title: &str,
        markdown: &str,
        properties: BTreeMap<String, serde_yaml::Value>,
    ) -> RemoteId {
        self.seed(parent, NodeKind::DatabaseEntry, title, markdown, properties)
    }

    /// External edit: replace markdown and bump the mtime.
    pub fn edit(&self, id: &RemoteId, markdown: &str) {
        let mut state = self.state.lock();
        let mtime = Self::tick(&mut state);
        if let Some(doc) = state.docs.get_mut(id.as_str()) {
            doc.markdown = markdown.to_string();
            doc.mtime = mtime;
        }
    }

    /// External archive.
    pub fn remove(&self, id: &RemoteId) {
        let mut state = self.state.lock();
        if let Some(doc) = state.docs.get_mut(id.as_str()) {
            doc.archived = true;
        }
    }

    /// Queue an error returned by the next client call (FIFO).
    pub fn push_failure(&self, err: RemoteError) {
        self.state.lock().failures.push_back(err);
    }

    // ── Test assertions ───────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn markdown_of(&self, id: &RemoteId) -> Option<String> {
        let state = self.state.lock();
        state.docs.get(id.as_str()).filter(|d| !d.archived).map(|d| d.markdown.clone())
    }

    pub fn is_archived(&self, id: &RemoteId) -> bool {
        let state = self.state.lock();
        state.docs.get(id.as_str()).is_none_or(|d| d.archived)
    }

    pub fn parent_of(&self, id: &RemoteId) -> Option<RemoteId> {
        let state = self.state.lock();
        state.docs.get(id.as_str()).map(|d| d.parent_id.clone())
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().docs.values().filter(|d| !d.archived).count()
    }

    fn begin(&self, call: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(call.to_string());
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn fetch_tree(&self, root: &RemoteId) -> Result<Vec<RemoteNode>, RemoteError> {
        self.begin("fetch_tree")?;
        let state = self.state.lock();
        if *root != state.root {
            return Err(RemoteError::NotFound(root.clone()));
        }
        Ok(state
            .docs
            .iter()
            .filter(|(_, doc)| !doc.archived)
            .map(|(id, doc)| RemoteNode {
                id: RemoteId::new(id.clone()),
                parent_id: if doc.parent_id == state.root {
                    None
                } else {
                    Some(doc.parent_id.clone())
                },
                kind: doc.kind,
                title: doc.title.clone(),
                mtime: doc.mtime,
                url: None,
            })
            .collect())
    }

    async fn fetch_content(&self, id: &RemoteId) -> Result<RemoteDoc, RemoteError> {
        self.begin(&format!("fetch_content {id}"))?;
        let state = self.state.lock();
        match state.docs.get(id.as_str()).filter(|d| !d.archived) {
            Some(doc) => Ok(RemoteDoc {
                markdown: doc.markdown.clone(),
                properties: doc.properties.clone(),
            }),
            None => Err(RemoteError::NotFound(id.clone())),
        }
    }

    async fn create(
        &self,
        parent: &RemoteId,
        kind: NodeKind,
        title: &str,
        content: &ContentPatch,
    ) -> Result<Created, RemoteError> {
        self.begin(&format!("create {title}"))?;
        {
            let state = self.state.lock();
            let parent_ok = *parent == state.root
                || state.docs.get(parent.as_str()).is_some_and(|d| !d.archived);
            if !parent_ok {
                return Err(RemoteError::NotFound(parent.clone()));
            }
        }
        let id = self.seed(parent, kind, title, &content.markdown, content.properties.clone());
        let state = self.state.lock();
        let doc = state.docs.get(id.as_str()).ok_or_else(|| {
            RemoteError::Malformed("created document vanished".to_string())
        })?;
        Ok(Created { id: id.clone(), url: None, mtime: doc.mtime })
    }

    async fn update(
        &self,
        id: &RemoteId,
        patch: &ContentPatch,
    ) -> Result<DateTime<Utc>, RemoteError> {
        self.begin(&format!("update {id}"))?;
        let mut state = self.state.lock();
        let mtime = Self::tick(&mut state);
        match state.docs.get_mut(id.as_str()).filter(|d| !d.archived) {
            Some(doc) => {
                doc.markdown = patch.markdown.clone();
                doc.properties = patch.properties.clone();
                doc.mtime = mtime;
                Ok(mtime)
            }
            None => Err(RemoteError::NotFound(id.clone())),
        }
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        self.begin(&format!("delete {id}"))?;
        let mut state = self.state.lock();
        match state.docs.get_mut(id.as_str()) {
            Some(doc) => {
                doc.archived = true;
                Ok(())
            }
            None => Err(RemoteError::NotFound(id.clone())),
        }
    }
}
