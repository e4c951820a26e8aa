// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshotters: the local tree and the remote tree as comparable entry
//! sets. Pure readers — neither side is mutated here.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use folio_core::config::{INDEX_FILE, META_DIR, SCHEMA_FILE};
use folio_core::{document, ContentHash, Document, EntryKind, RemoteId};
use folio_remote::{NodeKind, RemoteClient, RemoteError, RemoteNode};
use folio_store::StateDb;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

/// One local document: a file, or a directory represented by its index file.
#[derive(Debug, Clone)]
pub struct LocalDoc {
    pub path: String,
    pub kind: EntryKind,
    pub bytes: Vec<u8>,
    pub hash: ContentHash,
}

#[derive(Debug, Default)]
pub struct LocalSnapshot {
    pub docs: BTreeMap<String, LocalDoc>,
}

impl LocalSnapshot {
    pub fn get(&self, path: &str) -> Option<&LocalDoc> {
        self.docs.get(path)
    }
}

/// Walk the workspace directory into an entry snapshot.
///
/// Containers are yielded as entries whose bytes come from `_index.md`
/// (empty if absent); databases from `_schema`. The metadata directory is
/// excluded. Non-markdown stray files are ignored.
pub fn walk_local(root: &Path) -> std::io::Result<LocalSnapshot> {
    let mut snapshot = LocalSnapshot::default();
    walk_dir(root, root, false, &mut snapshot)?;
    debug!(docs = snapshot.docs.len(), "local snapshot");
    Ok(snapshot)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    in_database: bool,
    snapshot: &mut LocalSnapshot,
) -> std::io::Result<()> {
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();
        let name = item.file_name().to_string_lossy().into_owned();
        let file_type = item.file_type()?;

        if file_type.is_dir() {
            if dir == root && name == META_DIR {
                continue;
            }
            if in_database {
                warn!(path = %path.display(), "ignoring directory inside a database");
                continue;
            }
            let rel = relative(root, &path);
            let schema = path.join(SCHEMA_FILE);
            if schema.is_file() {
                let bytes = std::fs::read(&schema)?;
                insert_doc(snapshot, rel.clone(), EntryKind::Database, bytes);
                walk_dir(root, &path, true, snapshot)?;
            } else {
                let index = path.join(INDEX_FILE);
                let bytes = if index.is_file() { std::fs::read(&index)? } else { Vec::new() };
                insert_doc(snapshot, rel.clone(), EntryKind::ContainerPage, bytes);
                walk_dir(root, &path, false, snapshot)?;
            }
            continue;
        }

        if !file_type.is_file() || !name.ends_with(".md") || name == INDEX_FILE {
            continue;
        }
        let kind = if in_database { EntryKind::DatabaseEntry } else { EntryKind::Leaf };
        let bytes = std::fs::read(&path)?;
        insert_doc(snapshot, relative(root, &path), kind, bytes);
    }
    Ok(())
}

fn insert_doc(snapshot: &mut LocalSnapshot, path: String, kind: EntryKind, bytes: Vec<u8>) {
    let hash = ContentHash::of_bytes(&bytes);
    snapshot.docs.insert(path.clone(), LocalDoc { path, kind, bytes, hash });
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ── Remote snapshot ───────────────────────────────────────────────────────

/// Canonical rendering of one remote document.
#[derive(Debug, Clone)]
pub struct RemoteContent {
    pub canonical: String,
    pub hash: ContentHash,
}

/// One remote node joined with its local identity.
#[derive(Debug, Clone)]
pub struct RemoteTreeDoc {
    pub node: RemoteNode,
    /// Resolved local shape: a page with children is a container.
    pub kind: EntryKind,
    /// Local path: the state's recorded path for known ids, derived from
    /// the title chain otherwise.
    pub path: String,
    /// Actual parent id (the traversal root for top-level nodes).
    pub parent: RemoteId,
}

#[derive(Debug, Default)]
pub struct RemoteSnapshot {
    /// Keyed by local path.
    pub docs: BTreeMap<String, RemoteTreeDoc>,
    pub by_id: HashMap<RemoteId, String>,
    content: HashMap<RemoteId, RemoteContent>,
    /// Per-node content failures (kept in the snapshot so the reconciler
    /// skips these entries instead of misreading them as deletions).
    pub errors: HashMap<RemoteId, String>,
}

impl RemoteSnapshot {
    /// Fetch the remote tree and, lazily, content.
    ///
    /// Content is fetched only for nodes state does not know, nodes whose
    /// mtime exceeds the recorded `remote_mtime`, and — when
    /// `fetch_all_content` is set (force pull) — every node.
    pub async fn load<C: RemoteClient>(
        client: &C,
        root: &RemoteId,
        state: &StateDb,
        fetch_all_content: bool,
    ) -> Result<Self, RemoteError> {
        let nodes = client.fetch_tree(root).await?;
        let mut snapshot = Self::from_nodes(root, nodes, state);

        let ids: Vec<RemoteId> = snapshot
            .docs
            .values()
            .filter(|doc| {
                if fetch_all_content {
                    return true;
                }
                match state.get_by_remote_id(&doc.node.id) {
                    None => true,
                    Some(row) => {
                        row.remote_hash.is_none()
                            || row.remote_mtime.is_none_or(|stored| doc.node.mtime > stored)
                    }
                }
            })
            .map(|doc| doc.node.id.clone())
            .collect();

        // Fetches run concurrently; the client's rate limiter bounds how
        // many are actually in flight.
        let mut fetches: FuturesUnordered<_> = ids
            .into_iter()
            .map(|id| async move {
                let result = client.fetch_content(&id).await;
                (id, result)
            })
            .collect();
        while let Some((id, result)) = fetches.next().await {
            match result {
                Ok(doc) => {
                    let rendered = Document { properties: doc.properties, body: doc.markdown };
                    match rendered.render() {
                        Ok(canonical) => {
                            let hash = ContentHash::of_str(&canonical);
                            snapshot.content.insert(id, RemoteContent { canonical, hash });
                        }
                        Err(e) => {
                            snapshot.errors.insert(id, e.to_string());
                        }
                    }
                }
                Err(e) if e.is_retryable() || matches!(e, RemoteError::RetriesExhausted { .. }) => {
                    snapshot.errors.insert(id, e.to_string());
                }
                Err(e) => match e {
                    // Archived between tree fetch and content fetch: drop
                    // the node so it reads as remotely deleted.
                    RemoteError::NotFound(_) => {
                        if let Some(path) = snapshot.by_id.remove(&id) {
                            snapshot.docs.remove(&path);
                        }
                    }
                    e => {
                        snapshot.errors.insert(id, e.to_string());
                    }
                },
            }
        }

        debug!(
            docs = snapshot.docs.len(),
            fetched = snapshot.content.len(),
            errors = snapshot.errors.len(),
            "remote snapshot"
        );
        Ok(snapshot)
    }

    /// Join nodes with state and derive local paths, parents before children.
    pub fn from_nodes(root: &RemoteId, nodes: Vec<RemoteNode>, state: &StateDb) -> Self {
        let mut snapshot = Self::default();

        let has_children: std::collections::HashSet<&RemoteId> =
            nodes.iter().filter_map(|n| n.parent_id.as_ref()).collect();

        // Order parents before children so a child's derived path can build
        // on its parent's.
        let mut remaining: Vec<&RemoteNode> = nodes.iter().collect();
        let mut placed: HashMap<RemoteId, String> = HashMap::new();
        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|node| {
                let parent_path = match &node.parent_id {
                    None => Some(String::new()),
                    Some(pid) => placed.get(pid).cloned(),
                };
                let Some(parent_path) = parent_path else {
                    return true;
                };

                let kind = resolve_kind(node, has_children.contains(&node.id));
                let path = match state.get_by_remote_id(&node.id) {
                    Some(row) => row.path.clone(),
                    None => derive_path(&parent_path, &node.title, kind, &node.id, &snapshot.docs),
                };
                placed.insert(node.id.clone(), path.clone());
                snapshot.by_id.insert(node.id.clone(), path.clone());
                snapshot.docs.insert(
                    path.clone(),
                    RemoteTreeDoc {
                        node: (*node).clone(),
                        kind,
                        path,
                        parent: node.parent_id.clone().unwrap_or_else(|| root.clone()),
                    },
                );
                false
            });
            if remaining.len() == before {
                // Parent ids pointing outside the subtree; surface and drop.
                for node in &remaining {
                    warn!(id = %node.id, title = %node.title, "remote node has unknown parent, skipping");
                }
                break;
            }
        }
        snapshot
    }

    pub fn get(&self, path: &str) -> Option<&RemoteTreeDoc> {
        self.docs.get(path)
    }

    pub fn content(&self, id: &RemoteId) -> Option<&RemoteContent> {
        self.content.get(id)
    }

    pub fn error(&self, id: &RemoteId) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    /// Hash of a node's current content: fetched content if we have it,
    /// otherwise the stored hash (content unchanged since last sync).
    pub fn hash_of(&self, id: &RemoteId, state: &StateDb) -> Option<ContentHash> {
        if let Some(content) = self.content.get(id) {
            return Some(content.hash);
        }
        state.get_by_remote_id(id).and_then(|row| row.remote_hash)
    }
}

fn resolve_kind(node: &RemoteNode, has_children: bool) -> EntryKind {
    match node.kind {
        NodeKind::Database => EntryKind::Database,
        NodeKind::DatabaseEntry => EntryKind::DatabaseEntry,
        NodeKind::Page if has_children => EntryKind::ContainerPage,
        NodeKind::Page => EntryKind::Leaf,
    }
}

/// Local path for a node state does not know yet. Sibling collisions get
/// the remote id as a suffix rather than silently merging.
fn derive_path(
    parent_path: &str,
    title: &str,
    kind: EntryKind,
    id: &RemoteId,
    taken: &BTreeMap<String, RemoteTreeDoc>,
) -> String {
    let name = document::title_to_name(title);
    let join = |name: &str| {
        let file = if kind.is_directory() { name.to_string() } else { format!("{name}.md") };
        if parent_path.is_empty() {
            file
        } else {
            format!("{parent_path}/{file}")
        }
    };
    let path = join(&name);
    if !taken.contains_key(&path) {
        return path;
    }
    join(&format!("{name}-{id}"))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
