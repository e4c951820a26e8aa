// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace layout constants and workspace-scoped configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::RemoteId;

/// Metadata directory at the workspace root.
pub const META_DIR: &str = ".folio";
/// Workspace configuration file inside [`META_DIR`].
pub const CONFIG_FILE: &str = "config";
/// State database file inside [`META_DIR`].
pub const STATE_FILE: &str = "state";
/// Workspace lock file inside [`META_DIR`].
pub const LOCK_FILE: &str = "lock";
/// A container page's own content inside its directory.
pub const INDEX_FILE: &str = "_index.md";
/// A database's schema file inside its directory.
pub const SCHEMA_FILE: &str = "_schema";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("not a folio workspace (no {META_DIR} directory found)")]
    NotAWorkspace,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid workspace config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize workspace config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_debounce_secs() -> u64 {
    2
}

/// Workspace-scoped configuration, stored as TOML at `.folio/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Remote root document this workspace is bound to.
    pub remote_root: RemoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Watch mode: seconds between remote polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Watch mode: quiet seconds before a batched sync runs.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
}

impl WorkspaceConfig {
    pub fn new(remote_root: RemoteId) -> Self {
        Self {
            remote_root,
            remote_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            debounce_secs: default_debounce_secs(),
        }
    }

    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let path = workspace_root.join(META_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Err(ConfigError::NotAWorkspace);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, workspace_root: &Path) -> Result<(), ConfigError> {
        let dir = workspace_root.join(META_DIR);
        std::fs::create_dir_all(&dir)?;
        let text = toml::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE), text)?;
        Ok(())
    }
}

/// Find the workspace root: the nearest ancestor of `start` (inclusive)
/// containing a `.folio` directory.
pub fn discover_workspace(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        if d.join(META_DIR).is_dir() {
            return Some(d.to_path_buf());
        }
        dir = d.parent();
    }
    None
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
