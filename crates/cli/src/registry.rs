// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global configuration and the registry of known workspaces, both TOML
//! files under the user config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::exit_error::ExitError;

const GLOBAL_CONFIG_FILE: &str = "config.toml";
const REGISTRY_FILE: &str = "workspaces.toml";

/// User-level configuration: credential and API endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl GlobalConfig {
    pub fn load(config_dir: &Path) -> Result<Self, ExitError> {
        let path = config_dir.join(GLOBAL_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ExitError::usage(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| ExitError::usage(format!("invalid {}: {e}", path.display())))
    }
}

/// One registered workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub path: PathBuf,
    pub remote_root: String,
}

/// The registry `folio list` reads and `folio init` appends to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceRef>,
}

impl Registry {
    pub fn load(config_dir: &Path) -> Result<Self, ExitError> {
        let path = config_dir.join(REGISTRY_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ExitError::usage(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| ExitError::usage(format!("invalid {}: {e}", path.display())))
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), ExitError> {
        std::fs::create_dir_all(config_dir).map_err(|e| {
            ExitError::usage(format!("cannot create {}: {e}", config_dir.display()))
        })?;
        let text = toml::to_string_pretty(self)
            .map_err(|e| ExitError::usage(format!("cannot serialize registry: {e}")))?;
        let path = config_dir.join(REGISTRY_FILE);
        std::fs::write(&path, text)
            .map_err(|e| ExitError::usage(format!("cannot write {}: {e}", path.display())))
    }

    /// Register a workspace, replacing any stale entry at the same path.
    pub fn add(&mut self, path: PathBuf, remote_root: String) {
        self.workspaces.retain(|w| w.path != path);
        self.workspaces.push(WorkspaceRef { path, remote_root });
        self.workspaces.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
