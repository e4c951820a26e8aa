// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio init <remote-url> [--path P]`

use std::path::Path;

use folio_core::config::META_DIR;
use folio_core::{RemoteId, WorkspaceConfig};
use folio_engine::init_workspace;

use crate::env;
use crate::exit_error::ExitError;
use crate::registry::Registry;

pub fn handle(remote_url: &str, path: Option<&Path>) -> Result<i32, ExitError> {
    let root = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| ExitError::usage(format!("cannot read current directory: {e}")))?,
    };
    if root.join(META_DIR).exists() {
        return Err(ExitError::usage(format!(
            "{} is already a folio workspace",
            root.display()
        )));
    }

    let root_id = root_id_from_url(remote_url).ok_or_else(|| {
        ExitError::usage(format!("cannot determine a root document id from {remote_url:?}"))
    })?;

    let mut config = WorkspaceConfig::new(RemoteId::new(root_id.clone()));
    config.remote_url = Some(remote_url.to_string());
    init_workspace(&root, &config)?;

    let config_dir = env::config_dir();
    let mut registry = Registry::load(&config_dir)?;
    let registered = root.canonicalize().unwrap_or_else(|_| root.clone());
    registry.add(registered, root_id.clone());
    registry.save(&config_dir)?;

    println!("Initialized workspace at {} bound to {}", root.display(), root_id);
    println!("Run `folio pull` to fetch the remote tree.");
    Ok(0)
}

/// The root document id is the last path segment of the remote URL.
fn root_id_from_url(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme.split_once('/').map(|(_, p)| p)?;
    let segment = path
        .split('?')
        .next()
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()?;
    Some(segment.to_string())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
