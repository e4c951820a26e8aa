// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio list`: show configured workspaces.

use folio_core::config::{META_DIR, STATE_FILE};
use folio_store::StateDb;

use crate::env;
use crate::exit_error::ExitError;
use crate::registry::Registry;

pub fn handle() -> Result<i32, ExitError> {
    let registry = Registry::load(&env::config_dir())?;
    if registry.workspaces.is_empty() {
        println!("no workspaces configured");
        return Ok(0);
    }

    for workspace in &registry.workspaces {
        let note = if workspace.path.join(META_DIR).is_dir() {
            let state_path = workspace.path.join(META_DIR).join(STATE_FILE);
            match StateDb::open(&state_path) {
                Ok(db) => format!("{} entries", db.len()),
                Err(_) => "state unreadable".to_string(),
            }
        } else {
            "missing".to_string()
        };
        println!("{}  {}  ({note})", workspace.path.display(), workspace.remote_root);
    }
    Ok(0)
}
