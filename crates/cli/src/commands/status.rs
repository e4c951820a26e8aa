// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio status [--json]`: report pending actions, write nothing.

use std::path::Path;

use serde::Serialize;

use super::{open_engine, workspace_root};
use crate::exit_error::ExitError;

#[derive(Serialize)]
struct PendingLine<'a> {
    path: &'a str,
    action: &'a str,
}

pub async fn handle(json: bool, path: Option<&Path>) -> Result<i32, ExitError> {
    let root = workspace_root(path)?;
    let engine = open_engine(&root)?;
    let status = engine.status().await?;

    if json {
        let lines: Vec<PendingLine> = status
            .pending
            .iter()
            .map(|(path, action)| PendingLine { path, action })
            .collect();
        let rendered = serde_json::to_string_pretty(&lines)
            .map_err(|e| ExitError::usage(e.to_string()))?;
        println!("{rendered}");
        return Ok(0);
    }

    if status.is_clean() {
        println!("workspace is clean");
        return Ok(0);
    }
    for (path, action) in &status.pending {
        println!("{action:<22} {path}");
    }
    println!("{} pending", status.pending.len());
    Ok(0)
}
