// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio resolve <path> {--keep-local|--keep-remote|--keep-both}`

use std::path::Path;

use folio_core::Resolution;

use super::{open_engine, workspace_root};
use crate::exit_error::ExitError;

pub async fn handle(
    entry_path: &str,
    resolution: Resolution,
    path: Option<&Path>,
) -> Result<i32, ExitError> {
    let root = workspace_root(path)?;
    let mut engine = open_engine(&root)?;
    engine.resolve(entry_path, resolution).await?;
    println!("resolved {entry_path} ({resolution})");
    Ok(0)
}
