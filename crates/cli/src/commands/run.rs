// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio pull`, `folio push`, and `folio sync`.

use std::path::Path;

use folio_engine::Mode;
use tokio_util::sync::CancellationToken;

use super::{open_engine, print_report, report_exit, workspace_root};
use crate::exit_error::ExitError;

pub async fn handle(mode: Mode, path: Option<&Path>) -> Result<i32, ExitError> {
    let root = workspace_root(path)?;
    let mut engine = open_engine(&root)?;
    let report = engine.run(mode, &CancellationToken::new()).await?;
    print_report(&report);
    Ok(report_exit(&report))
}
