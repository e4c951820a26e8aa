// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `folio watch [--interval S]`: daemon mode.

use std::path::Path;
use std::time::Duration;

use folio_engine::{watch, WatchOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{open_engine, workspace_root};
use crate::exit_error::ExitError;

pub async fn handle(interval: Option<u64>, path: Option<&Path>) -> Result<i32, ExitError> {
    let root = workspace_root(path)?;
    let mut engine = open_engine(&root)?;

    let config = engine.config();
    let options = WatchOptions {
        poll_interval: Duration::from_secs(interval.unwrap_or(config.poll_interval_secs)),
        debounce: Duration::from_secs(config.debounce_secs),
    };

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down after the current entry");
        ctrl_c_cancel.cancel();
    });

    watch(&mut engine, options, cancel).await?;
    Ok(0)
}
