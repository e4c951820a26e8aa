// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers. Each returns the process exit code or an [`ExitError`].

pub mod init;
pub mod list;
pub mod resolve;
pub mod run;
pub mod status;
pub mod watch;

use std::path::{Path, PathBuf};

use folio_core::{discover_workspace, SystemClock, WorkspaceConfig};
use folio_engine::{SyncEngine, SyncReport};
use folio_remote::{HttpRemote, Limited};

use crate::exit_error::{ExitError, EXIT_CONFLICTS, EXIT_REMOTE};
use crate::registry::GlobalConfig;
use crate::env;

pub type Client = Limited<HttpRemote>;
pub type Engine = SyncEngine<Client, SystemClock>;

/// Explicit `--path`, or the nearest workspace above the current directory.
pub fn workspace_root(flag: Option<&Path>) -> Result<PathBuf, ExitError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| ExitError::usage(format!("cannot read current directory: {e}")))?;
    discover_workspace(&cwd).ok_or_else(|| {
        ExitError::usage("not inside a folio workspace (run `folio init` first)")
    })
}

/// Credential from `FOLIO_TOKEN` or the global config; API endpoint from
/// `FOLIO_API_URL`, the global config, or the remote URL's origin.
pub fn build_client(config: &WorkspaceConfig) -> Result<Client, ExitError> {
    let global = GlobalConfig::load(&env::config_dir())?;
    let token = env::token().or(global.token).ok_or_else(|| {
        ExitError::remote("no credential found: set FOLIO_TOKEN or `token` in the global config")
    })?;
    let api = env::api_url()
        .or(global.api_url)
        .or_else(|| config.remote_url.as_deref().and_then(origin))
        .ok_or_else(|| {
            ExitError::usage("no API endpoint: set FOLIO_API_URL or `api_url` in the global config")
        })?;
    let http = HttpRemote::new(&api, &token).map_err(|e| ExitError::remote(e.to_string()))?;
    Ok(Limited::new(http))
}

pub fn open_engine(root: &Path) -> Result<Engine, ExitError> {
    let config = WorkspaceConfig::load(root).map_err(|e| ExitError::usage(e.to_string()))?;
    let client = build_client(&config)?;
    SyncEngine::open(root, client, SystemClock).map_err(ExitError::from)
}

fn origin(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split('/').next()?;
    if host.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{host}/"))
}

pub fn print_report(report: &SyncReport) {
    for path in &report.synced {
        println!("synced    {path}");
    }
    for path in &report.flagged {
        println!("flagged   {path}");
    }
    for path in &report.conflicts {
        println!("conflict  {path}");
    }
    for failure in &report.failed {
        eprintln!("failed    {}: {}", failure.path, failure.message);
    }
    println!(
        "{} synced, {} conflicts, {} failed",
        report.synced.len(),
        report.conflicts.len(),
        report.failed.len()
    );
}

/// Conflicts dominate the exit code; remaining failures surface as remote
/// failures.
pub fn report_exit(report: &SyncReport) -> i32 {
    if report.has_conflicts() {
        EXIT_CONFLICTS
    } else if report.has_failures() {
        EXIT_REMOTE
    } else {
        0
    }
}
