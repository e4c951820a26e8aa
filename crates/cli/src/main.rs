// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! folio: keep a local markdown tree in sync with a remote document store.

mod commands;
mod env;
mod exit_error;
mod registry;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use folio_core::Resolution;
use folio_engine::Mode;
use tracing_subscriber::EnvFilter;

use exit_error::ExitError;

const AFTER_HELP: &str = "Environment:
  FOLIO_TOKEN       credential for the remote service
  FOLIO_API_URL     API endpoint override
  FOLIO_CONFIG_DIR  config directory override
  FOLIO_LOG         log filter (tracing syntax)

Exit codes: 0 success, 1 conflicts present, 2 usage error, 3 remote failure, 4 state corruption";

#[derive(Parser)]
#[command(name = "folio", version, about = "Sync a local markdown tree with a remote document store")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Workspace path (defaults to the nearest workspace above the cwd)
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a workspace bound to a remote root document
    Init {
        /// URL of the remote root document
        remote_url: String,
    },
    /// Apply remote changes locally
    Pull {
        /// Overwrite local modifications
        #[arg(long)]
        force: bool,
    },
    /// Apply local changes to the remote
    Push {
        /// Overwrite remote modifications
        #[arg(long)]
        force: bool,
    },
    /// Pull, then push
    Sync,
    /// Show pending actions without writing anything
    Status {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflicted entry
    #[command(group = ArgGroup::new("resolution").required(true).multiple(false))]
    Resolve {
        /// Workspace-relative path of the conflicted entry
        entry: String,
        /// Local bytes win: push, then mark clean
        #[arg(long, group = "resolution")]
        keep_local: bool,
        /// Remote content wins: overwrite local, mark clean
        #[arg(long, group = "resolution")]
        keep_remote: bool,
        /// Keep a renamed local copy, apply remote as canonical
        #[arg(long, group = "resolution")]
        keep_both: bool,
    },
    /// Watch for local and remote changes, syncing continuously
    Watch {
        /// Seconds between remote polls
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show configured workspaces
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Command::Watch { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env::log_filter(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code());
        }
    }
}

async fn dispatch(cli: Cli) -> Result<i32, ExitError> {
    let path = cli.path.as_deref();
    match cli.command {
        Command::Init { remote_url } => commands::init::handle(&remote_url, path),
        Command::Pull { force } => commands::run::handle(Mode::Pull { force }, path).await,
        Command::Push { force } => commands::run::handle(Mode::Push { force }, path).await,
        Command::Sync => commands::run::handle(Mode::Sync, path).await,
        Command::Status { json } => commands::status::handle(json, path).await,
        Command::Resolve { entry, keep_local, keep_remote, keep_both } => {
            let resolution = if keep_local {
                Resolution::KeepLocal
            } else if keep_remote {
                Resolution::KeepRemote
            } else {
                debug_assert!(keep_both);
                Resolution::KeepBoth
            };
            commands::resolve::handle(&entry, resolution, path).await
        }
        Command::Watch { interval } => commands::watch::handle(interval, path).await,
        Command::List => commands::list::handle(),
    }
}
