// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch mode: debounced local change events plus a periodic remote poll,
//! both feeding one sync queue.
//!
//! Events that arrive during a run batch into the next window; a run is
//! never preempted mid-entry (cancellation is checked between entries).

use std::path::PathBuf;
use std::time::Duration;

use folio_core::config::META_DIR;
use folio_core::Clock;
use folio_remote::RemoteClient;
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, SyncEngine};
use crate::reconcile::Mode;

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Seconds between remote polls.
    pub poll_interval: Duration,
    /// Quiet window before a batched sync runs.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(30), debounce: Duration::from_secs(2) }
    }
}

/// Run the watch loop until `cancel` fires.
pub async fn watch<C: RemoteClient, K: Clock>(
    engine: &mut SyncEngine<C, K>,
    options: WatchOptions,
    cancel: CancellationToken,
) -> Result<(), EngineError> {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<PathBuf>(64);
    let meta_dir = engine.root().join(META_DIR);

    let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, _>| {
        let Ok(event) = res else { return };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        for path in event.paths {
            // Our own metadata churn (state commits, lock) is not an edit.
            if path.starts_with(&meta_dir) {
                continue;
            }
            let _ = tx.blocking_send(path);
        }
    })?;
    watcher.watch(engine.root(), RecursiveMode::Recursive)?;
    info!(root = %engine.root().display(), "watching for changes");

    let mut poll = tokio::time::interval(options.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // interval fires immediately once; consume it so the first poll waits.
    poll.tick().await;

    let mut deadline: Option<tokio::time::Instant> = None;
    loop {
        // `deadline` is Copy; the future owns its own snapshot so the
        // select arms below stay free to reschedule it.
        let debounce_due = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("watch cancelled");
                return Ok(());
            }
            changed = rx.recv() => {
                if let Some(path) = changed {
                    debug!(path = %path.display(), "local change");
                    deadline = Some(tokio::time::Instant::now() + options.debounce);
                }
            }
            _ = poll.tick() => {
                match engine.remote_changed().await {
                    Ok(true) => {
                        debug!("remote changed, queueing sync");
                        deadline = Some(tokio::time::Instant::now() + options.debounce);
                    }
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "remote poll failed"),
                }
            }
            _ = debounce_due, if deadline.is_some() => {
                deadline = None;
                match engine.run(Mode::Sync, &cancel).await {
                    Ok(report) => info!(
                        synced = report.synced.len(),
                        conflicts = report.conflicts.len(),
                        failed = report.failed.len(),
                        "watch sync complete"
                    ),
                    // Transient failures leave state untouched; the next
                    // event or poll retries.
                    Err(e) => warn!(error = %e, "watch sync failed"),
                }
                // Drain events that arrived mid-run into a fresh window.
                let mut batched = false;
                while rx.try_recv().is_ok() {
                    batched = true;
                }
                if batched {
                    deadline = Some(tokio::time::Instant::now() + options.debounce);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
