// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! folio-engine: snapshots, the pure reconciler, the sync engine, and the
//! watch daemon.

mod engine;
mod reconcile;
mod snapshot;
mod watcher;

pub use engine::{init_workspace, EngineError, EntryFailure, StatusReport, SyncEngine, SyncReport};
pub use reconcile::{
    decide, reconcile, ConflictReason, Decision, LocalSide, Mode, Plan, PlannedAction, RemoteSide,
};
pub use snapshot::{walk_local, LocalDoc, LocalSnapshot, RemoteSnapshot, RemoteTreeDoc};
pub use watcher::{watch, WatchOptions};
