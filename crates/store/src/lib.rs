// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! folio-store: durable sync state and the workspace lock.

mod db;
mod lock;

pub use db::{StateDb, StateError, Txn, CURRENT_STATE_VERSION};
pub use lock::{LockError, WorkspaceLock};
