// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! folio-remote: typed, rate-limited access to the remote document service.

mod client;
mod http;
mod limiter;
mod retry;
mod types;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use client::RemoteClient;
pub use http::HttpRemote;
pub use limiter::RateLimiter;
pub use retry::{FixedJitter, Jitter, Limited, RetryPolicy, SystemJitter};
pub use types::{ContentPatch, Created, NodeKind, RemoteDoc, RemoteError, RemoteNode};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRemote;
