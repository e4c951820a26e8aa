// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide rate limiter for one workspace's remote traffic.
//!
//! Two knobs: bounded concurrency (semaphore) and minimum spacing between
//! request starts. Both gates must pass before a call goes out.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Default in-flight bound.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 3;
/// Default minimum spacing between request starts (~3 req/s).
pub const DEFAULT_SPACING: Duration = Duration::from_millis(340);

pub struct RateLimiter {
    semaphore: Semaphore,
    spacing: Duration,
    /// Earliest instant the next request may start.
    next_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_in_flight: usize, spacing: Duration) -> Self {
        Self {
            semaphore: Semaphore::new(max_in_flight),
            spacing,
            next_start: Mutex::new(None),
        }
    }

    /// Wait for a concurrency slot and this request's start time.
    pub async fn acquire(&self) -> LimiterPermit<'_> {
        // The semaphore is never closed, so acquire only fails after close.
        let Ok(permit) = self.semaphore.acquire().await else {
            unreachable!("rate limiter semaphore closed")
        };

        let start = {
            let mut next = self.next_start.lock();
            let now = Instant::now();
            let start = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(start + self.spacing);
            start
        };
        tokio::time::sleep_until(start).await;

        LimiterPermit { _permit: permit }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT, DEFAULT_SPACING)
    }
}

/// Held for the duration of one outbound call.
pub struct LimiterPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
