// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry schedule and the rate-limited client decorator.
//!
//! [`Limited`] wraps any [`RemoteClient`]: every call waits for the shared
//! [`RateLimiter`], runs under a per-attempt timeout, and transient failures
//! are retried on an exponential schedule with jitter. Permanent failures
//! return immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::RemoteId;
use tracing::debug;

use crate::client::RemoteClient;
use crate::limiter::RateLimiter;
use crate::types::{ContentPatch, Created, NodeKind, RemoteDoc, RemoteError, RemoteNode};

/// Source of jitter units in `[-1, 1]`.
pub trait Jitter: Send + Sync {
    fn unit(&self) -> f64;
}

/// Jitter derived from the system clock's sub-second nanos.
#[derive(Clone, Copy, Default)]
pub struct SystemJitter;

impl Jitter for SystemJitter {
    fn unit(&self) -> f64 {
        let nanos = std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        (f64::from(nanos) / 999_999_999.0) * 2.0 - 1.0
    }
}

/// Deterministic jitter for tests.
#[derive(Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn unit(&self) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

/// Exponential backoff parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base: Duration,
    /// Backoff ceiling.
    pub cap: Duration,
    /// Fraction of the delay the jitter unit scales (±).
    pub jitter_frac: f64,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(64),
            jitter_frac: 0.25,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after attempt `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped, then jittered by `unit`.
    pub fn delay(&self, attempt: u32, unit: f64) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let capped = exp.min(self.cap.as_secs_f64());
        let jittered = capped * (1.0 + self.jitter_frac * unit.clamp(-1.0, 1.0));
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Rate-limited, retrying wrapper around a transport client.
pub struct Limited<C> {
    inner: C,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    jitter: Arc<dyn Jitter>,
}

impl<C> Limited<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::default()),
            policy: RetryPolicy::default(),
            jitter: Arc::new(SystemJitter),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    async fn call<T, F, Fut>(&self, op: F) -> Result<T, RemoteError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
    {
        let mut attempt = 1u32;
        loop {
            let permit = self.limiter.acquire().await;
            let outcome = tokio::time::timeout(self.policy.attempt_timeout, op()).await;
            drop(permit);

            let err = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => RemoteError::Timeout(self.policy.attempt_timeout),
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.policy.max_attempts {
                return Err(RemoteError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let mut delay = self.policy.delay(attempt, self.jitter.unit());
            if let RemoteError::Throttled { retry_after: Some(after) } = &err {
                if *after > delay {
                    delay = *after;
                }
            }
            debug!(attempt, ?delay, error = %err, "retrying remote call");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl<C: RemoteClient> RemoteClient for Limited<C> {
    async fn fetch_tree(&self, root: &RemoteId) -> Result<Vec<RemoteNode>, RemoteError> {
        self.call(|| self.inner.fetch_tree(root)).await
    }

    async fn fetch_content(&self, id: &RemoteId) -> Result<RemoteDoc, RemoteError> {
        self.call(|| self.inner.fetch_content(id)).await
    }

    async fn create(
        &self,
        parent: &RemoteId,
        kind: NodeKind,
        title: &str,
        content: &ContentPatch,
    ) -> Result<Created, RemoteError> {
        self.call(|| self.inner.create(parent, kind, title, content)).await
    }

    async fn update(
        &self,
        id: &RemoteId,
        patch: &ContentPatch,
    ) -> Result<DateTime<Utc>, RemoteError> {
        self.call(|| self.inner.update(id, patch)).await
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RemoteError> {
        self.call(|| self.inner.delete(id)).await
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
