//! Rate-limit handling
//!
//! `ThrottleGuard` remembers the deadline announced by the last 429 so that
//! later requests fail fast instead of hitting the server. `RetryPolicy`
//! decides whether a throttled request may sleep and retry once.
//!
//! The deadline only moves later: a 429 announcing a shorter delay than the
//! one already in force never shortens the window. It is cleared by the
//! first successful response received after it has elapsed.

use std::time::Duration;

use common::ApiResponse;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ThrottleError;

/// Delay used when a 429 carries no usable `Retry-After` header.
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_secs(30);

/// Longest throttle window honoured from a `Retry-After` header (one day).
pub const MAX_THROTTLE_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default)]
pub struct ThrottleGuard {
    deadline: RwLock<Option<Instant>>,
}

impl ThrottleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a prevented `ThrottleError` while the deadline is ahead.
    ///
    /// The reported delay is the remaining wait rounded up to whole seconds.
    pub async fn check(&self) -> Result<(), ThrottleError> {
        let Some(deadline) = *self.deadline.read().await else {
            return Ok(());
        };
        let now = Instant::now();
        if deadline <= now {
            return Ok(());
        }
        Err(ThrottleError::prevented(round_up_secs(deadline - now), deadline))
    }

    /// Push the deadline to `deadline` unless a later one is already set.
    /// Returns the deadline now in force.
    pub async fn extend(&self, deadline: Instant) -> Instant {
        let mut current = self.deadline.write().await;
        let effective = match *current {
            Some(existing) if existing >= deadline => existing,
            _ => deadline,
        };
        *current = Some(effective);
        effective
    }

    /// Forget the deadline once it has passed.
    pub async fn clear_elapsed(&self) {
        if self.deadline.read().await.is_none() {
            return;
        }
        let mut current = self.deadline.write().await;
        if current.is_some_and(|d| d <= Instant::now()) {
            debug!("throttle window elapsed");
            *current = None;
        }
    }

    pub async fn deadline(&self) -> Option<Instant> {
        *self.deadline.read().await
    }
}

/// Bounded auto-retry for throttled requests: at most one retry, and only
/// when the server-specified delay fits in the configured budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_auto_retry_delay: Option<Duration>,
}

impl RetryPolicy {
    /// `None` or a zero budget disables auto-retry.
    pub fn new(max_auto_retry_delay: Option<Duration>) -> Self {
        Self {
            max_auto_retry_delay,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn max_auto_retry_delay(&self) -> Option<Duration> {
        self.max_auto_retry_delay
    }

    /// Whether a request throttled for `delay` should sleep and retry.
    pub fn allows(&self, delay: Duration) -> bool {
        match self.max_auto_retry_delay {
            Some(budget) if !budget.is_zero() => delay <= budget,
            _ => false,
        }
    }
}

/// Delay requested by a 429 response: integer `Retry-After` seconds capped
/// at `MAX_THROTTLE_DELAY`, else `DEFAULT_THROTTLE_DELAY`.
pub fn retry_after(response: &ApiResponse) -> Duration {
    response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_THROTTLE_DELAY))
        .unwrap_or(DEFAULT_THROTTLE_DELAY)
}

fn round_up_secs(wait: Duration) -> Duration {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    Duration::from_secs(secs)
}
