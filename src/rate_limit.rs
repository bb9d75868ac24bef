//! In-memory per-IP rate limiting.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<IpAddr, VecDeque<Instant>>`.
//! Two instances run side by side: one guards `POST /api/chat`
//! (20 requests/min by default), the other every `/api` route
//! (100 requests/15 min by default).
//!
//! Check and record happen under one lock, so concurrent requests from the
//! same client cannot both squeeze into the last slot.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateWindow;

/// Sweep idle clients once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("rate limit exceeded (max {limit} requests/{window_secs}s)")]
pub struct RateLimitError {
    pub limit: usize,
    pub window_secs: u64,
    /// Seconds until the oldest counted request leaves the window.
    pub retry_after_secs: u64,
}

impl crate::error::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    config: RateWindow,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateWindow) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), config }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.config.limit
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Check the client's window, then record the request.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the client already used its budget.
    pub fn check_and_record(&self, client: IpAddr) -> Result<(), RateLimitError> {
        self.check_and_record_at(client, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, client: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        if inner.len() > SWEEP_THRESHOLD {
            inner.retain(|_, deque| {
                prune_window(deque, now, cfg.window);
                !deque.is_empty()
            });
        }

        let deque = inner.entry(client).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.limit {
            let retry_after = deque
                .front()
                .map_or(cfg.window, |&oldest| cfg.window.saturating_sub(now.duration_since(oldest)));
            return Err(RateLimitError {
                limit: cfg.limit,
                window_secs: cfg.window.as_secs(),
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        deque.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
