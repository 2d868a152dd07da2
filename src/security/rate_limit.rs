//! Fixed-window rate limiting keyed by caller origin.
//!
//! Rollover is lazy: a bucket's window is re-evaluated when the origin next
//! shows up, there is no background sweeper. The check-and-increment runs
//! while holding the map shard's write lock, so two requests racing for the
//! last slot can never both be admitted.

use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub permitted: bool,
    /// Time left in the current window when not permitted.
    pub retry_after: Option<Duration>,
}

impl RateDecision {
    fn permitted() -> Self {
        Self { permitted: true, retry_after: None }
    }

    fn blocked(retry_after: Duration) -> Self {
        Self { permitted: false, retry_after: Some(retry_after) }
    }
}

/// Per-origin counters for the current window.
#[derive(Debug)]
struct WindowBucket {
    window_start: Instant,
    count: u32,
}

impl WindowBucket {
    fn new(now: Instant) -> Self {
        Self { window_start: now, count: 0 }
    }

    /// `None` when the window reaches past what `Instant` can represent; such
    /// a window never closes.
    fn window_end(&self, window: Duration) -> Option<Instant> {
        self.window_start.checked_add(window)
    }

    fn try_acquire(&mut self, now: Instant, limit: u32, window: Duration) -> RateDecision {
        if self.expired(now, window) {
            self.window_start = now;
            self.count = 0;
        }

        if self.count < limit {
            self.count += 1;
            RateDecision::permitted()
        } else {
            let retry_after = match self.window_end(window) {
                Some(end) => end.saturating_duration_since(now),
                None => window,
            };
            RateDecision::blocked(retry_after)
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        self.window_end(window).is_some_and(|end| now >= end)
    }
}

/// Fixed-window limiter: `limit` requests per `window` for each origin.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<IpAddr, WindowBucket>,
    limit: u32,
    window: Duration,
    max_tracked: usize,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            limit,
            window,
            max_tracked: usize::MAX,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            max_tracked: config.max_tracked_origins,
            ..Self::new(config.limit, Duration::from_secs(config.window_secs))
        }
    }

    /// Count one request from `origin` and report whether it may proceed.
    pub fn allow(&self, origin: IpAddr) -> RateDecision {
        let now = Instant::now();

        if self.buckets.len() >= self.max_tracked && !self.buckets.contains_key(&origin) {
            self.prune_expired(now);
        }

        let decision = self
            .buckets
            .entry(origin)
            .or_insert_with(|| WindowBucket::new(now))
            .try_acquire(now, self.limit, self.window);

        metrics::record_rate_limit_buckets(self.buckets.len());
        decision
    }

    /// Drop buckets whose window has already elapsed.
    pub fn prune_expired(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, bucket| !bucket.expired(now, window));
    }

    /// Number of origins currently holding a bucket.
    pub fn tracked_origins(&self) -> usize {
        self.buckets.len()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
