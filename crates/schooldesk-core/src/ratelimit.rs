//! Per-client request rate limiting.
//!
//! [`FixedWindowLimiter`] counts requests per key in fixed windows. Keys are
//! built by the caller from client identity and route, so one noisy client
//! cannot exhaust another client's budget.
//!
//! Client identity comes from headers the caller controls, so the table is
//! bounded: at most `capacity` keys are tracked individually. When the table
//! is full, expired windows are swept (at most once per window length) and
//! any key that still does not fit shares a single overflow window. Clients
//! already tracked keep their own budget while the table is flooded.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default number of keys tracked individually.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests permitted per window.
    pub limit: u32,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// A rate-limiting policy keyed by an opaque string.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key` and report whether it may proceed.
    async fn check(&self, key: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

impl Window {
    fn starting(now: Instant) -> Self {
        Self {
            started_at: now,
            count: 0,
        }
    }
}

#[derive(Debug)]
struct Table {
    windows: HashMap<String, Window>,
    overflow: Window,
    last_sweep: Instant,
}

impl Table {
    /// Drop expired windows, unless a sweep already ran within `span`.
    fn sweep(&mut self, now: Instant, span: Duration) {
        if now.duration_since(self.last_sweep) < span {
            return;
        }
        self.last_sweep = now;
        self.windows
            .retain(|_, w| now.duration_since(w.started_at) < span);
    }
}

/// Fixed-window counter per key, bounded to `capacity` keys.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    capacity: usize,
    table: Mutex<Table>,
}

impl FixedWindowLimiter {
    /// Limiter admitting `max_requests` per `window`, tracking up to
    /// [`DEFAULT_CAPACITY`] keys.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let now = Instant::now();
        Self {
            max_requests,
            window,
            capacity: DEFAULT_CAPACITY,
            table: Mutex::new(Table {
                windows: HashMap::new(),
                overflow: Window::starting(now),
                last_sweep: now,
            }),
        }
    }

    /// Set how many keys are tracked individually (at least one).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of keys currently tracked individually.
    pub async fn tracked_keys(&self) -> usize {
        self.table.lock().await.windows.len()
    }

    fn admit(&self, window: &mut Window, now: Instant) -> RateLimitDecision {
        if now.duration_since(window.started_at) >= self.window {
            *window = Window::starting(now);
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(window.started_at));

        if window.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_after,
            };
        }

        window.count = window.count.saturating_add(1);
        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_after,
        }
    }
}

#[async_trait::async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut guard = self.table.lock().await;
        let table = &mut *guard;

        let tracked = table.windows.contains_key(key);
        if !tracked && table.windows.len() >= self.capacity {
            table.sweep(now, self.window);
        }

        let window = if tracked || table.windows.len() < self.capacity {
            table
                .windows
                .entry(key.to_owned())
                .or_insert_with(|| Window::starting(now))
        } else {
            &mut table.overflow
        };
        self.admit(window, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rejects_after_limit_within_window() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check("10.0.0.1:school").await;
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }

        let denied = limiter.check("10.0.0.1:school").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.limit, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn window_rolls_over() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("k").await.allowed);
        assert!(!limiter.check("k").await.allowed);

        tokio::time::advance(Duration::from_secs(30)).await;
        let denied = limiter.check("k").await;
        assert!(!denied.allowed);
        assert_eq!(denied.reset_after, Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check("k").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a:school").await.allowed);
        assert!(limiter.check("b:school").await.allowed);
        assert!(limiter.check("a:trial").await.allowed);
        assert!(!limiter.check("a:school").await.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_windows_are_swept_when_full() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(1)).with_capacity(100);
        for i in 0..100 {
            limiter.check(&format!("client-{i}")).await;
        }
        assert_eq!(limiter.tracked_keys().await, 100);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(limiter.check("fresh").await.allowed);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_never_exceed_capacity() {
        let limiter = FixedWindowLimiter::new(30, Duration::from_secs(60)).with_capacity(1_000);
        for i in 0..30_000 {
            limiter.check(&format!("198.51.{}.{}:route", i / 256, i % 256)).await;
            if i % 5_000 == 0 {
                tokio::time::advance(Duration::from_secs(1)).await;
            }
        }
        assert_eq!(limiter.tracked_keys().await, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_keys_share_one_budget_and_tracked_keys_keep_theirs() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60)).with_capacity(2);
        assert!(limiter.check("known").await.allowed);
        assert!(limiter.check("other").await.allowed);

        for i in 0..3 {
            assert!(limiter.check(&format!("spoofed-{i}")).await.allowed);
        }
        let denied = limiter.check("spoofed-99").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);

        assert!(limiter.check("known").await.allowed);
        assert_eq!(limiter.tracked_keys().await, 2);
    }
}
