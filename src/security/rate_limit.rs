//! Sliding-window login rate limiter.
//!
//! Each key (a client IP) owns an append-only log of `(timestamp, count)`
//! entries. A check sums the entries inside the trailing window. Stale
//! entries are purged lazily, at most once per cleanup interval.
//!
//! Check-then-record is not atomic: two concurrent failed logins from the
//! same IP may both pass a check before either is recorded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Minimum time between two cleanup passes.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Entries at least this old are dropped by cleanup.
pub const RETENTION: Duration = Duration::from_secs(3600);

/// Outcome of [`RateLimiter::check_rate_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Attempts inside the window.
    pub attempts: u32,
    /// Seconds until the oldest in-window attempt expires; 0 when allowed.
    pub retry_after_secs: u64,
}

struct LimiterState {
    attempts: HashMap<String, Vec<(Instant, u32)>>,
    last_cleanup: Instant,
}

/// Per-key attempt log over a trailing window.
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                attempts: HashMap::new(),
                last_cleanup: now,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether `key` may make another attempt.
    ///
    /// Read-only apart from the periodic cleanup.
    pub fn check_rate_limit(&self, key: &str, max_attempts: u32, window: Duration) -> RateLimitDecision {
        self.check_rate_limit_at(key, max_attempts, window, Instant::now())
    }

    pub(crate) fn check_rate_limit_at(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
        now: Instant,
    ) -> RateLimitDecision {
        let mut state = self.lock();
        state.cleanup_if_due(now);

        let entries = state.attempts.get(key).map(Vec::as_slice).unwrap_or_default();
        let attempts = sum_in_window(entries, window, now);

        if attempts >= max_attempts {
            let retry_after_secs = entries
                .iter()
                .filter(|(ts, _)| in_window(*ts, window, now))
                .map(|(ts, _)| *ts)
                .min()
                .map(|oldest| retry_after(oldest, window, now))
                .unwrap_or(0);

            RateLimitDecision {
                allowed: false,
                attempts,
                retry_after_secs,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                attempts,
                retry_after_secs: 0,
            }
        }
    }

    /// Append an attempt for `key`.
    pub fn record_attempt(&self, key: &str, count: u32) {
        self.record_attempt_at(key, count, Instant::now());
    }

    pub(crate) fn record_attempt_at(&self, key: &str, count: u32, now: Instant) {
        self.lock()
            .attempts
            .entry(key.to_string())
            .or_default()
            .push((now, count));
    }

    /// Forget every attempt recorded for `key`.
    pub fn reset_key(&self, key: &str) {
        if self.lock().attempts.remove(key).is_some() {
            tracing::debug!(key, "Rate limit history cleared");
        }
    }

    /// Attempts for `key` inside the trailing window.
    pub fn get_attempts(&self, key: &str, window: Duration) -> u32 {
        self.get_attempts_at(key, window, Instant::now())
    }

    pub(crate) fn get_attempts_at(&self, key: &str, window: Duration, now: Instant) -> u32 {
        let state = self.lock();
        let entries = state.attempts.get(key).map(Vec::as_slice).unwrap_or_default();
        sum_in_window(entries, window, now)
    }

    /// Number of keys with retained history.
    pub fn tracked_keys(&self) -> usize {
        self.lock().attempts.len()
    }

    #[cfg(test)]
    fn force_cleanup_at(&self, now: Instant) {
        self.lock().cleanup(now);
    }
}

impl LimiterState {
    fn cleanup_if_due(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_cleanup) >= CLEANUP_INTERVAL {
            self.cleanup(now);
        }
    }

    fn cleanup(&mut self, now: Instant) {
        for entries in self.attempts.values_mut() {
            entries.retain(|(ts, _)| now.saturating_duration_since(*ts) < RETENTION);
        }
        self.attempts.retain(|_, entries| !entries.is_empty());
        self.last_cleanup = now;
        tracing::info!(active_keys = self.attempts.len(), "Rate limiter cleanup completed");
    }
}

fn in_window(ts: Instant, window: Duration, now: Instant) -> bool {
    now.saturating_duration_since(ts) < window
}

fn sum_in_window(entries: &[(Instant, u32)], window: Duration, now: Instant) -> u32 {
    entries
        .iter()
        .filter(|(ts, _)| in_window(*ts, window, now))
        .fold(0u32, |acc, (_, count)| acc.saturating_add(*count))
}

/// Whole seconds until `oldest` leaves the window, rounded up, at least 1.
fn retry_after(oldest: Instant, window: Duration, now: Instant) -> u64 {
    let remaining = window.saturating_sub(now.saturating_duration_since(oldest));
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);
    const IP: &str = "203.0.113.7";

    #[test]
    fn blocks_after_max_attempts() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        for _ in 0..3 {
            limiter.record_attempt_at(IP, 1, t0);
        }

        let decision = limiter.check_rate_limit_at(IP, 3, WINDOW, t0 + Duration::from_secs(5));
        assert!(!decision.allowed);
        assert_eq!(decision.attempts, 3);
        assert!((1..=60).contains(&decision.retry_after_secs));
        assert_eq!(decision.retry_after_secs, 55);
    }

    #[test]
    fn allows_below_max() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        limiter.record_attempt_at(IP, 1, t0);
        limiter.record_attempt_at(IP, 1, t0);

        let decision = limiter.check_rate_limit_at(IP, 3, WINDOW, t0);
        assert_eq!(
            decision,
            RateLimitDecision {
                allowed: true,
                attempts: 2,
                retry_after_secs: 0
            }
        );
    }

    #[test]
    fn retry_after_rounds_up_and_never_reaches_zero() {
        let t0 = Instant::now();
        assert_eq!(retry_after(t0, WINDOW, t0 + Duration::from_millis(59_500)), 1);
        assert_eq!(retry_after(t0, WINDOW, t0 + Duration::from_millis(500)), 60);
        assert_eq!(retry_after(t0, WINDOW, t0), 60);
    }

    #[test]
    fn reset_clears_history() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        for _ in 0..3 {
            limiter.record_attempt_at(IP, 1, t0);
        }
        limiter.reset_key(IP);

        let decision = limiter.check_rate_limit_at(IP, 3, WINDOW, t0);
        assert!(decision.allowed);
        assert_eq!(decision.attempts, 0);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn entries_leave_the_window() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        limiter.record_attempt_at(IP, 1, t0);

        let later = t0 + WINDOW + Duration::from_secs(1);
        assert_eq!(limiter.get_attempts_at(IP, WINDOW, later), 0);
        assert_eq!(limiter.check_rate_limit_at(IP, 3, WINDOW, later).attempts, 0);

        let inside = t0 + Duration::from_secs(30);
        assert_eq!(limiter.get_attempts_at(IP, WINDOW, inside), 1);
        assert_eq!(limiter.check_rate_limit_at(IP, 3, WINDOW, inside).attempts, 1);
    }

    #[test]
    fn counts_are_summed() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        limiter.record_attempt_at(IP, 2, t0);
        limiter.record_attempt_at(IP, 1, t0);

        let decision = limiter.check_rate_limit_at(IP, 3, WINDOW, t0);
        assert!(!decision.allowed);
        assert_eq!(decision.attempts, 3);
    }

    #[test]
    fn keys_are_independent() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        for _ in 0..3 {
            limiter.record_attempt_at(IP, 1, t0);
        }
        assert!(limiter.check_rate_limit_at("198.51.100.1", 3, WINDOW, t0).allowed);
    }

    #[test]
    fn forced_cleanup_drops_old_entries_and_empty_keys() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        limiter.record_attempt_at("stale", 1, t0);
        limiter.record_attempt_at(IP, 1, t0);
        limiter.record_attempt_at(IP, 1, t0 + Duration::from_secs(3000));

        let now = t0 + RETENTION + Duration::from_secs(1);
        limiter.force_cleanup_at(now);

        assert_eq!(limiter.tracked_keys(), 1);
        let state = limiter.lock();
        let kept = &state.attempts[IP];
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, t0 + Duration::from_secs(3000));
    }

    #[test]
    fn cleanup_runs_lazily_on_check() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(t0);
        limiter.record_attempt_at("stale", 1, t0);

        // Before the interval elapses nothing is purged.
        limiter.check_rate_limit_at(IP, 3, WINDOW, t0 + Duration::from_secs(10));
        assert_eq!(limiter.tracked_keys(), 1);

        limiter.check_rate_limit_at(IP, 3, WINDOW, t0 + RETENTION + CLEANUP_INTERVAL);
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
