//! Credential Guard: brute-force lockout for the staff plane.
//!
//! Per-source failed-attempt counters behind a concurrent map. Five
//! failures lock the source out for fifteen minutes measured from its last
//! failure; each further failure inside the window refreshes it. A success
//! deletes the counter immediately.
//!
//! The guard is an owned, injectable object: construct one per runtime,
//! hand out `Arc` clones. Source identifiers are best-effort (usually the
//! peer IP) and spoofable; this bounds exposure from a single source, it is
//! not a defense against a distributed attacker.

use dashmap::DashMap;
use shared_types::{Clock, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lockout policy.
#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    /// Failures before lockout engages.
    pub max_attempts: u32,
    /// Lockout window, measured from the last failed attempt.
    pub lockout_window: Duration,
    /// How often the housekeeping sweep runs.
    pub sweep_interval: Duration,
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_window: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of a pre-login check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCheck {
    Allowed,
    /// Locked; retry after the given duration.
    LockedOut { retry_after: Duration },
}

#[derive(Debug, Clone)]
struct AttemptCounter {
    count: u32,
    last_attempt: Timestamp,
}

/// Per-source failed-login tracking with lockout and auto-expiry.
pub struct LoginGuard {
    attempts: DashMap<String, AttemptCounter>,
    config: LoginGuardConfig,
    clock: Arc<dyn Clock>,
}

impl LoginGuard {
    pub fn new(config: LoginGuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: DashMap::new(),
            config,
            clock,
        }
    }

    /// Check whether `source` may attempt a login right now.
    ///
    /// A counter whose window has fully elapsed is treated as gone (and
    /// removed); the sweep is not required for correctness.
    pub fn check(&self, source: &str) -> LoginCheck {
        let now = self.clock.now();
        let window = chrono_window(self.config.lockout_window);

        let locked_remaining = match self.attempts.get(source) {
            Some(counter) if counter.count >= self.config.max_attempts => {
                let elapsed = now - counter.last_attempt;
                if elapsed < window {
                    Some(window - elapsed)
                } else {
                    None
                }
            }
            _ => return LoginCheck::Allowed,
        };

        match locked_remaining {
            Some(remaining) => LoginCheck::LockedOut {
                retry_after: remaining.to_std().unwrap_or(Duration::ZERO),
            },
            None => {
                // Lockout elapsed with no further attempts; forget it.
                self.attempts.remove(source);
                LoginCheck::Allowed
            }
        }
    }

    /// Record the outcome of an attempt. Success deletes the counter;
    /// failure increments it and refreshes the window.
    pub fn record(&self, source: &str, success: bool) {
        if success {
            self.attempts.remove(source);
            return;
        }

        let now = self.clock.now();
        let mut entry = self
            .attempts
            .entry(source.to_string())
            .or_insert(AttemptCounter {
                count: 0,
                last_attempt: now,
            });
        entry.count = entry.count.saturating_add(1);
        entry.last_attempt = now;

        if entry.count >= self.config.max_attempts {
            warn!(source, attempts = entry.count, "login source locked out");
        }
    }

    /// Purge counters whose last attempt is outside the lockout window.
    /// Pure housekeeping; returns the number of counters removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = chrono_window(self.config.lockout_window);
        let before = self.attempts.len();
        self.attempts
            .retain(|_, counter| now - counter.last_attempt < window);
        let removed = before - self.attempts.len();
        if removed > 0 {
            debug!(removed, "swept stale login counters");
        }
        removed
    }

    /// Spawn the periodic housekeeping sweep. The task runs until the
    /// guard is dropped by every other holder.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let guard = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match guard.upgrade() {
                    Some(guard) => {
                        guard.sweep();
                    }
                    None => break,
                }
            }
        })
    }

    /// Number of tracked sources (tests and diagnostics).
    pub fn tracked_sources(&self) -> usize {
        self.attempts.len()
    }
}

fn chrono_window(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::minutes(15))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_types::ManualClock;

    fn guard() -> (Arc<LoginGuard>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let guard = Arc::new(LoginGuard::new(
            LoginGuardConfig::default(),
            Arc::new(clock.clone()),
        ));
        (guard, clock)
    }

    #[test]
    fn five_failures_lock_the_source() {
        let (guard, _clock) = guard();
        for _ in 0..5 {
            assert_eq!(guard.check("1.2.3.4"), LoginCheck::Allowed);
            guard.record("1.2.3.4", false);
        }
        assert!(matches!(
            guard.check("1.2.3.4"),
            LoginCheck::LockedOut { .. }
        ));
    }

    #[test]
    fn success_resets_the_counter() {
        let (guard, _clock) = guard();
        for _ in 0..3 {
            guard.record("1.2.3.4", false);
        }
        guard.record("1.2.3.4", true);
        assert_eq!(guard.tracked_sources(), 0);

        // A fresh run of failures is needed to lock again.
        for _ in 0..4 {
            guard.record("1.2.3.4", false);
        }
        assert_eq!(guard.check("1.2.3.4"), LoginCheck::Allowed);
    }

    #[test]
    fn lockout_expires_after_the_window() {
        let (guard, clock) = guard();
        for _ in 0..5 {
            guard.record("1.2.3.4", false);
        }
        assert!(matches!(
            guard.check("1.2.3.4"),
            LoginCheck::LockedOut { .. }
        ));

        clock.advance(chrono::Duration::minutes(15) + chrono::Duration::seconds(1));
        assert_eq!(guard.check("1.2.3.4"), LoginCheck::Allowed);
    }

    #[test]
    fn failure_during_lockout_refreshes_the_window() {
        let (guard, clock) = guard();
        for _ in 0..5 {
            guard.record("1.2.3.4", false);
        }

        clock.advance(chrono::Duration::minutes(10));
        guard.record("1.2.3.4", false);

        // 14 minutes after the refresh the lock still holds.
        clock.advance(chrono::Duration::minutes(14));
        assert!(matches!(
            guard.check("1.2.3.4"),
            LoginCheck::LockedOut { .. }
        ));
    }

    #[test]
    fn sources_are_independent() {
        let (guard, _clock) = guard();
        for _ in 0..5 {
            guard.record("1.2.3.4", false);
        }
        assert_eq!(guard.check("5.6.7.8"), LoginCheck::Allowed);
    }

    #[test]
    fn sweep_purges_only_stale_counters() {
        let (guard, clock) = guard();
        guard.record("old", false);
        clock.advance(chrono::Duration::minutes(20));
        guard.record("fresh", false);

        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.tracked_sources(), 1);
    }

    #[test]
    fn lockout_reports_remaining_time() {
        let (guard, clock) = guard();
        for _ in 0..5 {
            guard.record("1.2.3.4", false);
        }
        clock.advance(chrono::Duration::minutes(6));

        match guard.check("1.2.3.4") {
            LoginCheck::LockedOut { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(9 * 60));
            }
            other => panic!("expected lockout, got {other:?}"),
        }
    }
}
