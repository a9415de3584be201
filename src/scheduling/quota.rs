// Daily-quota schedule computation
//
// Pure decision logic: given the quota state and a clock reading, produce the
// delay until the next automated dispatch. Owns no timer — see `timer.rs` for
// the cancellable timer and `controller` for the re-arm rules. The scheduler
// itself cannot fail; degenerate budgets are rejected at configuration time.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The 24-hour accounting window, in milliseconds.
pub const CYCLE_MS: i64 = 24 * 60 * 60 * 1000;

/// The 24-hour accounting window bounding the dispatch quota.
pub fn cycle() -> ChronoDuration {
    ChronoDuration::milliseconds(CYCLE_MS)
}

/// Minimum dormant wait when the budget is exhausted.
const DORMANT_CLAMP: Duration = Duration::from_secs(1);

/// Quota accounting for the current cycle.
///
/// `calls_made` is only incremented after a confirmed successful dispatch;
/// failed dispatches leave it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub budget_limit: u32,
    pub calls_made: u32,
    /// Start of the current 24-hour accounting window
    pub cycle_anchor: DateTime<Utc>,
}

impl QuotaState {
    pub fn new(budget_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            budget_limit,
            calls_made: 0,
            cycle_anchor: now,
        }
    }

    /// True when the accounting window has expired.
    pub fn cycle_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.cycle_anchor).num_milliseconds() > CYCLE_MS
    }

    /// Reset the window: zero the counter, anchor at `now`.
    /// Must happen atomically with the counter reset — one method, no halves.
    pub fn reset_cycle(&mut self, now: DateTime<Utc>) {
        self.calls_made = 0;
        self.cycle_anchor = now;
    }
}

/// What the scheduler wants done next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Dispatch immediately (zero-delay warm-up, or clock skew ate the delay)
    FireNow,
    /// Arm one timer for this delay
    WaitFor(Duration),
    /// The cycle is over — caller must `reset_cycle` and recompute
    CycleExpired,
}

/// Compute the next dispatch delay.
///
/// - Expired cycle: `CycleExpired` (caller resets and recomputes).
/// - Budget exhausted: dormant wait until the cycle boundary, clamped to ≥1s.
/// - First call of the cycle: the warm-up delay, so a freshly (re)started
///   system produces visible activity quickly.
/// - Otherwise: remaining time spread evenly over remaining calls, floored at
///   `min_interval` to protect rate-limited downstream dependencies.
pub fn next_decision(
    quota: &QuotaState,
    now: DateTime<Utc>,
    min_interval: Duration,
    warmup_delay: Duration,
) -> ScheduleDecision {
    if quota.cycle_expired(now) {
        return ScheduleDecision::CycleExpired;
    }

    // Anchor in the future (clock skew) counts as zero elapsed.
    let elapsed_ms = (now - quota.cycle_anchor).num_milliseconds().max(0);
    let remaining_ms = CYCLE_MS - elapsed_ms;

    if quota.calls_made >= quota.budget_limit {
        // Dormant until the next cycle, not a dispatch wait.
        let wait = Duration::from_millis(remaining_ms.max(0) as u64);
        return ScheduleDecision::WaitFor(wait.max(DORMANT_CLAMP));
    }

    if quota.calls_made == 0 {
        if warmup_delay.is_zero() {
            return ScheduleDecision::FireNow;
        }
        return ScheduleDecision::WaitFor(warmup_delay);
    }

    let calls_remaining = i64::from(quota.budget_limit - quota.calls_made);
    let even_ms = remaining_ms / calls_remaining;
    let delay = Duration::from_millis(even_ms.max(0) as u64).max(min_interval);
    if delay.is_zero() {
        return ScheduleDecision::FireNow;
    }
    ScheduleDecision::WaitFor(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_INTERVAL: Duration = Duration::from_secs(60);
    const WARMUP: Duration = Duration::from_secs(10);

    fn decide(quota: &QuotaState, now: DateTime<Utc>) -> ScheduleDecision {
        next_decision(quota, now, MIN_INTERVAL, WARMUP)
    }

    #[test]
    fn test_fresh_cycle_uses_warmup_not_even_interval() {
        // budget=10, calls=0, anchor=now: the first delay is the warm-up,
        // not timeRemaining/10 (which would be 2.4h).
        let now = Utc::now();
        let quota = QuotaState::new(10, now);
        assert_eq!(decide(&quota, now), ScheduleDecision::WaitFor(WARMUP));
    }

    #[test]
    fn test_warmup_applies_after_cycle_reset() {
        // Reset zeroes calls_made, so the next delay is the warm-up again.
        let now = Utc::now();
        let mut quota = QuotaState::new(5, now - ChronoDuration::hours(25));
        quota.calls_made = 5;
        quota.reset_cycle(now);
        assert_eq!(decide(&quota, now), ScheduleDecision::WaitFor(WARMUP));
    }

    #[test]
    fn test_zero_warmup_fires_now() {
        let now = Utc::now();
        let quota = QuotaState::new(10, now);
        let decision = next_decision(&quota, now, MIN_INTERVAL, Duration::ZERO);
        assert_eq!(decision, ScheduleDecision::FireNow);
    }

    #[test]
    fn test_even_interval_spreads_remaining_budget() {
        let now = Utc::now();
        let mut quota = QuotaState::new(4, now - ChronoDuration::hours(12));
        quota.calls_made = 1;
        // 12h remaining over 3 calls = 4h each
        match decide(&quota, now) {
            ScheduleDecision::WaitFor(d) => {
                assert_eq!(d, Duration::from_secs(4 * 3600));
            }
            other => panic!("expected WaitFor, got {:?}", other),
        }
    }

    #[test]
    fn test_minimum_interval_floor() {
        let now = Utc::now();
        // 2 minutes left, 5 calls remaining: even interval would be 24s.
        let mut quota = QuotaState::new(6, now - (cycle() - ChronoDuration::minutes(2)));
        quota.calls_made = 1;
        match decide(&quota, now) {
            ScheduleDecision::WaitFor(d) => assert_eq!(d, MIN_INTERVAL),
            other => panic!("expected WaitFor, got {:?}", other),
        }
    }

    #[test]
    fn test_delay_within_bounds_across_cycle() {
        // For calls_made >= 1 within the cycle, min_interval <= d.
        let now = Utc::now();
        for hours_elapsed in [1, 6, 12, 18, 23] {
            for calls_made in 1..10u32 {
                let mut quota = QuotaState::new(10, now - ChronoDuration::hours(hours_elapsed));
                quota.calls_made = calls_made;
                match decide(&quota, now) {
                    ScheduleDecision::WaitFor(d) => {
                        assert!(d >= MIN_INTERVAL, "d={:?} below floor", d);
                        let remaining =
                            Duration::from_secs(((24 - hours_elapsed) * 3600) as u64);
                        // Even-interval never exceeds what's left (the floor may).
                        assert!(
                            d <= remaining.max(MIN_INTERVAL),
                            "d={:?} past remaining={:?}",
                            d,
                            remaining
                        );
                    }
                    other => panic!("expected WaitFor, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_exhausted_budget_waits_until_cycle_boundary() {
        let now = Utc::now();
        let mut quota = QuotaState::new(3, now - ChronoDuration::hours(10));
        quota.calls_made = 3;
        match decide(&quota, now) {
            ScheduleDecision::WaitFor(d) => {
                // Points to (or past) cycle_anchor + 24h
                assert_eq!(d, Duration::from_secs(14 * 3600));
            }
            other => panic!("expected WaitFor, got {:?}", other),
        }
    }

    #[test]
    fn test_exhausted_budget_near_boundary_clamps_to_one_second() {
        let now = Utc::now();
        let mut quota = QuotaState::new(3, now - (cycle() - ChronoDuration::milliseconds(5)));
        quota.calls_made = 3;
        match decide(&quota, now) {
            ScheduleDecision::WaitFor(d) => assert_eq!(d, Duration::from_secs(1)),
            other => panic!("expected WaitFor, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_cycle_detected() {
        let now = Utc::now();
        let quota = QuotaState::new(5, now - ChronoDuration::hours(25));
        assert_eq!(decide(&quota, now), ScheduleDecision::CycleExpired);
        // Exactly 24h is NOT expired (strict inequality)
        let quota = QuotaState::new(5, now - cycle());
        assert_ne!(decide(&quota, now), ScheduleDecision::CycleExpired);
    }

    #[test]
    fn test_expiry_checked_before_budget() {
        // Exhausted AND expired: expiry wins, so the reset happens first.
        let now = Utc::now();
        let mut quota = QuotaState::new(2, now - ChronoDuration::hours(30));
        quota.calls_made = 2;
        assert_eq!(decide(&quota, now), ScheduleDecision::CycleExpired);
    }

    #[test]
    fn test_cycle_reset_is_idempotent() {
        let now = Utc::now();
        let mut quota = QuotaState::new(5, now - ChronoDuration::hours(25));
        quota.calls_made = 4;

        quota.reset_cycle(now);
        let once = quota.clone();
        quota.reset_cycle(now);
        assert_eq!(quota, once);
        assert_eq!(quota.calls_made, 0);
        assert_eq!(quota.cycle_anchor, now);
    }

    #[test]
    fn test_anchor_in_future_treated_as_fresh() {
        let now = Utc::now();
        let mut quota = QuotaState::new(5, now + ChronoDuration::minutes(3));
        quota.calls_made = 1;
        // Not expired, not panicking; even interval over a full window.
        match decide(&quota, now) {
            ScheduleDecision::WaitFor(d) => assert_eq!(d, Duration::from_secs(6 * 3600)),
            other => panic!("expected WaitFor, got {:?}", other),
        }
    }

    #[test]
    fn test_quota_state_serde_roundtrip() {
        let quota = QuotaState::new(10, Utc::now());
        let json = serde_json::to_string(&quota).unwrap();
        let decoded: QuotaState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, quota);
    }
}
