//! Global tool-usage quota.
//!
//! A [`UsageRecord`] counts tool-using turns inside a fixed window.
//! Every operation here is a pure function over the record; the
//! caller decides when to persist the result.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// ── Clock ────────────────────────────────────────────────────

/// Source of "now".  Production code uses [`SystemClock`]; tests
/// substitute a controllable clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Record ───────────────────────────────────────────────────

/// Tool-usage count for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl UsageRecord {
    /// A zeroed record whose window opens at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }
}

/// Longest accepted window: one year.
pub const MAX_RESET_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Limit and window length applied to every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub limit: u32,
    pub reset_interval: Duration,
}

impl QuotaPolicy {
    /// Windows longer than [`MAX_RESET_INTERVAL_MINUTES`] are clamped.
    pub fn new(limit: u32, reset_interval_minutes: u64) -> Self {
        let minutes = reset_interval_minutes.min(MAX_RESET_INTERVAL_MINUTES);
        Self {
            limit,
            reset_interval: Duration::minutes(i64::try_from(minutes).unwrap_or(i64::MAX)),
        }
    }
}

/// Display snapshot of an identity's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining_minutes: u64,
    pub exceeded: bool,
}

impl QuotaStatus {
    pub fn of(record: &UsageRecord, policy: &QuotaPolicy, now: DateTime<Utc>) -> Self {
        Self {
            used: record.count,
            limit: policy.limit,
            remaining_minutes: remaining_minutes(record, now, policy.reset_interval),
            exceeded: is_exceeded(record, policy.limit),
        }
    }
}

// ── Operations ───────────────────────────────────────────────

/// Whether the window that opened at `record.window_start` has run out.
pub fn is_expired(record: &UsageRecord, now: DateTime<Utc>, reset_interval: Duration) -> bool {
    now - record.window_start >= reset_interval
}

/// Return a zeroed record starting at `now` when the window has
/// expired, otherwise `record` unchanged.
pub fn check_and_maybe_reset(
    record: UsageRecord,
    now: DateTime<Utc>,
    reset_interval: Duration,
) -> UsageRecord {
    if is_expired(&record, now, reset_interval) {
        UsageRecord::fresh(now)
    } else {
        record
    }
}

/// One more tool-using turn in the same window.
pub fn increment(record: UsageRecord) -> UsageRecord {
    UsageRecord {
        count: record.count.saturating_add(1),
        window_start: record.window_start,
    }
}

/// Whole minutes (rounded up) until the window resets; `0` once expired.
pub fn remaining_minutes(
    record: &UsageRecord,
    now: DateTime<Utc>,
    reset_interval: Duration,
) -> u64 {
    let left_ms = (reset_interval - (now - record.window_start)).num_milliseconds();
    if left_ms <= 0 {
        return 0;
    }
    (left_ms as u64).div_ceil(60_000)
}

pub fn is_exceeded(record: &UsageRecord, limit: u32) -> bool {
    record.count >= limit
}
