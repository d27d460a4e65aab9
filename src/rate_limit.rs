use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::{GuardError, Result};

/// What kind of operation a counter window guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Accepted booking submissions
    Booking,

    /// Verification SMS dispatches
    SmsDispatch,
}

/// Fixed-window counters for one identity and limit kind.
///
/// Counts are never negative and reset deterministically at window
/// boundaries; the window indices are the hour/day number since the epoch.
struct WindowCounters {
    hour_index: i64,
    hour_count: u32,
    day_index: i64,
    day_count: u32,
    expires_at: DateTime<Utc>,
}

impl WindowCounters {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            hour_index: hour_index(now),
            hour_count: 0,
            day_index: day_index(now),
            day_count: 0,
            expires_at: record_expiry(now),
        }
    }

    /// Roll the windows forward if a boundary has passed
    fn roll(&mut self, now: DateTime<Utc>) {
        let hour = hour_index(now);
        if self.hour_index != hour {
            self.hour_index = hour;
            self.hour_count = 0;
        }
        let day = day_index(now);
        if self.day_index != day {
            self.day_index = day;
            self.day_count = 0;
        }
    }
}

fn hour_index(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(3600)
}

fn day_index(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(86_400)
}

/// Records expire once the daily window they could still affect has passed
fn record_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day_start = (day_index(now) + 1) * 86_400;
    DateTime::from_timestamp(next_day_start, 0).unwrap_or(now + Duration::days(1))
}

/// Per-identity fixed-window rate limiter.
///
/// All state lives in a sharded map keyed by `(identity, kind)`; the
/// check-and-increment runs entirely under the map's entry lock, so two
/// concurrent submissions for the same identity can never both observe
/// "below limit" and both pass. Unrelated identities land on independent
/// shards and are not serialized against each other. The critical section
/// contains no await point, so a cancelled caller can never leave a counter
/// half-mutated.
pub struct RateLimiter {
    counters: DashMap<(String, LimitKind), WindowCounters>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            config,
            clock,
        }
    }

    /// Hourly and optional daily quota for a limit kind
    fn quotas(&self, kind: LimitKind) -> (u32, Option<u32>) {
        match kind {
            LimitKind::Booking => (
                self.config.bookings_per_hour,
                Some(self.config.bookings_per_day),
            ),
            LimitKind::SmsDispatch => (self.config.sms_per_hour, None),
        }
    }

    /// Atomically check the windows for `key` and consume one slot.
    ///
    /// Exceeding either window is a hard fail and leaves the counters
    /// untouched; the caller cannot retry until the window resets.
    pub fn check_and_increment(&self, key: &str, kind: LimitKind) -> Result<()> {
        let now = self.clock.now();
        let (hourly, daily) = self.quotas(kind);

        let mut entry = self
            .counters
            .entry((key.to_string(), kind))
            .or_insert_with(|| WindowCounters::new(now));
        entry.roll(now);

        if entry.hour_count >= hourly {
            warn!(key, ?kind, limit = hourly, "hourly limit reached");
            return Err(GuardError::RateLimit(format!(
                "hourly limit of {} reached, resets at the next hour boundary",
                hourly
            )));
        }
        if let Some(daily) = daily {
            if entry.day_count >= daily {
                warn!(key, ?kind, limit = daily, "daily limit reached");
                return Err(GuardError::RateLimit(format!(
                    "daily limit of {} reached, resets at the next day boundary",
                    daily
                )));
            }
        }

        entry.hour_count += 1;
        entry.day_count += 1;
        entry.expires_at = record_expiry(now);
        debug!(
            key,
            ?kind,
            hour_count = entry.hour_count,
            day_count = entry.day_count,
            "slot consumed"
        );
        Ok(())
    }

    /// Check the windows for `key` without consuming a slot. Used by the
    /// cheap/partial validation path so live-typing feedback never burns
    /// booking quota.
    pub fn peek(&self, key: &str, kind: LimitKind) -> Result<()> {
        let now = self.clock.now();
        let (hourly, daily) = self.quotas(kind);

        let entry = match self.counters.get(&(key.to_string(), kind)) {
            Some(e) => e,
            None => return Ok(()),
        };

        let hour_count = if entry.hour_index == hour_index(now) {
            entry.hour_count
        } else {
            0
        };
        if hour_count >= hourly {
            return Err(GuardError::RateLimit(format!(
                "hourly limit of {} reached, resets at the next hour boundary",
                hourly
            )));
        }

        if let Some(daily) = daily {
            let day_count = if entry.day_index == day_index(now) {
                entry.day_count
            } else {
                0
            };
            if day_count >= daily {
                return Err(GuardError::RateLimit(format!(
                    "daily limit of {} reached, resets at the next day boundary",
                    daily
                )));
            }
        }
        Ok(())
    }

    /// Drop records whose TTL has elapsed
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.counters.retain(|_, counters| counters.expires_at > now);
    }
}
