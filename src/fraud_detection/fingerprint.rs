use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::FingerprintConfig;
use crate::types::{RiskSignal, SignalSource};

/// Capability producing an opaque weak device signal.
///
/// Construction details are deliberately not part of the contract: any
/// stable-ish composite of client/environment attributes works. Hosts that
/// cannot produce one return `None` and the tracker simply sees nothing.
pub trait WeakDeviceSignal: Send + Sync {
    fn signal(&self) -> Option<String>;
}

/// Default signal builder: a BLAKE3 hash over whatever attribute pairs the
/// host could collect (user agent, platform, timezone, screen metrics, ...).
pub struct EnvironmentSignal {
    attributes: Vec<(String, String)>,
}

impl EnvironmentSignal {
    pub fn new(attributes: Vec<(String, String)>) -> Self {
        Self { attributes }
    }
}

impl WeakDeviceSignal for EnvironmentSignal {
    fn signal(&self) -> Option<String> {
        if self.attributes.is_empty() {
            return None;
        }

        let mut sorted = self.attributes.clone();
        sorted.sort();

        let mut hasher = blake3::Hasher::new();
        for (key, value) in &sorted {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        Some(hex::encode(hasher.finalize().as_bytes()))
    }
}

/// Per-signal occurrence record within the rolling window
struct SignalRecord {
    window_start: DateTime<Utc>,
    occurrences: u32,
    phones: HashSet<String>,
    expires_at: DateTime<Utc>,
}

impl SignalRecord {
    fn new(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            window_start: now,
            occurrences: 0,
            phones: HashSet::new(),
            expires_at: now + window,
        }
    }
}

/// Tracks how often each weak device signal shows up and how many distinct
/// phone numbers it carries within a rolling 24 h window.
///
/// One device cycling through many phone numbers is the cheapest
/// multi-account pattern to catch; anything above the threshold contributes
/// an advisory risk weight.
pub struct DeviceFingerprintTracker {
    records: DashMap<String, SignalRecord>,
    window: Duration,
    multi_account_threshold: u32,
    clock: Arc<dyn Clock>,
}

impl DeviceFingerprintTracker {
    pub fn new(config: &FingerprintConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            window: Duration::seconds(config.window_secs),
            multi_account_threshold: config.multi_account_threshold,
            clock,
        }
    }

    /// Record one sighting of `signal` by `phone`. Returns an advisory risk
    /// signal when the device crosses the multi-account threshold.
    pub fn record(&self, signal: &str, phone: &str) -> Option<RiskSignal> {
        let now = self.clock.now();
        let mut entry = self
            .records
            .entry(signal.to_string())
            .or_insert_with(|| SignalRecord::new(now, self.window));

        if now - entry.window_start >= self.window {
            entry.window_start = now;
            entry.occurrences = 0;
            entry.phones.clear();
        }

        entry.occurrences += 1;
        entry.phones.insert(phone.to_string());
        entry.expires_at = entry.window_start + self.window;

        let distinct = entry.phones.len() as u32;
        if distinct > self.multi_account_threshold {
            warn!(
                signal,
                distinct_phones = distinct,
                "device signal shared across many phone numbers"
            );
            return Some(RiskSignal::advisory(
                SignalSource::Fingerprint,
                20,
                "possible multi-account abuse",
            ));
        }

        debug!(signal, occurrences = entry.occurrences, "device signal recorded");
        None
    }

    /// Occurrences of a signal within its current window
    pub fn occurrences(&self, signal: &str) -> u32 {
        self.records.get(signal).map(|r| r.occurrences).unwrap_or(0)
    }

    /// Drop records whose TTL has elapsed
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.records.retain(|_, record| record.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn tracker(clock: Arc<ManualClock>) -> DeviceFingerprintTracker {
        DeviceFingerprintTracker::new(&FingerprintConfig::default(), clock)
    }

    #[test]
    fn environment_signal_is_stable_and_order_independent() {
        let a = EnvironmentSignal::new(vec![
            ("ua".into(), "Mozilla/5.0".into()),
            ("tz".into(), "Asia/Jakarta".into()),
        ]);
        let b = EnvironmentSignal::new(vec![
            ("tz".into(), "Asia/Jakarta".into()),
            ("ua".into(), "Mozilla/5.0".into()),
        ]);
        assert_eq!(a.signal(), b.signal());
        assert!(a.signal().is_some());
    }

    #[test]
    fn empty_environment_yields_no_signal() {
        assert!(EnvironmentSignal::new(vec![]).signal().is_none());
    }

    #[test]
    fn threshold_phones_on_one_device_is_tolerated() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = tracker(clock);

        assert!(tracker.record("dev-1", "6281111111101").is_none());
        assert!(tracker.record("dev-1", "6281111111102").is_none());
        assert!(tracker.record("dev-1", "6281111111103").is_none());
    }

    #[test]
    fn crossing_the_threshold_flags_multi_account_abuse() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = tracker(clock);

        for n in 1..=3 {
            assert!(tracker.record("dev-1", &format!("62811111111{:02}", n)).is_none());
        }
        let flagged = tracker.record("dev-1", "6281111111199").unwrap();
        assert_eq!(flagged.message, "possible multi-account abuse");
        assert_eq!(flagged.weight, 20);
    }

    #[test]
    fn repeat_sightings_of_one_phone_do_not_flag() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = tracker(clock);

        for _ in 0..10 {
            assert!(tracker.record("dev-1", "6281111111101").is_none());
        }
        assert_eq!(tracker.occurrences("dev-1"), 10);
    }

    #[test]
    fn window_rollover_resets_the_count() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = tracker(Arc::clone(&clock));

        for n in 1..=4 {
            tracker.record("dev-1", &format!("62811111111{:02}", n));
        }
        clock.advance(Duration::hours(25));

        assert!(tracker.record("dev-1", "6281111111105").is_none());
        assert_eq!(tracker.occurrences("dev-1"), 1);
    }

    #[test]
    fn purge_drops_expired_records() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tracker = tracker(Arc::clone(&clock));

        tracker.record("dev-1", "6281111111101");
        clock.advance(Duration::hours(25));
        tracker.purge_expired();

        assert_eq!(tracker.occurrences("dev-1"), 0);
    }
}
