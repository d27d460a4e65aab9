use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::types::LocationSample;

/// Last known customer coordinate for the session, last-write-wins.
///
/// A sample older than the freshness bound is excluded from proximity math
/// but deliberately not deleted: a stale sample still tells the host how old
/// the data is and whether re-acquisition is worth prompting for.
pub struct LocationCache {
    sample: RwLock<Option<LocationSample>>,

    /// Age bound beyond which a sample no longer participates in proximity
    freshness: Duration,
}

impl LocationCache {
    pub fn new(freshness_secs: i64) -> Self {
        Self {
            sample: RwLock::new(None),
            freshness: Duration::seconds(freshness_secs),
        }
    }

    /// Store a sample, overwriting any prior one
    pub fn store(&self, sample: LocationSample) {
        debug!(
            lat = sample.coordinate.lat,
            lng = sample.coordinate.lng,
            accuracy_m = sample.accuracy_m,
            "storing customer location sample"
        );
        *self.sample.write() = Some(sample);
    }

    /// The stored sample, fresh or not
    pub fn get(&self) -> Option<LocationSample> {
        self.sample.read().clone()
    }

    /// Whether a sample is still fresh at `now`
    pub fn is_fresh(&self, sample: &LocationSample, now: DateTime<Utc>) -> bool {
        sample.age(now) < self.freshness
    }

    /// The stored sample, only if still fresh at `now`
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<LocationSample> {
        self.get().filter(|s| self.is_fresh(s, now))
    }

    /// Drop the stored sample
    pub fn clear(&self) {
        *self.sample.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinate, LocationSource};

    fn sample_at(captured_at: DateTime<Utc>) -> LocationSample {
        LocationSample {
            coordinate: Coordinate {
                lat: -6.2,
                lng: 106.8,
            },
            accuracy_m: 50.0,
            captured_at,
            source: LocationSource::Landing,
        }
    }

    #[test]
    fn store_is_last_write_wins() {
        let cache = LocationCache::new(7200);
        let now = Utc::now();

        cache.store(sample_at(now - Duration::minutes(30)));
        cache.store(sample_at(now));

        assert_eq!(cache.get().unwrap().captured_at, now);
    }

    #[test]
    fn stale_sample_is_excluded_but_not_deleted() {
        let cache = LocationCache::new(7200);
        let now = Utc::now();

        cache.store(sample_at(now - Duration::hours(3)));

        assert!(cache.fresh(now).is_none());
        assert!(cache.get().is_some());
    }

    #[test]
    fn two_hour_boundary_is_stale() {
        let cache = LocationCache::new(7200);
        let now = Utc::now();
        let sample = sample_at(now - Duration::hours(2));

        assert!(!cache.is_fresh(&sample, now));
    }

    #[test]
    fn recent_sample_is_fresh() {
        let cache = LocationCache::new(7200);
        let now = Utc::now();
        let sample = sample_at(now - Duration::minutes(90));

        assert!(cache.is_fresh(&sample, now));
    }
}
