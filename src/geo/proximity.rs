use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::{LocationConfig, ProximityConfig};
use crate::geo::math;
use crate::types::{Coordinate, LocationSample, ProximityStatus, ProximityVerdict};

/// Classifies the customer-provider distance and scores providers for
/// candidate ranking.
///
/// Availability beats strict validation here: a missing provider coordinate,
/// a missing or stale customer sample, or a failed distance computation all
/// degrade to `Unknown` rather than failing the validation.
pub struct ProximityVerifier {
    thresholds: ProximityConfig,
    freshness: Duration,
}

impl ProximityVerifier {
    pub fn new(thresholds: ProximityConfig, location: &LocationConfig) -> Self {
        Self {
            thresholds,
            freshness: Duration::seconds(location.freshness_secs),
        }
    }

    /// Compare the customer's cached sample against a candidate provider
    /// coordinate. Boundary distances resolve to the lower-risk side.
    pub fn compare(
        &self,
        customer: Option<&LocationSample>,
        provider: Option<Coordinate>,
        now: DateTime<Utc>,
    ) -> ProximityVerdict {
        let provider = match provider {
            Some(p) => p,
            None => return Self::unknown("no provider coordinate"),
        };

        let customer = match customer {
            Some(s) if s.age(now) < self.freshness => s,
            Some(_) => return Self::unknown("customer sample is stale"),
            None => return Self::unknown("no customer sample"),
        };

        let distance = match math::distance_km(customer.coordinate, provider) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "distance computation failed, degrading to unknown");
                return Self::unknown("distance computation failed");
            }
        };

        let status = if distance <= self.thresholds.verified_km {
            ProximityStatus::Verified
        } else if distance <= self.thresholds.needs_check_km {
            ProximityStatus::NeedsCheck
        } else {
            ProximityStatus::Mismatch
        };

        let verdict = ProximityVerdict {
            distance_km: Some(distance),
            status,
            ranking_score: self.ranking_score(distance),
        };
        debug!(
            distance_km = distance,
            status = ?verdict.status,
            ranking = verdict.ranking_score,
            "proximity comparison complete"
        );
        verdict
    }

    /// Step-function ranking score used to sort and filter candidate
    /// providers; 0 excludes the candidate.
    pub fn ranking_score(&self, distance_km: f64) -> u8 {
        if distance_km <= 2.0 {
            100
        } else if distance_km <= self.thresholds.verified_km {
            90
        } else if distance_km <= 10.0 {
            75
        } else if distance_km <= self.thresholds.needs_check_km {
            50
        } else if distance_km <= self.thresholds.candidate_cap_km {
            25
        } else {
            0
        }
    }

    fn unknown(reason: &str) -> ProximityVerdict {
        debug!(reason, "proximity unknown");
        ProximityVerdict {
            distance_km: None,
            status: ProximityStatus::Unknown,
            ranking_score: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::types::LocationSource;

    fn verifier() -> ProximityVerifier {
        let config = GuardConfig::default();
        ProximityVerifier::new(config.proximity, &config.location)
    }

    /// Sample at the origin; provider offsets chosen along the equator where
    /// one degree of longitude is ~111.19 km.
    fn sample_at_origin(now: DateTime<Utc>, age_hours: i64) -> LocationSample {
        LocationSample {
            coordinate: Coordinate { lat: 0.0, lng: 0.0 },
            accuracy_m: 30.0,
            captured_at: now - Duration::hours(age_hours),
            source: LocationSource::Booking,
        }
    }

    fn provider_km_east(km: f64) -> Coordinate {
        Coordinate {
            lat: 0.0,
            lng: km / 111.19,
        }
    }

    #[test]
    fn three_km_is_verified() {
        let now = Utc::now();
        let sample = sample_at_origin(now, 0);
        let verdict = verifier().compare(Some(&sample), Some(provider_km_east(3.0)), now);
        assert_eq!(verdict.status, ProximityStatus::Verified);
    }

    #[test]
    fn ten_km_needs_check() {
        let now = Utc::now();
        let sample = sample_at_origin(now, 0);
        let verdict = verifier().compare(Some(&sample), Some(provider_km_east(10.0)), now);
        assert_eq!(verdict.status, ProximityStatus::NeedsCheck);
    }

    #[test]
    fn twenty_km_is_mismatch() {
        let now = Utc::now();
        let sample = sample_at_origin(now, 0);
        let verdict = verifier().compare(Some(&sample), Some(provider_km_east(20.0)), now);
        assert_eq!(verdict.status, ProximityStatus::Mismatch);
    }

    #[test]
    fn boundary_distances_resolve_to_lower_risk() {
        let v = verifier();
        assert_eq!(v.ranking_score(5.0), 90);
        assert_eq!(v.ranking_score(15.0), 50);
        assert_eq!(v.ranking_score(25.0), 25);
        assert_eq!(v.ranking_score(25.1), 0);
    }

    #[test]
    fn stale_sample_is_unknown_even_if_valid() {
        let now = Utc::now();
        let sample = sample_at_origin(now, 3);
        let verdict = verifier().compare(Some(&sample), Some(provider_km_east(1.0)), now);
        assert_eq!(verdict.status, ProximityStatus::Unknown);
        assert_eq!(verdict.distance_km, None);
    }

    #[test]
    fn missing_provider_coordinate_is_unknown() {
        let now = Utc::now();
        let sample = sample_at_origin(now, 0);
        let verdict = verifier().compare(Some(&sample), None, now);
        assert_eq!(verdict.status, ProximityStatus::Unknown);
        assert_eq!(verdict.ranking_score, 0);
    }

    #[test]
    fn ranking_steps_match_distance_bands() {
        let v = verifier();
        assert_eq!(v.ranking_score(1.5), 100);
        assert_eq!(v.ranking_score(4.0), 90);
        assert_eq!(v.ranking_score(8.0), 75);
        assert_eq!(v.ranking_score(12.0), 50);
        assert_eq!(v.ranking_score(20.0), 25);
        assert_eq!(v.ranking_score(30.0), 0);
    }
}
