use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::LocationError;
use crate::geo::math;
use crate::geo::LocationCache;
use crate::types::{LocationSample, LocationSource};

/// Capability for reading the device's current coordinate.
///
/// Implementations wrap whatever the host environment offers (browser
/// geolocation, OS location services, a fixed test coordinate). The
/// `timeout` is a hint to the underlying read; the acquisition flow applies
/// its own hard bound on top.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn get_coordinate(
        &self,
        high_accuracy: bool,
        timeout: Duration,
    ) -> std::result::Result<LocationSample, LocationError>;
}

/// Bounded coordinate acquisition: one high-accuracy attempt, one
/// low-accuracy fallback, each under its own timeout, then give up.
///
/// Failure never propagates; the caller simply proceeds without a sample
/// and the proximity check degrades to `Unknown`.
pub struct LocationAcquisition {
    cache: Arc<LocationCache>,
    attempt_timeout: Duration,
}

impl LocationAcquisition {
    pub fn new(cache: Arc<LocationCache>, acquire_timeout_ms: u64) -> Self {
        Self {
            cache,
            attempt_timeout: Duration::from_millis(acquire_timeout_ms),
        }
    }

    /// Acquire a coordinate and store it in the cache. Returns the sample on
    /// success, `None` after both attempts are exhausted.
    pub async fn acquire(
        &self,
        provider: &dyn LocationProvider,
        source: LocationSource,
    ) -> Option<LocationSample> {
        for high_accuracy in [true, false] {
            match self.attempt(provider, high_accuracy).await {
                Ok(mut sample) => {
                    sample.source = source;
                    debug!(
                        high_accuracy,
                        accuracy_m = sample.accuracy_m,
                        "coordinate acquired"
                    );
                    self.cache.store(sample.clone());
                    return Some(sample);
                }
                Err(e) => {
                    warn!(high_accuracy, error = %e, "coordinate read failed");
                }
            }
        }
        None
    }

    async fn attempt(
        &self,
        provider: &dyn LocationProvider,
        high_accuracy: bool,
    ) -> std::result::Result<LocationSample, LocationError> {
        let read = provider.get_coordinate(high_accuracy, self.attempt_timeout);
        let sample = tokio::time::timeout(self.attempt_timeout, read)
            .await
            .map_err(|_| LocationError::Timeout)??;

        // A provider returning garbage coordinates is indistinguishable from
        // an unavailable position for our purposes.
        if math::validate(sample.coordinate).is_err() {
            return Err(LocationError::PositionUnavailable);
        }
        Ok(sample)
    }
}
