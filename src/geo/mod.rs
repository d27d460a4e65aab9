//! Geographic proximity verification between customer and provider
//!
//! This module covers the whole location side of the defense layer:
//! great-circle distance math, the freshness-bounded cache of the customer's
//! last known coordinate, the distance classification used for risk scoring
//! and provider ranking, and the bounded acquisition flow that reads
//! coordinates from the host environment with a high-accuracy attempt and a
//! low-accuracy fallback.

mod location_cache;
mod math;
mod provider;
mod proximity;

pub use location_cache::LocationCache;
pub use math::distance_km;
pub use provider::{LocationAcquisition, LocationProvider};
pub use proximity::ProximityVerifier;
