use crate::error::{GuardError, Result};
use crate::types::Coordinate;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two coordinates, in kilometers.
///
/// Symmetric in its arguments; zero for identical points. Coordinates
/// outside valid latitude/longitude ranges are rejected, never coerced.
pub fn distance_km(a: Coordinate, b: Coordinate) -> Result<f64> {
    validate(a)?;
    validate(b)?;

    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    Ok(EARTH_RADIUS_KM * c)
}

/// Reject coordinates outside lat [-90, 90] / lng [-180, 180]
pub fn validate(c: Coordinate) -> Result<()> {
    if !c.lat.is_finite() || !c.lng.is_finite() || c.lat.abs() > 90.0 || c.lng.abs() > 180.0 {
        return Err(GuardError::InvalidCoordinate(format!(
            "lat={}, lng={}",
            c.lat, c.lng
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAKARTA: Coordinate = Coordinate {
        lat: -6.2088,
        lng: 106.8456,
    };
    const SURABAYA: Coordinate = Coordinate {
        lat: -7.2575,
        lng: 112.7521,
    };

    #[test]
    fn identical_points_are_zero_distance() {
        assert!(distance_km(JAKARTA, JAKARTA).unwrap().abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(JAKARTA, SURABAYA).unwrap();
        let back = distance_km(SURABAYA, JAKARTA).unwrap();
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn jakarta_to_surabaya_is_roughly_660_km() {
        let d = distance_km(JAKARTA, SURABAYA).unwrap();
        assert!(d > 600.0 && d < 720.0, "got {}", d);
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let bad = Coordinate {
            lat: 91.0,
            lng: 0.0,
        };
        assert!(matches!(
            distance_km(bad, JAKARTA),
            Err(GuardError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn non_finite_longitude_is_rejected() {
        let bad = Coordinate {
            lat: 0.0,
            lng: f64::NAN,
        };
        assert!(validate(bad).is_err());
    }
}
