//! Great-circle distance and travel time

use sdk::types::GeoPoint;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Seconds needed to cover `distance_km` at `speed_kmph`, scaled by
/// `delay_factor` and rounded down
///
/// Returns `None` when the speed is not a positive finite number.
pub fn travel_secs(distance_km: f64, speed_kmph: f64, delay_factor: f64) -> Option<u64> {
    if !(speed_kmph.is_finite() && speed_kmph > 0.0) || !distance_km.is_finite() {
        return None;
    }
    let secs = (distance_km.max(0.0) / speed_kmph) * 3600.0 * delay_factor;
    Some(secs.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(22.5726, 88.3639);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // One degree of latitude along a meridian
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        let d = haversine_km(a, b);
        assert!((d - 111.195).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_travel_secs() {
        assert_eq!(travel_secs(2.0, 25.0, 1.0), Some(288));
        assert_eq!(travel_secs(2.0, 25.0, 1.2), Some(345));
        assert_eq!(travel_secs(0.0, 25.0, 1.0), Some(0));
        assert_eq!(travel_secs(2.0, 0.0, 1.0), None);
    }
}
