//! Distance between coordinates.

use crate::model::GeoPoint;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Distance in meters between two points.
pub trait DistanceFn: Send + Sync {
    fn distance_m(&self, a: GeoPoint, b: GeoPoint) -> f64;
}

/// Great-circle distance on a spherical Earth.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl DistanceFn for Haversine {
    fn distance_m(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (b.longitude - a.longitude).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

impl<F> DistanceFn for F
where
    F: Fn(GeoPoint, GeoPoint) -> f64 + Send + Sync,
{
    fn distance_m(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);
        let d = Haversine.distance_m(paris, london);
        assert!((340_000.0..347_000.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_symmetric_and_zero() {
        let a = GeoPoint::new(-33.8688, 151.2093);
        let b = GeoPoint::new(35.6762, 139.6503);
        assert_eq!(Haversine.distance_m(a, a), 0.0);
        assert!((Haversine.distance_m(a, b) - Haversine.distance_m(b, a)).abs() < 1e-6);
    }

    #[test]
    fn test_antipodes_stay_finite() {
        let d = Haversine.distance_m(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }
}
