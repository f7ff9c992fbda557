//! Geographic position and distance helpers used by geofence triggers/conditions.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other`, in meters, via the haversine formula.
    pub fn haversine_meters(&self, other: &Position) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_METERS * c
    }

    /// True if `self` lies within `radius_m` meters of `center`.
    pub fn is_within(&self, center: &Position, radius_m: f64) -> bool {
        self.haversine_meters(center) <= radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_same_point_is_zero() {
        let p = Position::new(51.5, -0.12);
        assert!(p.haversine_meters(&p) < 1e-6);
    }

    #[test]
    fn haversine_matches_scenario_s4_distances() {
        // S4: center (0,0); previous (0, 0.01) ~1.1km; current (0, 0.004) ~445m.
        let center = Position::new(0.0, 0.0);
        let previous = Position::new(0.0, 0.01);
        let current = Position::new(0.0, 0.004);

        let d_prev = previous.haversine_meters(&center);
        let d_cur = current.haversine_meters(&center);

        assert!((1_000.0..1_200.0).contains(&d_prev), "d_prev={d_prev}");
        assert!((400.0..500.0).contains(&d_cur), "d_cur={d_cur}");

        assert!(!previous.is_within(&center, 500.0));
        assert!(current.is_within(&center, 500.0));
    }
}
