//! Haversine travel-time estimator (fallback when the engine's live
//! traffic service is unavailable).
//!
//! Uses great-circle distance and an assumed speed. Ignores roads and
//! traffic, so it never reports a delay on its own; it keeps the
//! traffic-check endpoint answering when the engine is down.

use crate::error::EngineError;
use crate::model::Location;
use crate::traits::TravelTimeProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct HaversineEstimator {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineEstimator {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineEstimator {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance between two points in kilometers.
    fn haversine_km(from: Location, to: Location) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lng - from.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    fn km_to_seconds(&self, km: f64) -> u32 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round() as u32
    }
}

impl TravelTimeProvider for HaversineEstimator {
    fn travel_secs(&self, from: Location, to: Location) -> Result<u32, EngineError> {
        Ok(self.km_to_seconds(Self::haversine_km(from, to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let secs = HaversineEstimator::default()
            .travel_secs(Location::new(36.1, -115.1), Location::new(36.1, -115.1))
            .unwrap();
        assert_eq!(secs, 0);
    }

    #[test]
    fn known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let km =
            HaversineEstimator::haversine_km(Location::new(36.17, -115.14), Location::new(34.05, -118.24));
        assert!(km > 350.0 && km < 400.0, "LV to LA should be ~370km, got {}", km);
    }

    #[test]
    fn reasonable_travel_time() {
        let estimator = HaversineEstimator::new(40.0);
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        assert_eq!(estimator.km_to_seconds(10.0), 900);
    }

    #[test]
    fn estimate_is_symmetric() {
        let estimator = HaversineEstimator::default();
        let a = Location::new(36.1, -115.1);
        let b = Location::new(36.2, -115.2);
        assert_eq!(
            estimator.travel_secs(a, b).unwrap(),
            estimator.travel_secs(b, a).unwrap()
        );
    }
}
