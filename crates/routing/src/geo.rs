//! Geodesic helpers.

use serde::{Deserialize, Serialize};

use crate::{round2, PlanError, PlanResult};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average in-city driving speed used for time estimates.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Start point used when a driver has not reported a position (Accra).
pub const DEFAULT_DEPOT: Coordinate = Coordinate {
    lat: 5.6037,
    lng: -0.1870,
};

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> PlanResult<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);

        if valid {
            Ok(Self { lat, lng })
        } else {
            Err(PlanError::InvalidCoordinate { lat, lng })
        }
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Whole minutes needed to drive `km` at the average city speed.
pub fn travel_minutes(km: f64) -> i64 {
    (km / AVERAGE_SPEED_KMH * 60.0) as i64
}

/// Directions for a single leg of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationInfo {
    pub distance_km: f64,
    pub estimated_time_min: i64,
    pub start_location: Coordinate,
    pub end_location: Coordinate,
}

impl NavigationInfo {
    /// Navigation info for travelling from `start` to `end`.
    pub fn between(start: Coordinate, end: Coordinate) -> Self {
        let distance = haversine_km(start, end);
        Self {
            distance_km: round2(distance),
            estimated_time_min: travel_minutes(distance),
            start_location: start,
            end_location: end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_points_have_zero_distance() {
        assert_eq!(haversine_km(DEFAULT_DEPOT, DEFAULT_DEPOT), 0.0);
    }

    #[test]
    fn test_accra_to_kumasi() {
        let kumasi = Coordinate::new(6.6885, -1.6244).unwrap();
        let km = haversine_km(DEFAULT_DEPOT, kumasi);
        assert!(km > 190.0 && km < 210.0, "got {}", km);
        // Symmetric.
        assert!((km - haversine_km(kumasi, DEFAULT_DEPOT)).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(1.0, 0.0).unwrap();
        assert!((haversine_km(a, b) - 111.19).abs() < 0.01);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_navigation_info_rounds_and_estimates() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.1, 0.0).unwrap();
        let nav = NavigationInfo::between(a, b);
        // 11.119 km at 30 km/h is 22.2 minutes.
        assert_eq!(nav.distance_km, 11.12);
        assert_eq!(nav.estimated_time_min, 22);
        assert_eq!(nav.start_location, a);
        assert_eq!(nav.end_location, b);
    }

    #[test]
    fn test_travel_minutes_truncates() {
        assert_eq!(travel_minutes(0.0), 0);
        assert_eq!(travel_minutes(14.9), 29);
        assert_eq!(travel_minutes(15.0), 30);
    }
}
