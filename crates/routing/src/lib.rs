//! Route planning for waste collection stops.
//!
//! Pure, synchronous code: geodesic distances, per-leg navigation info and
//! the nearest-neighbor / 2-opt sequencing used to order a driver's stops.

pub mod geo;
pub mod planner;

pub use geo::{haversine_km, travel_minutes, Coordinate, NavigationInfo, DEFAULT_DEPOT};
pub use planner::{plan_route, PlannedLeg, RoutePlan, Stop, Strategy};

/// Error type for planning operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("Unknown routing strategy: {0}")]
    UnknownStrategy(String),
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Round a value to two decimal places, the precision used for reported distances.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
