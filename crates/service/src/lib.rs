//! Business operations for the waste collection tracker.
//!
//! Each service wraps the database pool (and, where it reports activity,
//! the metrics collector) and returns serializable views ready to be sent
//! over the API.

pub mod collections;
pub mod customers;
pub mod drivers;
pub mod routes;
pub mod tracking;
pub mod validation;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use wastetrack_routing::PlanError;

pub use collections::CollectionService;
pub use customers::CustomerService;
pub use drivers::DriverService;
pub use routes::RouteService;
pub use tracking::TrackingService;

/// Error type for service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// One page of a larger result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<T>,
}

/// UTC bounds `[start, end)` of a calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, TimeZone, Utc};
    use wastetrack_db::{drivers, DbPool};

    pub async fn seeded_db() -> DbPool {
        let db = DbPool::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        drivers::seed_sample_drivers(&db).await.unwrap();
        db
    }

    pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }
}
