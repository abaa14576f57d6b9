//! Database models and types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A driver of a collection vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub last_update: DateTime<Utc>,
}

impl Driver {
    /// Last reported position, when both halves are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.current_lat.zip(self.current_lng)
    }
}

/// A customer site serviced by collections.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerLocation {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    pub collection_frequency: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single scheduled waste pickup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WasteCollection {
    pub id: i64,
    pub driver_id: i64,
    pub location_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scheduled_time: DateTime<Utc>,
    pub actual_collection_time: Option<DateTime<Utc>>,
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub route_id: Option<i64>,
    pub route_position: Option<i64>,
    pub customer_location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A driver's planned route for one service day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: i64,
    pub driver_id: i64,
    pub date: NaiveDate,
    pub status: RouteStatus,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Pending => "PENDING",
            CollectionStatus::InProgress => "IN_PROGRESS",
            CollectionStatus::Completed => "COMPLETED",
            CollectionStatus::Skipped => "SKIPPED",
        }
    }

    /// Statuses a driver may move a collection to from `self`.
    pub fn allowed_transitions(&self) -> &'static [CollectionStatus] {
        match self {
            CollectionStatus::Pending => &[CollectionStatus::InProgress],
            CollectionStatus::InProgress => &[CollectionStatus::Completed, CollectionStatus::Skipped],
            CollectionStatus::Completed | CollectionStatus::Skipped => &[],
        }
    }

    pub fn can_transition_to(&self, next: CollectionStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Pending => "PENDING",
            RouteStatus::InProgress => "IN_PROGRESS",
            RouteStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Pending, RouteStatus::InProgress)
                | (RouteStatus::InProgress, RouteStatus::Completed)
        )
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
