//! Live positions, history and aggregate metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wastetrack_db::collections::{self, CollectionFilter};
use wastetrack_db::models::CollectionStatus;
use wastetrack_db::{drivers, DbPool};
use wastetrack_routing::{round2, Coordinate};
use wastetrack_telemetry::Metrics;

use crate::drivers::require_driver;
use crate::{ServiceError, ServiceResult};

/// A position report from a driver's device.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    /// Time of the fix; defaults to the time the report is received.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationAck {
    pub message: String,
    pub driver_id: i64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentTask {
    pub location: String,
    pub status: CollectionStatus,
    pub scheduled_time: DateTime<Utc>,
}

/// What a driver is doing right now.
#[derive(Debug, Clone, Serialize)]
pub struct LiveTracking {
    pub driver_id: i64,
    pub collection_id: Option<i64>,
    pub driver_name: String,
    pub current_location: CurrentLocation,
    pub current_task: Option<CurrentTask>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverInfo {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub location: String,
    pub status: CollectionStatus,
    pub scheduled_time: DateTime<Utc>,
    pub actual_collection_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingHistory {
    pub driver_info: DriverInfo,
    pub collections: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Period {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionMetrics {
    pub total_collections: i64,
    pub completed_collections: i64,
    pub pending_collections: i64,
    pub in_progress_collections: i64,
    pub skipped_collections: i64,
    /// Percentage of completed collections, two decimals; zero when there are none.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub period: Period,
    pub metrics: CollectionMetrics,
}

#[derive(Clone)]
pub struct TrackingService {
    db: DbPool,
    metrics: Metrics,
}

impl TrackingService {
    pub fn new(db: DbPool, metrics: Metrics) -> Self {
        Self { db, metrics }
    }

    pub async fn update_location(&self, driver_id: i64, update: LocationUpdate) -> ServiceResult<LocationAck> {
        Coordinate::new(update.latitude, update.longitude)?;

        let reported_at = update.timestamp.unwrap_or_else(Utc::now);
        let found = drivers::update_position(&self.db, driver_id, update.latitude, update.longitude, reported_at)
            .await?;
        if !found {
            return Err(ServiceError::NotFound(format!("Driver with ID {} not found", driver_id)));
        }

        self.metrics.inc_location_updates();
        debug!(driver_id, lat = update.latitude, lng = update.longitude, "Position report");

        Ok(LocationAck {
            message: "Location updated successfully".to_string(),
            driver_id,
            last_update: reported_at,
        })
    }

    /// Live view of every driver, or only `driver_id` when given.
    pub async fn live(&self, driver_id: Option<i64>) -> ServiceResult<Vec<LiveTracking>> {
        let drivers = drivers::list(&self.db, driver_id).await?;

        let mut tracking = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let current = collections::current_for_driver(&self.db, driver.id).await?;
            tracking.push(LiveTracking {
                driver_id: driver.id,
                collection_id: current.as_ref().map(|c| c.id),
                driver_name: driver.name,
                current_location: CurrentLocation {
                    latitude: driver.current_lat,
                    longitude: driver.current_lng,
                },
                current_task: current.map(|c| CurrentTask {
                    location: c.location_name,
                    status: c.status,
                    scheduled_time: c.scheduled_time,
                }),
                last_update: driver.last_update,
            });
        }

        Ok(tracking)
    }

    /// A driver's collections scheduled within `[start, end]`.
    pub async fn history(
        &self,
        driver_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ServiceResult<TrackingHistory> {
        let driver = require_driver(&self.db, driver_id).await?;

        let filter = CollectionFilter {
            driver_id: Some(driver_id),
            scheduled_from: start,
            scheduled_to: end,
            ..Default::default()
        };
        let collections = collections::list_all(&self.db, &filter)
            .await?
            .into_iter()
            .map(|c| HistoryEntry {
                id: c.id,
                location: c.location_name,
                status: c.status,
                scheduled_time: c.scheduled_time,
                actual_collection_time: c.actual_collection_time,
            })
            .collect();

        Ok(TrackingHistory {
            driver_info: DriverInfo {
                id: driver.id,
                name: driver.name,
                is_active: driver.is_active,
            },
            collections,
        })
    }

    pub async fn analytics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        driver_id: Option<i64>,
    ) -> ServiceResult<Analytics> {
        let filter = CollectionFilter {
            driver_id,
            scheduled_from: start,
            scheduled_to: end,
            ..Default::default()
        };
        let counts = collections::status_counts(&self.db, &filter).await?;

        Ok(Analytics {
            period: Period { start, end },
            metrics: summarize(&counts),
        })
    }
}

fn summarize(counts: &[(CollectionStatus, i64)]) -> CollectionMetrics {
    let mut metrics = CollectionMetrics::default();
    for &(status, n) in counts {
        metrics.total_collections += n;
        match status {
            CollectionStatus::Pending => metrics.pending_collections += n,
            CollectionStatus::InProgress => metrics.in_progress_collections += n,
            CollectionStatus::Completed => metrics.completed_collections += n,
            CollectionStatus::Skipped => metrics.skipped_collections += n,
        }
    }

    if metrics.total_collections > 0 {
        metrics.completion_rate =
            round2(metrics.completed_collections as f64 / metrics.total_collections as f64 * 100.0);
    }
    metrics
}
