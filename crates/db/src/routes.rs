//! Route queries.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::models::{Route, RouteStatus};
use crate::DbPool;

const ROUTE_COLUMNS: &str =
    "id, driver_id, date, status, start_time, end_time, distance, created_at";

/// Persist a route and assign its collections in visiting order.
///
/// Runs in a single transaction: either the route and every assignment are
/// stored, or nothing is. Returns `None`, storing nothing, when any of the
/// collections already belongs to a route.
pub async fn insert_with_stops(
    db: &DbPool,
    driver_id: i64,
    date: NaiveDate,
    distance_km: f64,
    collection_ids: &[i64],
) -> Result<Option<Route>> {
    let mut tx = db.pool().begin().await?;

    let route = sqlx::query_as::<_, Route>(&format!(
        "INSERT INTO routes (driver_id, date, status, distance, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {ROUTE_COLUMNS}"
    ))
    .bind(driver_id)
    .bind(date)
    .bind(RouteStatus::Pending)
    .bind(distance_km)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for (position, collection_id) in collection_ids.iter().enumerate() {
        let result = sqlx::query(
            "UPDATE waste_collections SET route_id = ?, route_position = ?, updated_at = ? \
             WHERE id = ? AND route_id IS NULL",
        )
        .bind(route.id)
        .bind(position as i64)
        .bind(Utc::now())
        .bind(*collection_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            debug!("Collection {} is already routed, discarding route", collection_id);
            return Ok(None);
        }
    }

    tx.commit().await?;
    debug!("Stored route {} with {} stops", route.id, collection_ids.len());

    Ok(Some(route))
}

pub async fn get(db: &DbPool, id: i64) -> Result<Option<Route>> {
    let row = sqlx::query_as::<_, Route>(&format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = ?"))
        .bind(id)
        .fetch_optional(db.pool())
        .await?;

    Ok(row)
}

/// Routes, optionally narrowed to one driver and/or one day, newest first.
pub async fn list(db: &DbPool, driver_id: Option<i64>, date: Option<NaiveDate>) -> Result<Vec<Route>> {
    let rows = sqlx::query_as::<_, Route>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes \
         WHERE (?1 IS NULL OR driver_id = ?1) AND (?2 IS NULL OR date = ?2) \
         ORDER BY date DESC, id DESC"
    ))
    .bind(driver_id)
    .bind(date)
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

/// Set a route's status along with its start or end clock time.
pub async fn update_status(
    db: &DbPool,
    id: i64,
    status: RouteStatus,
    start_time: Option<String>,
    end_time: Option<String>,
) -> Result<Option<Route>> {
    let row = sqlx::query_as::<_, Route>(&format!(
        "UPDATE routes SET status = ?, start_time = COALESCE(?, start_time), \
         end_time = COALESCE(?, end_time) WHERE id = ? RETURNING {ROUTE_COLUMNS}"
    ))
    .bind(status)
    .bind(start_time)
    .bind(end_time)
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}
