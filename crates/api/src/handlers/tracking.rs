//! Position reports, live view, history and analytics.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use wastetrack_service::tracking::{Analytics, LiveTracking, LocationAck, LocationUpdate, TrackingHistory};

use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub driver_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub driver_id: Option<i64>,
}

pub async fn update_location(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
    AppJson(update): AppJson<LocationUpdate>,
) -> ApiResult<Json<LocationAck>> {
    Ok(Json(state.tracking.update_location(driver_id, update).await?))
}

pub async fn live(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LiveQuery>,
) -> ApiResult<Json<Vec<LiveTracking>>> {
    Ok(Json(state.tracking.live(query.driver_id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
    AppQuery(query): AppQuery<WindowQuery>,
) -> ApiResult<Json<TrackingHistory>> {
    Ok(Json(
        state
            .tracking
            .history(driver_id, query.start_date, query.end_date)
            .await?,
    ))
}

pub async fn analytics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<WindowQuery>,
) -> ApiResult<Json<Analytics>> {
    Ok(Json(
        state
            .tracking
            .analytics(query.start_date, query.end_date, query.driver_id)
            .await?,
    ))
}
