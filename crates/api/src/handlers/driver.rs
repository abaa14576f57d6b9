//! Endpoints used by the driver app.

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use wastetrack_db::models::Driver;
use wastetrack_routing::Strategy;
use wastetrack_service::drivers::{CollectionView, ProfileUpdate, StatusUpdate, StatusUpdateResponse};
use wastetrack_service::routes::OptimizedRoute;
use wastetrack_service::today;

use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeQuery {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub strategy: Strategy,
}

pub async fn get_profile(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
) -> ApiResult<Json<Driver>> {
    Ok(Json(state.drivers.profile(driver_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
    AppJson(update): AppJson<ProfileUpdate>,
) -> ApiResult<Json<Driver>> {
    Ok(Json(state.drivers.update_profile(driver_id, update).await?))
}

/// Collections scheduled for the driver on `date` (today when omitted).
pub async fn list_collections(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
    AppQuery(query): AppQuery<DayQuery>,
) -> ApiResult<Json<Vec<CollectionView>>> {
    let date = query.date.unwrap_or_else(today);
    Ok(Json(state.drivers.collections_for_day(driver_id, date).await?))
}

pub async fn get_collection(
    State(state): State<AppState>,
    AppPath((driver_id, collection_id)): AppPath<(i64, i64)>,
) -> ApiResult<Json<CollectionView>> {
    Ok(Json(
        state.drivers.collection_detail(driver_id, collection_id).await?,
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    AppPath((driver_id, collection_id)): AppPath<(i64, i64)>,
    AppJson(update): AppJson<StatusUpdate>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    Ok(Json(
        state
            .drivers
            .update_status(driver_id, collection_id, update)
            .await?,
    ))
}

pub async fn optimize_route(
    State(state): State<AppState>,
    AppPath(driver_id): AppPath<i64>,
    AppQuery(query): AppQuery<OptimizeQuery>,
) -> ApiResult<Json<OptimizedRoute>> {
    let date = query.date.unwrap_or_else(today);
    Ok(Json(
        state.routes.optimize(driver_id, date, query.strategy).await?,
    ))
}
