//! Back-office endpoints: collections, customer locations and stored routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use wastetrack_db::models::{CustomerLocation, Route, RouteStatus, WasteCollection};
use wastetrack_service::collections::{CollectionQuery, CreateCollection, UpdateCollection};
use wastetrack_service::customers::CreateCustomerLocation;
use wastetrack_service::routes::{CreateRoute, RouteDetail};
use wastetrack_service::Page;

use crate::extract::{AppJson, AppPath, AppQuery};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub driver_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct RouteStatusUpdate {
    pub status: RouteStatus,
}

pub async fn list_collections(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CollectionQuery>,
) -> ApiResult<Json<Page<WasteCollection>>> {
    Ok(Json(state.collections.list(query).await?))
}

pub async fn create_collection(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCollection>,
) -> ApiResult<(StatusCode, Json<WasteCollection>)> {
    let collection = state.collections.create(request).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn get_collection(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<WasteCollection>> {
    Ok(Json(state.collections.get(id).await?))
}

pub async fn update_collection(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateCollection>,
) -> ApiResult<Json<WasteCollection>> {
    Ok(Json(state.collections.update(id, request).await?))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    state.collections.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_customers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CustomerQuery>,
) -> ApiResult<Json<Vec<CustomerLocation>>> {
    Ok(Json(state.customers.list(query.include_inactive).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCustomerLocation>,
) -> ApiResult<(StatusCode, Json<CustomerLocation>)> {
    let customer = state.customers.create(request).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<CustomerLocation>> {
    Ok(Json(state.customers.get(id).await?))
}

pub async fn list_routes(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RouteQuery>,
) -> ApiResult<Json<Vec<Route>>> {
    Ok(Json(state.routes.list(query.driver_id, query.date).await?))
}

/// Plan the driver's pending work for a day and store it as a route.
pub async fn create_route(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateRoute>,
) -> ApiResult<(StatusCode, Json<RouteDetail>)> {
    let route = state.routes.create_route(request).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn get_route(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<RouteDetail>> {
    Ok(Json(state.routes.get(id).await?))
}

pub async fn update_route_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<RouteStatusUpdate>,
) -> ApiResult<Json<RouteDetail>> {
    Ok(Json(state.routes.update_status(id, request.status).await?))
}
