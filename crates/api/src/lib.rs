//! HTTP interface for the waste collection tracker.

pub mod error;
pub mod extract;
pub mod handlers;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, put};
use axum::Router;
use std::path::PathBuf;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wastetrack_db::DbPool;
use wastetrack_service::{
    CollectionService, CustomerService, DriverService, RouteService, TrackingService,
};
use wastetrack_telemetry::Metrics;

pub use error::{ApiError, ApiResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub metrics: Metrics,
    pub collections: CollectionService,
    pub customers: CustomerService,
    pub drivers: DriverService,
    pub routes: RouteService,
    pub tracking: TrackingService,
}

impl AppState {
    pub fn new(db: DbPool, metrics: Metrics, audit_path: Option<PathBuf>) -> Self {
        Self {
            collections: CollectionService::new(db.clone()),
            customers: CustomerService::new(db.clone()),
            drivers: DriverService::new(db.clone(), metrics.clone()),
            routes: RouteService::new(db.clone(), metrics.clone(), audit_path),
            tracking: TrackingService::new(db.clone(), metrics.clone()),
            db,
            metrics,
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use handlers::{driver, management, system, tracking};

    let driver_routes = Router::new()
        .route(
            "/profile/:driver_id",
            get(driver::get_profile).put(driver::update_profile),
        )
        .route("/:driver_id/collections", get(driver::list_collections))
        .route(
            "/:driver_id/collections/:collection_id",
            get(driver::get_collection),
        )
        .route(
            "/:driver_id/collections/:collection_id/status",
            put(driver::update_status),
        )
        .route("/:driver_id/route/optimize", get(driver::optimize_route));

    let management_routes = Router::new()
        .route(
            "/collections",
            get(management::list_collections).post(management::create_collection),
        )
        .route(
            "/collections/:id",
            get(management::get_collection)
                .put(management::update_collection)
                .delete(management::delete_collection),
        )
        .route(
            "/customers",
            get(management::list_customers).post(management::create_customer),
        )
        .route("/customers/:id", get(management::get_customer))
        .route(
            "/routes",
            get(management::list_routes).post(management::create_route),
        )
        .route("/routes/:id", get(management::get_route))
        .route("/routes/:id/status", put(management::update_route_status));

    let tracking_routes = Router::new()
        .route("/location/:driver_id", put(tracking::update_location))
        .route("/live", get(tracking::live))
        .route("/history/:driver_id", get(tracking::history))
        .route("/analytics", get(tracking::analytics));

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .nest("/api/driver", driver_routes)
        .nest("/api/management", management_routes)
        .nest("/api/tracking", tracking_routes)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Count and time every request that reached a route.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());
    let started = Instant::now();

    let response = next.run(request).await;

    if let Some(route) = route {
        state.metrics.observe_request(
            &method,
            &route,
            response.status().as_u16(),
            started.elapsed().as_secs_f64(),
        );
    }
    response
}
