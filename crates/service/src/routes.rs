//! Route optimization and persisted routes.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};
use wastetrack_db::collections::{self, CollectionFilter};
use wastetrack_db::models::{CollectionStatus, Route, RouteStatus};
use wastetrack_db::{routes, DbPool};
use wastetrack_routing::{plan_route, Coordinate, Stop, Strategy, DEFAULT_DEPOT};
use wastetrack_telemetry::{audit, Metrics};

use crate::drivers::{require_driver, with_customers, CollectionView};
use crate::{day_bounds, ServiceError, ServiceResult};

/// An optimized visiting order for a driver's pending collections.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedRoute {
    pub driver_id: i64,
    pub date: NaiveDate,
    pub strategy: Strategy,
    pub start_location: Coordinate,
    pub optimized_collections: Vec<CollectionView>,
    pub total_distance: f64,
    pub estimated_time: i64,
}

/// Request body for planning and storing a route.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoute {
    pub driver_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub strategy: Strategy,
}

/// A stored route together with its collections in visiting order.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDetail {
    #[serde(flatten)]
    pub route: Route,
    pub collections: Vec<CollectionView>,
}

#[derive(Debug, Serialize)]
struct RouteAuditSample<'a> {
    route_id: i64,
    driver_id: i64,
    date: NaiveDate,
    strategy: Strategy,
    total_distance: f64,
    estimated_time: i64,
    stops: Vec<i64>,
    start_location: &'a Coordinate,
}

/// Plans routes and manages their lifecycle.
#[derive(Clone)]
pub struct RouteService {
    db: DbPool,
    metrics: Metrics,
    audit_path: Option<PathBuf>,
}

impl RouteService {
    /// Create a new route service.
    ///
    /// # Arguments
    /// * `db` - Database pool
    /// * `metrics` - Metrics collector
    /// * `audit_path` - Optional JSON-lines file receiving one sample per stored route
    pub fn new(db: DbPool, metrics: Metrics, audit_path: Option<PathBuf>) -> Self {
        Self {
            db,
            metrics,
            audit_path,
        }
    }

    /// Order the driver's pending collections on `date`.
    ///
    /// Starts from the driver's last reported position, or the depot when unknown.
    pub async fn optimize(
        &self,
        driver_id: i64,
        date: NaiveDate,
        strategy: Strategy,
    ) -> ServiceResult<OptimizedRoute> {
        self.plan(driver_id, date, strategy, false)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No pending collections found".to_string()))
    }

    /// Plan the driver's unrouted pending collections on the day and store them as a route.
    pub async fn create_route(&self, request: CreateRoute) -> ServiceResult<RouteDetail> {
        let plan = self
            .plan(request.driver_id, request.date, request.strategy, true)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(
                    "No pending collections without a route found".to_string(),
                )
            })?;

        let stop_ids: Vec<i64> = plan.optimized_collections.iter().map(|c| c.id).collect();
        let route = routes::insert_with_stops(
            &self.db,
            plan.driver_id,
            plan.date,
            plan.total_distance,
            &stop_ids,
        )
        .await?
        .ok_or_else(|| {
            ServiceError::BadRequest("Collections were assigned to another route".to_string())
        })?;

        let sample = RouteAuditSample {
            route_id: route.id,
            driver_id: route.driver_id,
            date: route.date,
            strategy: plan.strategy,
            total_distance: plan.total_distance,
            estimated_time: plan.estimated_time,
            stops: stop_ids,
            start_location: &plan.start_location,
        };
        if let Err(e) = audit::write_audit_sample(self.audit_path.as_ref(), "route_plan", &sample) {
            warn!("Failed to write audit sample: {}", e);
        }

        info!(route_id = route.id, driver_id = route.driver_id, "Stored route");

        Ok(RouteDetail {
            route,
            collections: plan.optimized_collections,
        })
    }

    /// `None` when the driver has nothing pending on `date`.
    async fn plan(
        &self,
        driver_id: i64,
        date: NaiveDate,
        strategy: Strategy,
        unrouted: bool,
    ) -> ServiceResult<Option<OptimizedRoute>> {
        let driver = require_driver(&self.db, driver_id).await?;

        let (start, end) = day_bounds(date);
        let filter = CollectionFilter {
            status: Some(CollectionStatus::Pending),
            unrouted,
            ..CollectionFilter::driver_window(driver_id, start, end)
        };
        let rows = collections::list_all(&self.db, &filter).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let start_location = driver
            .position()
            .map(|(lat, lng)| Coordinate { lat, lng })
            .unwrap_or(DEFAULT_DEPOT);

        let assignments = with_customers(&self.db, rows).await?;
        let stops: Vec<Stop> = assignments
            .iter()
            .map(|a| Stop {
                id: a.collection.id,
                location: a.location(),
            })
            .collect();

        let plan = plan_route(start_location, &stops, strategy);
        self.metrics.observe_route_planned(plan.total_distance_km);

        let mut by_id: HashMap<i64, _> = assignments
            .into_iter()
            .map(|a| (a.collection.id, a))
            .collect();
        let mut optimized_collections = Vec::with_capacity(plan.legs.len());
        for leg in plan.legs {
            let assignment = by_id
                .remove(&leg.stop_id)
                .ok_or_else(|| anyhow::anyhow!("Planner returned unknown stop {}", leg.stop_id))?;
            optimized_collections.push(assignment.into_view(Some(leg.navigation)));
        }

        info!(
            driver_id,
            %date,
            %strategy,
            stops = optimized_collections.len(),
            total_distance = plan.total_distance_km,
            "Optimized route"
        );

        Ok(Some(OptimizedRoute {
            driver_id,
            date,
            strategy,
            start_location,
            optimized_collections,
            total_distance: plan.total_distance_km,
            estimated_time: plan.estimated_time_min,
        }))
    }

    pub async fn get(&self, route_id: i64) -> ServiceResult<RouteDetail> {
        let route = routes::get(&self.db, route_id)
            .await?
            .ok_or_else(|| route_not_found(route_id))?;
        self.detail(route).await
    }

    pub async fn list(&self, driver_id: Option<i64>, date: Option<NaiveDate>) -> ServiceResult<Vec<Route>> {
        Ok(routes::list(&self.db, driver_id, date).await?)
    }

    /// Move a route along its lifecycle, stamping the clock time it started or ended.
    pub async fn update_status(&self, route_id: i64, status: RouteStatus) -> ServiceResult<RouteDetail> {
        let route = routes::get(&self.db, route_id)
            .await?
            .ok_or_else(|| route_not_found(route_id))?;

        if !route.status.can_transition_to(status) {
            return Err(ServiceError::BadRequest(format!(
                "Invalid status transition from {} to {}",
                route.status, status
            )));
        }

        let clock = Utc::now().format("%H:%M").to_string();
        let (start_time, end_time) = match status {
            RouteStatus::InProgress => (Some(clock), None),
            RouteStatus::Completed => (None, Some(clock)),
            RouteStatus::Pending => (None, None),
        };

        let updated = routes::update_status(&self.db, route_id, status, start_time, end_time)
            .await?
            .ok_or_else(|| route_not_found(route_id))?;

        info!(route_id, "Route moved from {} to {}", route.status, status);
        self.detail(updated).await
    }

    async fn detail(&self, route: Route) -> ServiceResult<RouteDetail> {
        let rows = collections::by_route(&self.db, route.id).await?;
        let collections = with_customers(&self.db, rows)
            .await?
            .into_iter()
            .map(|a| a.into_view(None))
            .collect();

        Ok(RouteDetail { route, collections })
    }
}

fn route_not_found(route_id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Route with ID {} not found", route_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, seeded_db};
    use wastetrack_db::collections::NewCollection;
    use wastetrack_db::drivers;

    async fn schedule(db: &DbPool, name: &str, lat: f64, lng: f64, status: CollectionStatus) -> i64 {
        collections::insert(
            db,
            &NewCollection {
                driver_id: 1,
                location_name: name.to_string(),
                address: name.to_string(),
                latitude: lat,
                longitude: lng,
                scheduled_time: at(4, 9),
                status,
                notes: None,
                customer_location_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn test_optimize_orders_by_distance() {
        let db = seeded_db().await;
        drivers::update_position(&db, 1, 0.0, 0.0, Utc::now()).await.unwrap();
        let far = schedule(&db, "far", 0.0, 0.3, CollectionStatus::Pending).await;
        let near = schedule(&db, "near", 0.0, 0.1, CollectionStatus::Pending).await;
        let mid = schedule(&db, "mid", 0.0, 0.2, CollectionStatus::Pending).await;
        schedule(&db, "done", 0.0, 0.05, CollectionStatus::Completed).await;

        let service = RouteService::new(db, Metrics::new().unwrap(), None);
        let plan = service.optimize(1, day(), Strategy::TwoOpt).await.unwrap();

        let order: Vec<i64> = plan.optimized_collections.iter().map(|c| c.id).collect();
        assert_eq!(order, vec![near, mid, far]);
        assert_eq!(plan.total_distance, 33.36);
        // 66.7 minutes of driving plus three 15 minute stops.
        assert_eq!(plan.estimated_time, 111);
        assert!(plan.optimized_collections.iter().all(|c| c.navigation.is_some()));
    }

    #[tokio::test]
    async fn test_optimize_defaults_to_depot() {
        let db = seeded_db().await;
        schedule(&db, "a", 5.6037, -0.1870, CollectionStatus::Pending).await;

        let service = RouteService::new(db, Metrics::new().unwrap(), None);
        let plan = service.optimize(1, day(), Strategy::NearestNeighbor).await.unwrap();
        assert_eq!(plan.start_location, DEFAULT_DEPOT);
        assert_eq!(plan.total_distance, 0.0);
        assert_eq!(plan.estimated_time, 15);
    }

    #[tokio::test]
    async fn test_optimize_without_pending_work() {
        let db = seeded_db().await;
        let service = RouteService::new(db, Metrics::new().unwrap(), None);

        assert!(matches!(
            service.optimize(1, day(), Strategy::TwoOpt).await,
            Err(ServiceError::NotFound(msg)) if msg == "No pending collections found"
        ));
        assert!(matches!(
            service.optimize(77, day(), Strategy::TwoOpt).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_route_and_lifecycle() {
        let db = seeded_db().await;
        drivers::update_position(&db, 1, 0.0, 0.0, Utc::now()).await.unwrap();
        let b = schedule(&db, "b", 0.0, 0.2, CollectionStatus::Pending).await;
        let a = schedule(&db, "a", 0.0, 0.1, CollectionStatus::Pending).await;

        let service = RouteService::new(db, Metrics::new().unwrap(), None);
        let created = service
            .create_route(CreateRoute {
                driver_id: 1,
                date: day(),
                strategy: Strategy::TwoOpt,
            })
            .await
            .unwrap();
        assert_eq!(created.route.distance, 22.24);
        assert_eq!(created.collections.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a, b]);

        let fetched = service.get(created.route.id).await.unwrap();
        assert_eq!(fetched.collections.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(service.list(Some(1), Some(day())).await.unwrap().len(), 1);

        assert!(matches!(
            service.update_status(created.route.id, RouteStatus::Completed).await,
            Err(ServiceError::BadRequest(_))
        ));
        let started = service
            .update_status(created.route.id, RouteStatus::InProgress)
            .await
            .unwrap();
        assert!(started.route.start_time.is_some());
        let finished = service
            .update_status(created.route.id, RouteStatus::Completed)
            .await
            .unwrap();
        assert!(finished.route.end_time.is_some());
        assert!(matches!(service.get(999).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_route_twice_keeps_first_route() {
        let db = seeded_db().await;
        let a = schedule(&db, "a", 0.0, 0.1, CollectionStatus::Pending).await;
        let service = RouteService::new(db.clone(), Metrics::new().unwrap(), None);
        let request = CreateRoute {
            driver_id: 1,
            date: day(),
            strategy: Strategy::TwoOpt,
        };

        let first = service.create_route(request.clone()).await.unwrap();
        assert!(matches!(
            service.create_route(request.clone()).await,
            Err(ServiceError::BadRequest(_))
        ));
        let kept = service.get(first.route.id).await.unwrap();
        assert_eq!(kept.collections.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a]);
        assert_eq!(service.list(Some(1), Some(day())).await.unwrap().len(), 1);

        // Newly scheduled work goes on a second route without touching the first.
        let b = schedule(&db, "b", 0.0, 0.2, CollectionStatus::Pending).await;
        let second = service.create_route(request).await.unwrap();
        assert_eq!(second.collections.iter().map(|c| c.id).collect::<Vec<_>>(), vec![b]);
        assert_eq!(service.get(first.route.id).await.unwrap().collections.len(), 1);

        // Optimizing still shows every pending stop of the day.
        let plan = service.optimize(1, day(), Strategy::TwoOpt).await.unwrap();
        assert_eq!(plan.optimized_collections.len(), 2);
    }
}
