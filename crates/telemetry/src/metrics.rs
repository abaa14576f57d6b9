//! Prometheus metrics for the waste collection tracker.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Metrics collector for the tracking service.
///
/// Each instance owns its registry, so several can coexist in one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    routes_planned: IntCounter,
    route_distance: Histogram,
    status_updates: IntCounterVec,
    location_updates: IntCounter,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new(
                "wastetrack_http_requests_total",
                "Total number of HTTP requests by route and outcome",
            ),
            &["method", "route", "status"],
        )?;

        let http_latency = HistogramVec::new(
            HistogramOpts::new(
                "wastetrack_http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method"],
        )?;

        let routes_planned = IntCounter::new(
            "wastetrack_routes_planned_total",
            "Total number of route optimizations performed",
        )?;

        let route_distance = Histogram::with_opts(
            HistogramOpts::new(
                "wastetrack_route_distance_km",
                "Total distance of planned routes in kilometres",
            )
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        )?;

        let status_updates = IntCounterVec::new(
            Opts::new(
                "wastetrack_collection_status_updates_total",
                "Total number of collection status changes by new status",
            ),
            &["status"],
        )?;

        let location_updates = IntCounter::new(
            "wastetrack_location_updates_total",
            "Total number of driver position reports",
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;
        registry.register(Box::new(routes_planned.clone()))?;
        registry.register(Box::new(route_distance.clone()))?;
        registry.register(Box::new(status_updates.clone()))?;
        registry.register(Box::new(location_updates.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_latency,
            routes_planned,
            route_distance,
            status_updates,
            location_updates,
        })
    }

    /// Record a completed HTTP request against its route template (e.g. `/api/tracking/live`).
    pub fn observe_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        self.http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.http_latency
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// Record a route optimization and its total distance.
    pub fn observe_route_planned(&self, distance_km: f64) {
        self.routes_planned.inc();
        self.route_distance.observe(distance_km);
    }

    /// Increment the status change counter for `status`.
    pub fn inc_status_updates(&self, status: &str) {
        self.status_updates.with_label_values(&[status]).inc();
    }

    /// Increment the position report counter.
    pub fn inc_location_updates(&self) {
        self.location_updates.inc();
    }

    /// Get Prometheus metrics as a string.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
