//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "tidepool_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Community Metrics
    pub static ref POSTS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_posts_created_total", "Total number of posts created"),
        &["tagged"]
    ).expect("metric can be created");
    pub static ref LIKE_TOGGLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_like_toggles_total", "Total number of like toggles"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref EVENT_SUBSCRIBERS: IntGauge = IntGauge::new(
        "tidepool_event_subscribers",
        "Current number of live event stream subscribers"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Record a completed database query.
pub fn observe_db_query(operation: &str, table: &str, elapsed: std::time::Duration) {
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(elapsed.as_secs_f64());
}

/// Initialize metrics registry.
///
/// Idempotent: repeat calls are no-ops, so test harnesses that stand
/// up several servers in one process can call it freely.
pub fn init_metrics() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(register_all);
}

fn register_all() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DB_QUERIES_TOTAL.clone()))
        .expect("DB_QUERIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("DB_QUERY_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(POSTS_CREATED_TOTAL.clone()))
        .expect("POSTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LIKE_TOGGLES_TOTAL.clone()))
        .expect("LIKE_TOGGLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(EVENT_SUBSCRIBERS.clone()))
        .expect("EVENT_SUBSCRIBERS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
