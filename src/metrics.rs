//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postforge_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Webhook Metrics
    pub static ref WEBHOOK_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postforge_webhook_requests_total", "Total number of automation webhook calls"),
        &["action", "status"]
    ).expect("metric can be created");
    pub static ref WEBHOOK_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "postforge_webhook_request_duration_seconds",
            "Automation webhook call duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["action"]
    ).expect("metric can be created");

    // Auth Metrics
    pub static ref OAUTH_LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postforge_oauth_logins_total", "Total number of OAuth login attempts"),
        &["outcome"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postforge_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postforge_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(WEBHOOK_REQUESTS_TOTAL.clone()))
        .expect("WEBHOOK_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(WEBHOOK_REQUEST_DURATION_SECONDS.clone()))
        .expect("WEBHOOK_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(OAUTH_LOGINS_TOTAL.clone()))
        .expect("OAUTH_LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DB_QUERIES_TOTAL.clone()))
        .expect("DB_QUERIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
