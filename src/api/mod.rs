//! API layer
//!
//! HTTP handlers for:
//! - Action proxy endpoints (generate, publish)
//! - Metrics (Prometheus)

mod actions;
pub mod metrics;

pub use actions::actions_router;
pub use metrics::metrics_router;
