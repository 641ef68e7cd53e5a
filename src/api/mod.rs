//! API layer
//!
//! HTTP handlers for:
//! - Community endpoints (posts, comments, likes, live events)
//! - Metrics (Prometheus)

mod community;
pub mod metrics;

pub use community::community_router;
pub use metrics::metrics_router;
