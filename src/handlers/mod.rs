//! HTTP endpoint handlers for the exporter.
//!
//! - `/metrics`: Prometheus metrics endpoint
//! - `/`: landing page

use axum::{routing::get, Router};

use crate::state::SharedState;

pub mod metrics;
pub mod root;

pub use metrics::metrics_handler;
pub use root::root_handler;

/// Builds the exporter's router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
