//! Metrics endpoint handler for Prometheus scraping.
//!
//! Every request takes a fresh registry snapshot and renders it in the text
//! exposition format. Nothing is cached between requests.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let snapshot = state.registry.snapshot();
    let body = snapshot.encode().map_err(|e| {
        error!("Failed to encode Prometheus metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    debug!(
        "Metrics request completed: {} series, {} bytes, {:.3}ms",
        snapshot.series_count(),
        body.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
