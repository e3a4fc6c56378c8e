//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that links to `/metrics`
//! and shows version, uptime and the active collectors.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let uptime_str = format!(
        "{}h {}m {}s",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );

    let cfg = &state.config;
    let collectors: Vec<String> = [
        ("system", cfg.enable_system_collector, cfg.system_interval()),
        ("network", cfg.enable_network_collector, cfg.network_interval()),
        ("filesystem", cfg.enable_filesystem_collector, cfg.filesystem_interval()),
        ("zpool", cfg.enable_zpool_collector, cfg.zpool_interval()),
    ]
    .into_iter()
    .filter(|(_, enabled, _)| enabled.unwrap_or(true))
    .map(|(name, _, interval)| format!("<li><code>{}</code> every {}s</li>", name, interval.as_secs()))
    .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Envirobly Exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; line-height: 1.6; }}
        code {{ background: #e9ecef; padding: 2px 6px; border-radius: 3px; }}
    </style>
</head>
<body>
    <h1>Envirobly Exporter</h1>
    <p>Version {version} &middot; up {uptime}</p>
    <p><a href="/metrics">/metrics</a> &mdash; Prometheus-compatible metrics endpoint</p>
    <h2>Collectors</h2>
    <ul>
        {collectors}
    </ul>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        collectors = collectors.join("\n        ")
    );

    Html(html)
}
