//! Integration tests for the HTTP endpoints.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use tower::ServiceExt;

use envirobly_exporter::handlers::{metrics_handler, router};
use envirobly_exporter::{AppState, Config, MetricKind, MetricRegistry};

const BODY_LIMIT: usize = 1024 * 1024;

fn state_with(registry: Arc<MetricRegistry>) -> envirobly_exporter::SharedState {
    AppState::new(registry, Config::default())
}

#[tokio::test]
async fn test_metrics_reflect_latest_values() {
    let registry = Arc::new(MetricRegistry::new().unwrap());
    registry.upsert(MetricKind::RamUsage, &[], 42.57);
    registry.upsert(MetricKind::PoolUsage, &["tank"], 55.0);

    let response = metrics_handler(axum::extract::State(state_with(Arc::clone(&registry))))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        prometheus::TEXT_FORMAT
    );

    let body = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("envirobly_ram_usage_percent 42.57"));
    assert!(text.contains("envirobly_zpool_usage_percent{pool=\"tank\"} 55"));
    assert!(!text.contains("envirobly_cpu_usage_percent"));

    // The next scrape sees writes made in between
    registry.upsert(MetricKind::RamUsage, &[], 50.0);
    let response = metrics_handler(axum::extract::State(state_with(registry)))
        .await
        .into_response();
    let body = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("envirobly_ram_usage_percent 50"));
}

#[tokio::test]
async fn test_empty_registry_serves_empty_body() {
    let registry = Arc::new(MetricRegistry::new().unwrap());
    let app = router(state_with(registry));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_root_page_links_metrics() {
    let registry = Arc::new(MetricRegistry::new().unwrap());
    let app = router(state_with(registry));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/metrics"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let registry = Arc::new(MetricRegistry::new().unwrap());
    let app = router(state_with(registry));

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
