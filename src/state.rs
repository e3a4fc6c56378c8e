//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. Collection tasks hold their own handle to the registry.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::registry::MetricRegistry;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests.
pub struct AppState {
    pub registry: Arc<MetricRegistry>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: Arc<MetricRegistry>, config: Config) -> SharedState {
        Arc::new(Self {
            registry,
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }
}
