//! Envirobly Exporter Library
//!
//! A lightweight telemetry poller: independent background tasks sample host
//! resource utilization (RAM, CPU, swap, filesystem usage, network byte
//! counters, ZFS pool capacity) into a shared Prometheus registry, and the
//! `/metrics` handler renders a fresh snapshot on every scrape.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use envirobly_exporter::{start_collectors, Config, MetricRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(MetricRegistry::new()?);
//! let supervisor = start_collectors(&Config::default(), Arc::clone(&registry));
//!
//! // ... serve registry.snapshot().encode() over HTTP ...
//!
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Sampler failures never reach the scrape: the affected series simply keeps
//! its last known value (or stays absent if it was never sampled).

pub mod cli;
pub mod collectors;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod startup_checks;
pub mod state;
pub mod supervisor;
pub mod system;
pub mod task;

// Re-export main types for convenience
pub use collectors::{Collector, CycleReport};
pub use config::Config;
pub use error::SampleError;
pub use registry::{round_percent, MetricKind, MetricRegistry, Snapshot};
pub use state::{AppState, SharedState};
pub use supervisor::{start_collectors, start_collectors_with_host, Supervisor};
pub use system::{HostSource, ProcfsHost};
pub use task::CollectionTask;
