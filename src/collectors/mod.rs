//! Collectors for the host metric families.
//!
//! Each collector owns the samplers of one family (system, filesystem, network,
//! zpool) and writes their successful results into the registry. A collection
//! task drives a collector on its own interval.

use std::future::Future;

use crate::registry::MetricRegistry;

pub mod filesystem;
pub mod host;
pub mod netdev;
pub mod zpool;

pub use filesystem::FilesystemCollector;
pub use host::SystemCollector;
pub use netdev::NetworkCollector;
pub use zpool::{PoolLister, ZpoolCollector, ZpoolCommand};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Series written to the registry.
    pub updated: usize,
    /// Sampler calls that failed outright.
    pub failed: usize,
    /// Malformed records skipped inside an otherwise successful listing.
    pub skipped: usize,
}

/// One family of samplers run together on a shared cadence.
pub trait Collector: Send + Sync + 'static {
    /// Short family name used in logs.
    fn name(&self) -> &'static str;

    /// Runs every sampler once and upserts each successful result.
    ///
    /// Failures are logged and leave the registry untouched for the affected series.
    fn collect(&self, registry: &MetricRegistry) -> impl Future<Output = CycleReport> + Send;
}
