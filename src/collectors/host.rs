//! RAM, CPU and swap utilization collector.

use std::sync::Arc;
use tracing::warn;

use crate::collectors::{Collector, CycleReport};
use crate::error::SampleError;
use crate::registry::{round_percent, MetricKind, MetricRegistry};
use crate::system::HostSource;

/// Samples the three bare utilization gauges.
pub struct SystemCollector<H: HostSource> {
    host: Arc<H>,
}

impl<H: HostSource> SystemCollector<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

fn record(
    registry: &MetricRegistry,
    report: &mut CycleReport,
    kind: MetricKind,
    sample: Result<f64, SampleError>,
) {
    match sample {
        Ok(value) => {
            registry.upsert(kind, &[], round_percent(value));
            report.updated += 1;
        }
        Err(e) => {
            warn!("Error collecting {}: {}", kind.name(), e);
            report.failed += 1;
        }
    }
}

impl<H: HostSource> Collector for SystemCollector<H> {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn collect(&self, registry: &MetricRegistry) -> CycleReport {
        let mut report = CycleReport::default();

        record(
            registry,
            &mut report,
            MetricKind::RamUsage,
            self.host.memory_used_percent(),
        );
        record(
            registry,
            &mut report,
            MetricKind::CpuUsage,
            self.host.cpu_used_percent(),
        );
        record(
            registry,
            &mut report,
            MetricKind::SwapUsage,
            self.host.swap_used_percent(),
        );

        report
    }
}
