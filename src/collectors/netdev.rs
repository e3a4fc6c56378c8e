//! Network interface byte counter collector.
//!
//! Reads cumulative per-interface counters from /proc/net/dev and publishes
//! them for interfaces whose name starts with the configured prefix. Counters
//! are exported as-is; rates are left to the scraper.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::collectors::{Collector, CycleReport};
use crate::registry::{MetricKind, MetricRegistry};
use crate::system::HostSource;

/// Default prefix of the physical NIC names on the target hosts.
pub const DEFAULT_INTERFACE_PREFIX: &str = "ens";

/// Cumulative byte counters for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// Parses /proc/net/dev.
///
/// Lines that do not carry the full 16 counters are skipped.
pub fn parse_netdev(content: &str) -> Vec<InterfaceCounters> {
    let mut counters = Vec::new();

    // The first two lines are column headers
    for line in content.lines().skip(2) {
        let Some((name, stats)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = stats.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let (Ok(bytes_recv), Ok(bytes_sent)) =
            (values[0].parse::<u64>(), values[8].parse::<u64>())
        else {
            continue;
        };

        counters.push(InterfaceCounters {
            name: name.trim().to_string(),
            bytes_recv,
            bytes_sent,
        });
    }

    counters
}

/// Publishes sent/received bytes of the matching interfaces.
pub struct NetworkCollector<H: HostSource> {
    host: Arc<H>,
    interface_prefix: String,
}

impl<H: HostSource> NetworkCollector<H> {
    pub fn new(host: Arc<H>, interface_prefix: impl Into<String>) -> Self {
        Self {
            host,
            interface_prefix: interface_prefix.into(),
        }
    }
}

impl<H: HostSource> Collector for NetworkCollector<H> {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn collect(&self, registry: &MetricRegistry) -> CycleReport {
        let mut report = CycleReport::default();

        let counters = match self.host.interface_counters() {
            Ok(counters) => counters,
            Err(e) => {
                warn!("Error collecting network I/O stats: {}", e);
                report.failed += 1;
                return report;
            }
        };

        for iface in counters
            .iter()
            .filter(|c| c.name.starts_with(&self.interface_prefix))
        {
            registry.upsert(
                MetricKind::NetBytesSent,
                &[&iface.name],
                iface.bytes_sent as f64,
            );
            registry.upsert(
                MetricKind::NetBytesRecv,
                &[&iface.name],
                iface.bytes_recv as f64,
            );
            report.updated += 2;
        }

        debug!(
            "Network pass: {} of {} interfaces match prefix {:?}",
            report.updated / 2,
            counters.len(),
            self.interface_prefix
        );
        report
    }
}
