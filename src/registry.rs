//! Prometheus metric registry shared by the collection tasks and the `/metrics` handler.
//!
//! Every metric is registered up front as a `GaugeVec`, including the bare
//! gauges (RAM, CPU, swap) which use an empty label set. Children are created
//! lazily on the first successful upsert, so a metric that was never sampled
//! does not appear in a scrape. Gauge values are stored atomically, so a
//! concurrent snapshot never sees a partially written value.

use ahash::AHashMap as HashMap;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Identity of one metric family exported by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    RamUsage,
    CpuUsage,
    SwapUsage,
    PoolUsage,
    FilesystemUsage,
    NetBytesSent,
    NetBytesRecv,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::RamUsage,
        MetricKind::CpuUsage,
        MetricKind::SwapUsage,
        MetricKind::PoolUsage,
        MetricKind::FilesystemUsage,
        MetricKind::NetBytesSent,
        MetricKind::NetBytesRecv,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::RamUsage => "envirobly_ram_usage_percent",
            MetricKind::CpuUsage => "envirobly_cpu_usage_percent",
            MetricKind::SwapUsage => "envirobly_swap_usage_percent",
            MetricKind::PoolUsage => "envirobly_zpool_usage_percent",
            MetricKind::FilesystemUsage => "envirobly_filesystem_usage_percent",
            MetricKind::NetBytesSent => "envirobly_network_bytes_sent_total",
            MetricKind::NetBytesRecv => "envirobly_network_bytes_recv_total",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricKind::RamUsage => "Total RAM utilization in percent",
            MetricKind::CpuUsage => "Total CPU utilization in percent (across all cores)",
            MetricKind::SwapUsage => "Total swap memory utilization in percent",
            MetricKind::PoolUsage => "ZFS pool utilization in percent (capacity)",
            MetricKind::FilesystemUsage => "Filesystem utilization in percent",
            MetricKind::NetBytesSent => "Total bytes transmitted on network interfaces",
            MetricKind::NetBytesRecv => "Total bytes received on network interfaces",
        }
    }

    /// Label names, fixed per metric kind.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            MetricKind::RamUsage | MetricKind::CpuUsage | MetricKind::SwapUsage => &[],
            MetricKind::PoolUsage => &["pool"],
            MetricKind::FilesystemUsage => &["filesystem", "mountpoint"],
            MetricKind::NetBytesSent | MetricKind::NetBytesRecv => &["interface"],
        }
    }
}

/// Rounds a percentage to two decimal places before it is stored.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Thread-safe mapping from (metric, label values) to the latest sampled value.
pub struct MetricRegistry {
    registry: Registry,
    gauges: HashMap<MetricKind, GaugeVec>,
}

impl MetricRegistry {
    /// Creates a custom registry (no process/default metrics) with every metric kind registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let mut gauges = HashMap::new();

        for kind in MetricKind::ALL {
            let vec = GaugeVec::new(Opts::new(kind.name(), kind.help()), kind.label_names())?;
            registry.register(Box::new(vec.clone()))?;
            gauges.insert(kind, vec);
        }

        Ok(Self { registry, gauges })
    }

    /// Replaces the current value for `(kind, labels)`, creating the series on first use.
    ///
    /// `labels` are positional and must match `kind.label_names()`.
    pub fn upsert(&self, kind: MetricKind, labels: &[&str], value: f64) {
        let Some(vec) = self.gauges.get(&kind) else {
            return;
        };

        match vec.get_metric_with_label_values(labels) {
            Ok(gauge) => gauge.set(value),
            Err(e) => warn!(
                "Dropping {} sample with labels {:?}: {}",
                kind.name(),
                labels,
                e
            ),
        }
    }

    /// Returns an owned copy of every series currently registered.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            families: self.registry.gather(),
        }
    }
}

/// Immutable view of the registry taken at one instant.
///
/// Families with no series yet are omitted by the gatherer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Snapshot {
    /// Total number of series across all families.
    pub fn series_count(&self) -> usize {
        self.families.iter().map(|f| f.get_metric().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series_count() == 0
    }

    /// Looks up a single series by metric kind and label pairs.
    pub fn value(&self, kind: MetricKind, labels: &[(&str, &str)]) -> Option<f64> {
        let family = self
            .families
            .iter()
            .find(|f| f.get_name() == kind.name())?;

        family
            .get_metric()
            .iter()
            .find(|m| {
                let pairs = m.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(name, value)| {
                        pairs
                            .iter()
                            .any(|p| p.get_name() == *name && p.get_value() == *value)
                    })
            })
            .map(|m| m.get_gauge().value())
    }

    /// Label values of every series of `kind` for the given label name.
    pub fn label_values(&self, kind: MetricKind, label: &str) -> Vec<String> {
        self.families
            .iter()
            .filter(|f| f.get_name() == kind.name())
            .flat_map(|f| f.get_metric().iter())
            .flat_map(|m| m.get_label().iter())
            .filter(|p| p.get_name() == label)
            .map(|p| p.get_value().to_string())
            .collect()
    }

    /// Renders the snapshot in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(42.567), 42.57);
        assert_eq!(round_percent(13.1), 13.1);
        assert_eq!(round_percent(0.004), 0.0);
        assert_eq!(round_percent(100.0), 100.0);
    }

    #[test]
    fn test_label_sets_are_fixed_per_kind() {
        assert!(MetricKind::RamUsage.label_names().is_empty());
        assert_eq!(MetricKind::PoolUsage.label_names(), &["pool"]);
        assert_eq!(
            MetricKind::FilesystemUsage.label_names(),
            &["filesystem", "mountpoint"]
        );
        assert_eq!(MetricKind::NetBytesRecv.label_names(), &["interface"]);
    }

    #[test]
    fn test_unsampled_metrics_are_absent() {
        let registry = MetricRegistry::new().unwrap();
        let snapshot = registry.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.encode().unwrap(), "");
    }

    #[test]
    fn test_upsert_replaces_value() {
        let registry = MetricRegistry::new().unwrap();
        registry.upsert(MetricKind::CpuUsage, &[], 13.1);
        registry.upsert(MetricKind::CpuUsage, &[], 20.0);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.series_count(), 1);
        assert_eq!(snapshot.value(MetricKind::CpuUsage, &[]), Some(20.0));
    }

    #[test]
    fn test_wrong_label_count_is_dropped() {
        let registry = MetricRegistry::new().unwrap();
        registry.upsert(MetricKind::PoolUsage, &[], 10.0);
        registry.upsert(MetricKind::PoolUsage, &["tank", "extra"], 10.0);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_later_writes() {
        let registry = MetricRegistry::new().unwrap();
        registry.upsert(MetricKind::PoolUsage, &["tank"], 55.0);
        let snapshot = registry.snapshot();
        registry.upsert(MetricKind::PoolUsage, &["tank"], 60.0);

        assert_eq!(
            snapshot.value(MetricKind::PoolUsage, &[("pool", "tank")]),
            Some(55.0)
        );
    }

    #[test]
    fn test_encode_headers() {
        let registry = MetricRegistry::new().unwrap();
        registry.upsert(MetricKind::FilesystemUsage, &["/dev/sda1", "/"], 41.5);
        registry.upsert(MetricKind::FilesystemUsage, &["/dev/sdb1", "/data"], 7.25);

        let text = registry.snapshot().encode().unwrap();
        assert_eq!(
            text.matches("# TYPE envirobly_filesystem_usage_percent gauge")
                .count(),
            1
        );
        assert!(text.contains("# HELP envirobly_filesystem_usage_percent Filesystem utilization in percent"));
        assert!(text.contains(
            "envirobly_filesystem_usage_percent{filesystem=\"/dev/sda1\",mountpoint=\"/\"} 41.5"
        ));
        assert!(text.contains(
            "envirobly_filesystem_usage_percent{filesystem=\"/dev/sdb1\",mountpoint=\"/data\"} 7.25"
        ));
    }
}
