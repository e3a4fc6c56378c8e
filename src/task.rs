//! Periodic collection task.
//!
//! A task drives one collector on a fixed interval for the life of the
//! process. The first cycle runs immediately; a slow cycle delays the next
//! tick instead of producing a burst. Shutdown is observed between cycles, so
//! an in-flight cycle always completes.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::collectors::Collector;
use crate::registry::MetricRegistry;

/// Minimum allowed collection interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// One collector bound to its registry and cadence.
pub struct CollectionTask<C: Collector> {
    collector: C,
    registry: Arc<MetricRegistry>,
    interval: Duration,
}

impl<C: Collector> CollectionTask<C> {
    pub fn new(collector: C, registry: Arc<MetricRegistry>, interval: Duration) -> Self {
        Self {
            collector,
            registry,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn name(&self) -> &'static str {
        self.collector.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let name = self.collector.name();
        info!("Collection task '{}' started (interval {:?})", name, self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let start = Instant::now();
            let report = self.collector.collect(&self.registry).await;
            debug!(
                "Collection task '{}' cycle: {} updated, {} failed, {} skipped, {:.3}ms",
                name,
                report.updated,
                report.failed,
                report.skipped,
                start.elapsed().as_secs_f64() * 1000.0
            );
        }

        info!("Collection task '{}' stopped", name);
    }

    /// Spawns the task onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
