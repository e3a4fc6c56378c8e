//! Owner of the background collection tasks.
//!
//! The supervisor spawns one task per enabled collector family, keeps their
//! join handles, and drains them on shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::collectors::{
    Collector, FilesystemCollector, NetworkCollector, SystemCollector, ZpoolCollector,
    ZpoolCommand,
};
use crate::config::Config;
use crate::registry::MetricRegistry;
use crate::system::{HostSource, ProcfsHost};
use crate::task::CollectionTask;

pub struct Supervisor {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Spawns `collector` as an independent task on its own interval.
    pub fn spawn<C: Collector>(
        &mut self,
        collector: C,
        registry: Arc<MetricRegistry>,
        interval: Duration,
    ) {
        let task = CollectionTask::new(collector, registry, interval);
        let name = task.name();
        let handle = task.spawn(self.shutdown_tx.subscribe());
        self.tasks.push((name, handle));
    }

    /// Names of the running tasks, in spawn order.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    /// Signals every task to stop after its current cycle and waits for all of them.
    pub async fn shutdown(self) {
        info!("Stopping {} collection tasks", self.tasks.len());
        // send only fails when every receiver is gone, i.e. all tasks already exited
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                error!("Collection task '{}' ended abnormally: {}", name, e);
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the collectors enabled in `config` against the local procfs.
pub fn start_collectors(config: &Config, registry: Arc<MetricRegistry>) -> Supervisor {
    start_collectors_with_host(config, registry, Arc::new(ProcfsHost::new()))
}

/// Spawns the collectors enabled in `config` against `host`.
pub fn start_collectors_with_host<H: HostSource>(
    config: &Config,
    registry: Arc<MetricRegistry>,
    host: Arc<H>,
) -> Supervisor {
    let mut supervisor = Supervisor::new();

    if config.enable_system_collector.unwrap_or(true) {
        supervisor.spawn(
            SystemCollector::new(Arc::clone(&host)),
            Arc::clone(&registry),
            config.system_interval(),
        );
    }

    if config.enable_network_collector.unwrap_or(true) {
        supervisor.spawn(
            NetworkCollector::new(Arc::clone(&host), config.interface_prefix()),
            Arc::clone(&registry),
            config.network_interval(),
        );
    }

    if config.enable_filesystem_collector.unwrap_or(true) {
        supervisor.spawn(
            FilesystemCollector::new(Arc::clone(&host), config.excluded_mount_prefixes()),
            Arc::clone(&registry),
            config.filesystem_interval(),
        );
    }

    if config.enable_zpool_collector.unwrap_or(true) {
        match ZpoolCommand::from_argv(&config.zpool_argv()) {
            Some(command) => supervisor.spawn(
                ZpoolCollector::new(command, config.zpool_timeout()),
                Arc::clone(&registry),
                config.zpool_interval(),
            ),
            None => warn!("zpool_command is empty, pool collector not started"),
        }
    }

    info!(
        "Started collection tasks: {}",
        supervisor.task_names().join(", ")
    );
    supervisor
}
