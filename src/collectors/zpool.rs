//! ZFS pool capacity collector.
//!
//! Runs `zpool list -H -o name,cap` (or the configured equivalent) and parses
//! one `name<TAB>NN%` record per line. The command runs under a timeout and is
//! killed if it hangs, so a stuck pool never stalls the other collectors.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::collectors::{Collector, CycleReport};
use crate::error::SampleError;
use crate::registry::{round_percent, MetricKind, MetricRegistry};

const SOURCE: &str = "zpool";

/// Default pool listing command: no header, tab-separated name and capacity.
pub const DEFAULT_ZPOOL_COMMAND: [&str; 5] = ["zpool", "list", "-H", "-o", "name,cap"];

/// Capacity of one pool as reported by the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCapacity {
    pub name: String,
    pub used_percent: f64,
}

/// Source of the raw pool listing.
pub trait PoolLister: Send + Sync + 'static {
    /// Returns the listing's stdout, or fails if it cannot be produced within `timeout`.
    fn list(&self, timeout: Duration) -> impl Future<Output = Result<String, SampleError>> + Send;
}

/// Runs an external command to list pools.
#[derive(Debug, Clone)]
pub struct ZpoolCommand {
    program: String,
    args: Vec<String>,
}

impl ZpoolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds the command from a full argv; `None` if it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ZpoolCommand {
    fn default() -> Self {
        Self::new(
            DEFAULT_ZPOOL_COMMAND[0],
            DEFAULT_ZPOOL_COMMAND[1..]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl PoolLister for ZpoolCommand {
    async fn list(&self, timeout: Duration) -> Result<String, SampleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| SampleError::Timeout {
                source_name: SOURCE,
                after: timeout,
            })?
            .map_err(|e| SampleError::unavailable(SOURCE, format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SampleError::unavailable(
                SOURCE,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parses a single listing line of exactly two fields, the second ending in `%`.
pub fn parse_zpool_line(line: &str) -> Result<PoolCapacity, SampleError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(SampleError::malformed(
            SOURCE,
            line,
            format!("expected 2 fields, got {}", fields.len()),
        ));
    }

    let capacity = fields[1]
        .strip_suffix('%')
        .ok_or_else(|| SampleError::malformed(SOURCE, line, "capacity is missing '%' suffix"))?;

    let used_percent = capacity
        .parse::<f64>()
        .map_err(|e| SampleError::malformed(SOURCE, line, e))?;
    if !used_percent.is_finite() {
        return Err(SampleError::malformed(SOURCE, line, "capacity is not finite"));
    }

    Ok(PoolCapacity {
        name: fields[0].to_string(),
        used_percent,
    })
}

/// Parses the full listing; blank lines are ignored, every other line yields one entry.
pub fn parse_zpool_list(output: &str) -> Vec<Result<PoolCapacity, SampleError>> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_zpool_line)
        .collect()
}

/// Publishes the capacity of every listed pool.
pub struct ZpoolCollector<L: PoolLister> {
    lister: L,
    timeout: Duration,
}

impl<L: PoolLister> ZpoolCollector<L> {
    pub fn new(lister: L, timeout: Duration) -> Self {
        Self { lister, timeout }
    }
}

impl<L: PoolLister> Collector for ZpoolCollector<L> {
    fn name(&self) -> &'static str {
        "zpool"
    }

    async fn collect(&self, registry: &MetricRegistry) -> CycleReport {
        let mut report = CycleReport::default();

        let output = match self.lister.list(self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Error collecting ZFS metrics: {}", e);
                report.failed += 1;
                return report;
            }
        };

        for entry in parse_zpool_list(&output) {
            match entry {
                Ok(pool) => {
                    registry.upsert(
                        MetricKind::PoolUsage,
                        &[&pool.name],
                        round_percent(pool.used_percent),
                    );
                    report.updated += 1;
                }
                Err(e) if e.is_record_level() => {
                    debug!("Skipping pool record: {}", e);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Error collecting ZFS metrics: {}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Zpool pass: {} pools updated, {} records skipped",
            report.updated, report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_separated_line() {
        let pool = parse_zpool_line("tank\t87%").unwrap();
        assert_eq!(pool.name, "tank");
        assert_eq!(pool.used_percent, 87.0);
    }

    #[test]
    fn test_parse_missing_percent_sign() {
        let err = parse_zpool_line("tank 87").unwrap_err();
        assert!(err.is_record_level());
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert!(parse_zpool_line("tank").is_err());
        assert!(parse_zpool_line("tank 87% ONLINE").is_err());
    }

    #[test]
    fn test_parse_non_numeric_capacity() {
        assert!(parse_zpool_line("backup xx%").is_err());
        assert!(parse_zpool_line("backup NaN%").is_err());
        assert!(parse_zpool_line("backup -%").is_err());
    }

    #[test]
    fn test_parse_list_continues_after_malformed_lines() {
        let entries = parse_zpool_list("tank 87\nbackup xx%\n\nrpool\t12%\n");
        assert_eq!(entries.len(), 3);

        let pools: Vec<PoolCapacity> = entries.into_iter().filter_map(Result::ok).collect();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "rpool");
        assert_eq!(pools[0].used_percent, 12.0);
    }

    #[test]
    fn test_from_argv() {
        let argv: Vec<String> = DEFAULT_ZPOOL_COMMAND.iter().map(|s| s.to_string()).collect();
        let command = ZpoolCommand::from_argv(&argv).unwrap();
        assert_eq!(command.program(), "zpool");
        assert!(ZpoolCommand::from_argv(&[]).is_none());
    }
}
