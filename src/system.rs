//! Host data sources read from the /proc filesystem.
//!
//! `HostSource` is the seam between the collectors and the operating system:
//! each method is one sampler query that either returns a normalized value or
//! fails. `ProcfsHost` is the Linux implementation; tests substitute their own.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::collectors::filesystem::{self, Partition};
use crate::collectors::netdev::{self, InterfaceCounters};
use crate::error::SampleError;

/// Queries against one host. All percentages are raw (unrounded) in 0..=100.
pub trait HostSource: Send + Sync + 'static {
    fn memory_used_percent(&self) -> Result<f64, SampleError>;
    fn cpu_used_percent(&self) -> Result<f64, SampleError>;
    fn swap_used_percent(&self) -> Result<f64, SampleError>;
    fn partitions(&self) -> Result<Vec<Partition>, SampleError>;
    fn disk_used_percent(&self, mountpoint: &str) -> Result<f64, SampleError>;
    fn interface_counters(&self) -> Result<Vec<InterfaceCounters>, SampleError>;
}

/// Memory and swap totals parsed from /proc/meminfo, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
}

impl MemInfo {
    pub fn used_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        used as f64 / self.total_kb as f64 * 100.0
    }

    /// Zero when no swap is configured.
    pub fn swap_used_percent(&self) -> f64 {
        if self.swap_total_kb == 0 {
            return 0.0;
        }
        let used = self.swap_total_kb.saturating_sub(self.swap_free_kb);
        used as f64 / self.swap_total_kb as f64 * 100.0
    }
}

/// Parses the fields of /proc/meminfo needed for RAM and swap utilization.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, String> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;
    let mut swap_total_kb: Option<u64> = None;
    let mut swap_free_kb: Option<u64> = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };

        match key {
            "MemTotal:" => total_kb = Some(kb),
            "MemAvailable:" => available_kb = Some(kb),
            "SwapTotal:" => swap_total_kb = Some(kb),
            "SwapFree:" => swap_free_kb = Some(kb),
            _ => {}
        }

        if total_kb.is_some()
            && available_kb.is_some()
            && swap_total_kb.is_some()
            && swap_free_kb.is_some()
        {
            break;
        }
    }

    match (total_kb, available_kb) {
        (Some(total_kb), Some(available_kb)) => Ok(MemInfo {
            total_kb,
            available_kb,
            swap_total_kb: swap_total_kb.unwrap_or(0),
            swap_free_kb: swap_free_kb.unwrap_or(0),
        }),
        _ => Err("MemTotal/MemAvailable missing from /proc/meminfo".to_string()),
    }
}

/// Aggregate CPU time counters from the `cpu` line of /proc/stat, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Idle plus iowait.
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy percentage between `previous` and `self`.
    pub fn busy_percent_since(&self, previous: &CpuStat) -> f64 {
        let delta_total = self.total().saturating_sub(previous.total());
        if delta_total == 0 {
            return 0.0;
        }
        let delta_idle = self.idle_total().saturating_sub(previous.idle_total());
        let busy = delta_total.saturating_sub(delta_idle);
        (busy as f64 / delta_total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Parses the aggregate `cpu ` line of /proc/stat.
pub fn parse_aggregate_cpu(content: &str) -> Result<CpuStat, String> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| "No aggregate cpu line in /proc/stat".to_string())?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Invalid cpu counter in /proc/stat: {}", e))?;

    if fields.len() < 7 {
        return Err(format!(
            "Invalid /proc/stat cpu line: expected at least 7 counters, got {}",
            fields.len()
        ));
    }

    Ok(CpuStat {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
        iowait: fields[4],
        irq: fields[5],
        softirq: fields[6],
        steal: fields.get(7).copied().unwrap_or(0),
    })
}

/// Linux host backed by a procfs mount.
pub struct ProcfsHost {
    proc_root: PathBuf,
    /// Counters seen by the previous CPU sample; the first sample measures since boot.
    cpu_previous: Mutex<CpuStat>,
}

impl ProcfsHost {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Reads from an alternate procfs root (used by tests with a fake tree).
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            cpu_previous: Mutex::new(CpuStat::default()),
        }
    }

    fn read(&self, source_name: &'static str, file: &str) -> Result<String, SampleError> {
        let path = self.proc_root.join(file);
        fs::read_to_string(&path)
            .map_err(|e| SampleError::unavailable(source_name, format!("{}: {}", path.display(), e)))
    }

    fn meminfo(&self, source_name: &'static str) -> Result<MemInfo, SampleError> {
        let content = self.read(source_name, "meminfo")?;
        parse_meminfo(&content).map_err(|e| SampleError::unavailable(source_name, e))
    }
}

impl Default for ProcfsHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSource for ProcfsHost {
    fn memory_used_percent(&self) -> Result<f64, SampleError> {
        Ok(self.meminfo("memory")?.used_percent())
    }

    fn cpu_used_percent(&self) -> Result<f64, SampleError> {
        let content = self.read("cpu", "stat")?;
        let current = parse_aggregate_cpu(&content).map_err(|e| SampleError::unavailable("cpu", e))?;

        let mut previous = self
            .cpu_previous
            .lock()
            .map_err(|e| SampleError::unavailable("cpu", format!("Failed to acquire lock: {}", e)))?;
        let percent = current.busy_percent_since(&previous);
        *previous = current;

        Ok(percent)
    }

    fn swap_used_percent(&self) -> Result<f64, SampleError> {
        Ok(self.meminfo("swap")?.swap_used_percent())
    }

    fn partitions(&self) -> Result<Vec<Partition>, SampleError> {
        let physical_types = filesystem::parse_filesystems(&self.read("filesystem", "filesystems")?);
        let content = self.read("filesystem", "mounts")?;
        Ok(filesystem::parse_mounts(&content, &physical_types))
    }

    fn disk_used_percent(&self, mountpoint: &str) -> Result<f64, SampleError> {
        filesystem::statvfs_used_percent(mountpoint)
    }

    fn interface_counters(&self) -> Result<Vec<InterfaceCounters>, SampleError> {
        let content = self.read("network", "net/dev")?;
        Ok(netdev::parse_netdev(&content))
    }
}
