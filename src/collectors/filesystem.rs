//! Filesystem utilization collector.
//!
//! Enumerates mounted partitions from /proc/mounts, keeps only block-device
//! filesystem types listed in /proc/filesystems (and zfs), drops mount
//! points under the configured excluded prefixes, and reports the
//! used percentage of each remaining mount via statvfs.

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::collectors::{Collector, CycleReport};
use crate::error::SampleError;
use crate::registry::{round_percent, MetricKind, MetricRegistry};
use crate::system::HostSource;

/// Mount points excluded by default: EFI partitions, pool-managed storage and
/// Docker volume storage.
pub const DEFAULT_EXCLUDED_MOUNT_PREFIXES: [&str; 3] = [
    "/boot/efi",
    "/var/envirobly/zpools",
    "/var/lib/docker/volumes",
];

/// Always treated as physical even though /proc/filesystems marks it `nodev`.
const ZFS_FSTYPE: &str = "zfs";

/// One mounted partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

/// Usage of one mount point after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesystemUsage {
    pub device: String,
    pub mountpoint: String,
    pub used_percent: f64,
}

/// Parses /proc/filesystems into the types that need a block device.
///
/// Lines flagged `nodev` (proc, tmpfs, nfs, cifs, fuse, ...) are dropped.
pub fn parse_filesystems(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nodev"), _) => None,
                (Some(fstype), None) => Some(fstype.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Parses /proc/mounts, keeping only partitions whose type is in
/// `physical_types` (plus zfs). Mounts with device `none` are skipped.
pub fn parse_mounts(content: &str, physical_types: &[String]) -> Vec<Partition> {
    let mut partitions = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let (device, fstype) = (parts[0], parts[2]);
        if device == "none" {
            continue;
        }
        if fstype != ZFS_FSTYPE && !physical_types.iter().any(|t| t == fstype) {
            continue;
        }

        partitions.push(Partition {
            device: unescape_mount_field(device),
            mountpoint: unescape_mount_field(parts[1]),
            fstype: fstype.to_string(),
        });
    }

    partitions
}

/// Decodes the octal escapes the kernel uses for whitespace and backslashes
/// in mount fields (`\040` for space, `\011` tab, `\012` newline, `\134` backslash).
fn unescape_mount_field(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let code = std::str::from_utf8(&bytes[i + 1..i + 4])
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(code) = code {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Case-sensitive path prefix match against the excluded prefixes.
pub fn is_excluded_mount(mountpoint: &str, excluded_prefixes: &[String]) -> bool {
    excluded_prefixes
        .iter()
        .any(|prefix| mountpoint.starts_with(prefix.as_str()))
}

/// Runs one filesystem pass against `host`.
///
/// Fails only if the partition list itself is unavailable; a failing mount
/// point yields an error entry and the remaining mounts are still sampled.
pub fn sample_filesystems<H: HostSource + ?Sized>(
    host: &H,
    excluded_prefixes: &[String],
) -> Result<Vec<Result<FilesystemUsage, SampleError>>, SampleError> {
    let partitions = host.partitions()?;

    Ok(partitions
        .into_iter()
        .filter(|p| !is_excluded_mount(&p.mountpoint, excluded_prefixes))
        .map(|p| {
            host.disk_used_percent(&p.mountpoint)
                .map(|used_percent| FilesystemUsage {
                    device: p.device,
                    mountpoint: p.mountpoint,
                    used_percent,
                })
        })
        .collect())
}

/// Used percentage of a mount point from statvfs, as used / (used + available).
pub fn statvfs_used_percent(path: &str) -> Result<f64, SampleError> {
    let (size, free, available) = get_statvfs_blocks(path)?;
    let used = size.saturating_sub(free);
    let denominator = used + available;
    if denominator == 0 {
        return Ok(0.0);
    }
    Ok(used as f64 / denominator as f64 * 100.0)
}

/// Returns (size, free, available) in bytes for `path`.
fn get_statvfs_blocks(path: &str) -> Result<(u64, u64, u64), SampleError> {
    use std::ffi::CString;
    use std::mem;

    let c_path = CString::new(path)
        .map_err(|e| SampleError::unavailable("filesystem", format!("Invalid path {}: {}", path, e)))?;

    // SAFETY: statvfs only writes into the zero-initialized struct we own, and
    // c_path is a valid NUL-terminated string for the duration of the call.
    unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(SampleError::unavailable(
                "filesystem",
                format!("statvfs failed for {}: {}", path, std::io::Error::last_os_error()),
            ));
        }

        let block_size = stat.f_frsize as u64;
        Ok((
            block_size * stat.f_blocks as u64,
            block_size * stat.f_bfree as u64,
            block_size * stat.f_bavail as u64,
        ))
    }
}

/// Samples every non-excluded mount point.
pub struct FilesystemCollector<H: HostSource> {
    host: Arc<H>,
    excluded_prefixes: Arc<Vec<String>>,
}

impl<H: HostSource> FilesystemCollector<H> {
    pub fn new(host: Arc<H>, excluded_prefixes: Vec<String>) -> Self {
        Self {
            host,
            excluded_prefixes: Arc::new(excluded_prefixes),
        }
    }
}

impl<H: HostSource> Collector for FilesystemCollector<H> {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn collect(&self, registry: &MetricRegistry) -> CycleReport {
        let mut report = CycleReport::default();

        // statvfs on a stale network mount can block, keep it off the runtime threads
        let host = Arc::clone(&self.host);
        let prefixes = Arc::clone(&self.excluded_prefixes);
        let joined =
            tokio::task::spawn_blocking(move || sample_filesystems(host.as_ref(), &prefixes)).await;

        let results = match joined {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                warn!("Error collecting filesystem partitions: {}", e);
                report.failed += 1;
                return report;
            }
            Err(e) => {
                error!("Filesystem sampling task failed: {}", e);
                report.failed += 1;
                return report;
            }
        };

        for result in results {
            match result {
                Ok(usage) => {
                    registry.upsert(
                        MetricKind::FilesystemUsage,
                        &[&usage.device, &usage.mountpoint],
                        round_percent(usage.used_percent),
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    warn!("Error collecting filesystem usage: {}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Filesystem pass: {} mounts updated, {} failed",
            report.updated, report.failed
        );
        report
    }
}
