//! Startup requirement validation for envirobly-exporter.
//!
//! This module validates that the exporter can read the procfs files its
//! samplers depend on and that the pool listing command can be found.

use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;

/// procfs files read by the samplers.
const PROC_FILES: [&str; 5] = ["meminfo", "stat", "mounts", "filesystems", "net/dev"];

/// Validate all runtime requirements
pub fn validate_requirements(config: &Config) -> Result<(), ValidationError> {
    validate_requirements_at(config, Path::new("/proc"))
}

/// Same as [`validate_requirements`] against an alternate procfs root.
pub fn validate_requirements_at(config: &Config, proc_root: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_access(proc_root)?;

    if config.enable_zpool_collector.unwrap_or(true) {
        check_pool_command(config)?;
    }

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Statvfs on some mounts needs elevated privileges; not fatal.
fn check_user_privileges() {
    if geteuid().is_root() {
        info!("✅ Running as root (uid=0)");
    } else {
        warn!("⚠️  Not running as root - some mount points may not be readable");
    }
}

fn check_proc_access(proc_root: &Path) -> Result<(), ValidationError> {
    for file in PROC_FILES {
        let path = proc_root.join(file);
        fs::read_to_string(&path)
            .map_err(|e| ValidationError::ProcUnavailable(path.display().to_string(), e.to_string()))?;
    }
    info!("✅ procfs access: {} readable", proc_root.display());
    Ok(())
}

fn check_pool_command(config: &Config) -> Result<(), ValidationError> {
    let argv = config.zpool_argv();
    let program = argv.first().cloned().unwrap_or_default();

    match which::which(&program) {
        Ok(path) => {
            info!("✅ Pool command found: {}", path.display());
            Ok(())
        }
        Err(e) => {
            warn!("⚠️  Pool command '{}' not found: {}", program, e);
            warn!("   Pool capacity metrics will be missing; set enable_zpool_collector: false to silence");
            Err(ValidationError::PoolCommandMissing(program))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Cannot read {0}: {1}")]
    ProcUnavailable(String, String),

    #[error("Pool command not found on PATH: {0}")]
    PoolCommandMissing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_proc_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            enable_zpool_collector: Some(false),
            ..Config::default()
        };
        let err = validate_requirements_at(&config, dir.path()).unwrap_err();
        assert!(matches!(err, ValidationError::ProcUnavailable(..)));
    }

    #[test]
    fn test_missing_pool_command() {
        let dir = tempfile::tempdir().unwrap();
        for file in PROC_FILES {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let config = Config {
            zpool_command: Some(vec!["no-such-pool-tool-for-tests".to_string()]),
            ..Config::default()
        };
        let err = validate_requirements_at(&config, dir.path()).unwrap_err();
        assert!(matches!(err, ValidationError::PoolCommandMissing(ref p) if p == "no-such-pool-tool-for-tests"));
    }
}
