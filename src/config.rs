//! Configuration management for envirobly-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use clap::ValueEnum;
use crate::collectors::filesystem::DEFAULT_EXCLUDED_MOUNT_PREFIXES;
use crate::collectors::netdev::DEFAULT_INTERFACE_PREFIX;
use crate::collectors::zpool::DEFAULT_ZPOOL_COMMAND;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 63107;
pub const DEFAULT_SYSTEM_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_NETWORK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_FILESYSTEM_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_ZPOOL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_ZPOOL_TIMEOUT_SECS: u64 = 5;

/// Exporter configuration. Every field is optional; unset fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Logging
    pub log_level: Option<String>,

    // Collection intervals
    #[serde(alias = "system-interval-secs")]
    pub system_interval_secs: Option<u64>,
    #[serde(alias = "network-interval-secs")]
    pub network_interval_secs: Option<u64>,
    #[serde(alias = "filesystem-interval-secs")]
    pub filesystem_interval_secs: Option<u64>,
    #[serde(alias = "zpool-interval-secs")]
    pub zpool_interval_secs: Option<u64>,

    // Pool listing
    #[serde(alias = "zpool-timeout-secs")]
    pub zpool_timeout_secs: Option<u64>,
    /// Full argv of the pool listing command
    #[serde(alias = "zpool-command")]
    pub zpool_command: Option<Vec<String>>,

    // Filters
    #[serde(alias = "excluded-mount-prefixes")]
    pub excluded_mount_prefixes: Option<Vec<String>>,
    #[serde(alias = "interface-prefix")]
    pub interface_prefix: Option<String>,

    // Collector enable flags
    #[serde(alias = "enable-system-collector")]
    pub enable_system_collector: Option<bool>,
    #[serde(alias = "enable-network-collector")]
    pub enable_network_collector: Option<bool>,
    #[serde(alias = "enable-filesystem-collector")]
    pub enable_filesystem_collector: Option<bool>,
    #[serde(alias = "enable-zpool-collector")]
    pub enable_zpool_collector: Option<bool>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            log_level: Some("info".into()),
            system_interval_secs: Some(DEFAULT_SYSTEM_INTERVAL_SECS),
            network_interval_secs: Some(DEFAULT_NETWORK_INTERVAL_SECS),
            filesystem_interval_secs: Some(DEFAULT_FILESYSTEM_INTERVAL_SECS),
            zpool_interval_secs: Some(DEFAULT_ZPOOL_INTERVAL_SECS),
            zpool_timeout_secs: Some(DEFAULT_ZPOOL_TIMEOUT_SECS),
            zpool_command: Some(DEFAULT_ZPOOL_COMMAND.iter().map(|s| s.to_string()).collect()),
            excluded_mount_prefixes: Some(
                DEFAULT_EXCLUDED_MOUNT_PREFIXES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            interface_prefix: Some(DEFAULT_INTERFACE_PREFIX.to_string()),
            enable_system_collector: Some(true),
            enable_network_collector: Some(true),
            enable_filesystem_collector: Some(true),
            enable_zpool_collector: Some(true),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn system_interval(&self) -> Duration {
        Duration::from_secs(self.system_interval_secs.unwrap_or(DEFAULT_SYSTEM_INTERVAL_SECS))
    }

    pub fn network_interval(&self) -> Duration {
        Duration::from_secs(
            self.network_interval_secs
                .unwrap_or(DEFAULT_NETWORK_INTERVAL_SECS),
        )
    }

    pub fn filesystem_interval(&self) -> Duration {
        Duration::from_secs(
            self.filesystem_interval_secs
                .unwrap_or(DEFAULT_FILESYSTEM_INTERVAL_SECS),
        )
    }

    pub fn zpool_interval(&self) -> Duration {
        Duration::from_secs(self.zpool_interval_secs.unwrap_or(DEFAULT_ZPOOL_INTERVAL_SECS))
    }

    pub fn zpool_timeout(&self) -> Duration {
        Duration::from_secs(self.zpool_timeout_secs.unwrap_or(DEFAULT_ZPOOL_TIMEOUT_SECS))
    }

    pub fn zpool_argv(&self) -> Vec<String> {
        self.zpool_command
            .clone()
            .unwrap_or_else(|| DEFAULT_ZPOOL_COMMAND.iter().map(|s| s.to_string()).collect())
    }

    pub fn excluded_mount_prefixes(&self) -> Vec<String> {
        self.excluded_mount_prefixes.clone().unwrap_or_else(|| {
            DEFAULT_EXCLUDED_MOUNT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    /// Effective log level; unset means info.
    pub fn log_level(&self) -> Result<LogLevel, String> {
        match self.log_level.as_deref() {
            None => Ok(LogLevel::Info),
            Some(level) => LogLevel::from_str(level, true)
                .map_err(|_| format!("Invalid log_level '{}' (off, error, warn, info, debug, trace)", level)),
        }
    }

    pub fn interface_prefix(&self) -> &str {
        self.interface_prefix
            .as_deref()
            .unwrap_or(DEFAULT_INTERFACE_PREFIX)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    cfg.log_level()?;

    let intervals = [
        ("system_interval_secs", cfg.system_interval_secs),
        ("network_interval_secs", cfg.network_interval_secs),
        ("filesystem_interval_secs", cfg.filesystem_interval_secs),
        ("zpool_interval_secs", cfg.zpool_interval_secs),
        ("zpool_timeout_secs", cfg.zpool_timeout_secs),
    ];
    for (name, value) in intervals {
        if value == Some(0) {
            return Err(format!("{} must be greater than 0", name).into());
        }
    }

    if cfg.enable_zpool_collector.unwrap_or(true) {
        let argv = cfg.zpool_argv();
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            return Err("zpool_command must name a program to run".into());
        }
    }

    if cfg.interface_prefix().is_empty() {
        return Err("interface_prefix must not be empty".into());
    }

    if cfg
        .excluded_mount_prefixes()
        .iter()
        .any(|prefix| prefix.is_empty())
    {
        return Err("excluded_mount_prefixes must not contain empty entries".into());
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and is not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }

    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(prefix) = &args.interface_prefix {
        config.interface_prefix = Some(prefix.clone());
    }

    if !args.exclude_mounts.is_empty() {
        config.excluded_mount_prefixes = Some(args.exclude_mounts.clone());
    }

    if let Some(timeout) = args.zpool_timeout {
        config.zpool_timeout_secs = Some(timeout);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// Without an explicit path the default locations are tried in order; if none
/// exists the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/envirobly/exporter.yaml",
                "/etc/envirobly/exporter.yml",
                "/etc/envirobly/exporter.json",
                "./envirobly-exporter.yaml",
                "./envirobly-exporter.yml",
                "./envirobly-exporter.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
