//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("envirobly-exporter.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Envirobly Exporter Configuration
# ================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"                  # Bind IP (0.0.0.0 = all interfaces)
# port: 63107                      # HTTP port
# log_level: "info"                # off, error, warn, info, debug, trace
#
# Collection Intervals (seconds, each collector runs independently)
# -----------------------------------------------------------------
# system_interval_secs: 5          # RAM, CPU, swap
# network_interval_secs: 5         # Interface byte counters
# filesystem_interval_secs: 10     # Per-mount usage
# zpool_interval_secs: 10          # ZFS pool capacity
#
# Pool Listing
# ------------
# zpool_timeout_secs: 5            # Kill the listing command after N seconds
# zpool_command: ["zpool", "list", "-H", "-o", "name,cap"]
#
# Filters
# -------
# excluded_mount_prefixes:         # Mount points never reported
#   - /boot/efi
#   - /var/envirobly/zpools
#   - /var/lib/docker/volumes
# interface_prefix: "ens"          # Only interfaces starting with this prefix
#
# Collector Enable Flags
# ----------------------
# enable_system_collector: true
# enable_network_collector: true
# enable_filesystem_collector: true
# enable_zpool_collector: true
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false                # Enable HTTPS (default: false)
# tls_cert_path: null              # Path to TLS certificate (PEM format)
# tls_key_path: null               # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
