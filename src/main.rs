//! envirobly-exporter - version 0.1.0
//!
//! Host utilization exporter with tracing logging.
//! This is the main entry point that starts the collection tasks and the
//! HTTP server, and handles subcommands.

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn, Level};

use envirobly_exporter::cli::{Args, Commands, LogLevel};
use envirobly_exporter::commands::{command_config, command_test};
use envirobly_exporter::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use envirobly_exporter::handlers::router;
use envirobly_exporter::startup_checks;
use envirobly_exporter::{start_collectors, AppState, MetricRegistry};

/// How long in-flight TLS connections may take to finish after shutdown is requested.
const TLS_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let log_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {}", level.as_str());
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    if let Some(command) = &args.command {
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),

            Commands::Test {
                iterations,
                pause_ms,
            } => {
                let config = load_validated_config(&args)?;
                command_test(*iterations, *pause_ms, &config).await
            }

            Commands::CheckRequirements => {
                let config = load_validated_config(&args)?;
                setup_logging(config.log_level()?);
                println!("🔍 Checking Runtime Requirements");
                println!("================================\n");

                match startup_checks::validate_requirements(&config) {
                    Ok(()) => {
                        println!("\n✅ All requirements met - ready for production!");
                        Ok(())
                    }
                    Err(e) => {
                        eprintln!("\n❌ Requirements check failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        };
    }

    let config = load_validated_config(&args)?;

    setup_logging(config.log_level()?);

    info!("Starting envirobly-exporter");

    if let Err(e) = startup_checks::validate_requirements(&config) {
        warn!("⚠️  Startup validation failed: {}", e);
        warn!("   The exporter will start but some metrics may be missing");
    }

    let bind_ip_str = config.bind.clone().unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let registry = Arc::new(MetricRegistry::new()?);
    let tls_paths = if config.enable_tls.unwrap_or(false) {
        // Both paths are present, validate_effective_config() checked them
        match (config.tls_cert_path.clone(), config.tls_key_path.clone()) {
            (Some(cert_path), Some(key_path)) => Some((cert_path, key_path)),
            _ => return Err("TLS enabled without certificate and key paths".into()),
        }
    } else {
        None
    };

    let supervisor = start_collectors(&config, Arc::clone(&registry));
    let app = router(AppState::new(registry, config));

    let served = if let Some((cert_path, key_path)) = tls_paths {
        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = match RustlsConfig::from_pem_file(&cert_path, &key_path).await {
            Ok(tls_config) => tls_config,
            Err(e) => {
                error!("Failed to load TLS configuration: {}", e);
                supervisor.shutdown().await;
                return Err(e.into());
            }
        };

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(TLS_GRACE_PERIOD));
        });

        info!("envirobly-exporter listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
    } else {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                supervisor.shutdown().await;
                std::process::exit(1);
            }
        };
        info!("envirobly-exporter listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    supervisor.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("envirobly-exporter stopped gracefully");
    Ok(())
}
