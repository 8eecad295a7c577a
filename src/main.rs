//! anthem-avr - monitor and control an Anthem x00 receiver over IP

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anthem_avr::cli;
use anthem_avr::config::AppConfig;
use anthem_avr::paths::AppPaths;
use anthem_avr::{AvrHandle, Connection};

/// Monitor and control an Anthem A/V receiver over its IP control port
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Receiver host name or address (overrides the config file)
    #[arg(long, env = "AVR_HOST")]
    host: Option<String>,

    /// Receiver control port (overrides the config file)
    #[arg(short, long, env = "AVR_PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Only print change notifications, no prompt
    #[arg(short, long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();

    let config = load_config(&args, &paths).await?;

    let log_dir = if config.logging.file {
        paths
            .ensure_logs_dir()
            .with_context(|| format!("Failed to create {}", paths.logs_dir.display()))?;
        Some(paths.logs_dir.as_path())
    } else {
        None
    };
    let _log_guard = init_logging(&args.log_level, log_dir)?;

    info!("Starting anthem-avr {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Data directory: {} ({})",
        paths.base_dir().display(),
        if paths.is_portable { "portable" } else { "installed" }
    );

    let avr = AvrHandle::spawn(config.timing.reconcile());
    avr.subscribe(Arc::new(|raw: &str| println!("{}", cli::format_notification(raw))));
    avr.on_connection_lost(Arc::new(|| {
        println!("{}", "Connection to receiver lost".red().bold());
    }));

    let mut connection = Connection::open(
        &config.receiver.host,
        config.receiver.port,
        avr.clone(),
        config.timing.command_spacing(),
    )
    .await
    .with_context(|| {
        format!(
            "Failed to connect to {}:{}",
            config.receiver.host, config.receiver.port
        )
    })?;

    if args.monitor {
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = connection.closed() => warn!("Receiver closed the connection"),
        }
    } else {
        println!(
            "Connected to {}. Type {} for commands.",
            connection.peer().bold(),
            "help".cyan()
        );
        tokio::select! {
            result = cli::run_repl(avr.clone()) => result?,
            _ = shutdown_signal() => {}
        }
    }

    info!("Shutting down...");
    connection.close();
    avr.shutdown();

    Ok(())
}

/// Config file (if any) with command-line overrides applied
async fn load_config(args: &Args, paths: &AppPaths) -> Result<AppConfig> {
    let path = args.config.clone().unwrap_or_else(|| paths.config.clone());

    let config = if path.exists() {
        AppConfig::read(&path).await?
    } else if args.config.is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    } else {
        AppConfig::default()
    };

    let config = config.with_overrides(args.host.clone(), args.port);
    config
        .validate()
        .with_context(|| format!("Invalid configuration ({})", path.display()))?;
    Ok(config)
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "anthem-avr.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
