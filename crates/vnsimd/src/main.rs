//! vnsimd - Vehicle Network Simulator Daemon
//!
//! Usage:
//!   vnsimd [OPTIONS]
//!
//! Without a config file the built-in DTC/DID tables and default timings are
//! used and the server listens on 0.0.0.0:3000 (or `$PORT`).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vnsimd::{AppState, Config, ServerBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vnsimd")]
#[command(about = "Vehicle network simulator: telemetry and UDS diagnostics over WebSocket")]
struct Args {
    /// Configuration file (TOML, or YAML by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Listen port, overrides the port of the bind address
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(args: &Args) {
    let default_filter = if args.verbose {
        "vnsimd=debug,vnsim_uds=debug,vnsim_core=debug,tower_http=debug"
    } else {
        "vnsimd=info,vnsim_uds=debug,vnsim_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    tracing::info!("Starting vnsimd (Vehicle Network Simulator)");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            tracing::info!("No config file provided, using built-in defaults");
            Config::default()
        }
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.bind.set_port(port);
    }
    config.validate().context("invalid configuration")?;

    let state = AppState::from_config(&config).context("building simulator")?;
    let handle = ServerBuilder::new(config.server.bind, state)
        .ws_path(config.server.path.clone())
        .spawn()
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;

    tracing::info!(
        "Server running on ws://{}{}",
        handle.local_addr(),
        config.server.path
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    tracing::info!("Shutting down");
    handle.shutdown().await?;

    Ok(())
}
