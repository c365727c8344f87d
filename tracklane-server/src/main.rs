//! Tracklane server: shipment tracking over HTTP with provider fallback.
//!
//! Usage:
//! ```bash
//! # Offline dataset only
//! tracklane
//!
//! # With a config file, credentials from the environment
//! MAERSK_CONSUMER_KEY=... tracklane --config tracklane.toml
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:8080/api/tracking \
//!   -H "Content-Type: application/json" \
//!   -d '{ "trackingNumber": "MAEU1234567" }'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracklane_server::{ServerConfig, bootstrap, config::LogFormat, router};

/// Shipment tracking aggregator.
#[derive(Debug, Parser)]
#[command(name = "tracklane", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "TRACKLANE_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind, overrides config and environment
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides config and environment
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    let ignored = config.merge_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config)?;
    for name in ignored {
        warn!(variable = name, "ignoring invalid environment value");
    }

    let client = bootstrap::http_client()?;
    let state = bootstrap::state(&config, &client)?;
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "tracklane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tracklane stopped");
    Ok(())
}

fn init_tracing(config: &ServerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log level")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow::anyhow!(err))
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
