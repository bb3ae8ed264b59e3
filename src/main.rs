//! Team Progress Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser ──▶ listener ──▶ axum router ──┬─▶ {prefix}/*        forward ──▶ Backend
//!                                          └─▶ OAuth callback    relay   ──▶ Backend
//!                                                   │
//!                       header hygiene, cookie reissue, request IDs
//!
//!   Cross-cutting: config (TOML + BACKEND_BASE_URL, hot reload), tracing,
//!   Prometheus metrics, graceful shutdown on SIGINT/SIGTERM
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use team_progress_proxy::config::{load_config, ConfigWatcher};
use team_progress_proxy::lifecycle::Shutdown;
use team_progress_proxy::observability::{init_logging, metrics};
use team_progress_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "team-progress-proxy")]
#[command(about = "Same-origin cookie-forwarding proxy for the team progress backend", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes when given
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("team-progress-proxy: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.observability);
    tracing::info!("team-progress-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = config.backend.base_url.as_deref().unwrap_or_default(),
        prefix = %config.backend.proxy_prefix,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Without a config file there is nothing to watch; the sender is kept
    // alive so the server's reload loop simply idles.
    let (_idle_tx, idle_rx) = mpsc::unbounded_channel();
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => (None, idle_rx),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
