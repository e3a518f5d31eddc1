//! alias-proxy
//!
//! A path-alias reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 ALIAS PROXY                   │
//!    Client Request      │  ┌──────────┐    ┌─────────┐    ┌──────────┐  │
//!    ────────────────────┼─▶│  proxy   │───▶│ routing │───▶│ request  │──┼──▶ Backend
//!                        │  │middleware│    │ /<alias>│    │forwarder │  │
//!                        │  └────┬─────┘    └─────────┘    └────┬─────┘  │
//!                        │       │ no match                     │        │
//!                        │       ▼                              ▼        │
//!                        │  ┌──────────┐                  ┌──────────┐   │
//!    Client Response     │  │   next   │                  │ response │   │
//!    ◀───────────────────┼──│ handler  │◀─ ─ ─ ─ ─ ─ ─ ─ ─│ rewriter │◀──┼─── Backend
//!                        │  └──────────┘                  └──────────┘   │
//!                        │                                               │
//!                        │  config (snapshot + watcher) · lifecycle ·    │
//!                        │  observability (tracing, metrics)             │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use alias_proxy::config::watcher::ConfigWatcher;
use alias_proxy::lifecycle::{signals, startup, Shutdown};
use alias_proxy::observability::{logging, metrics};
use alias_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "alias-proxy")]
#[command(about = "Reverse proxy that routes /<alias> paths to configured backends", long_about = None)]
struct Cli {
    /// Config file (defaults to ./alias-proxy.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let startup = startup::load_startup_config(cli.config.as_deref(), cli.bind.as_deref())?;
    let config = startup.config;

    logging::init(&config.observability)?;

    tracing::info!("alias-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        source = ?startup.source,
        bind_address = %config.listener.bind_address,
        routes = config.hosts_urls.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the whole run; without one, the sender is
    // held here so the update loop simply idles.
    let (_watcher, _idle_tx, config_updates) = match (&startup.source, config.reload.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), None, updates)
        }
        _ => {
            let (tx, updates) = mpsc::unbounded_channel();
            (None, Some(tx), updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
