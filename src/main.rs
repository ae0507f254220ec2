//! edge-gateway binary entrypoint.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use edge_gateway::http::GatewayServer;
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "edge-gateway", about = "HTTP edge gateway with a two-phase filter pipeline")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("edge_gateway=debug,tower_http=debug");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        default_pool = %config.routing.default_pool,
        response_headers = config.response_headers.enabled,
        "configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    // Hot reload: file changes apply from the next request. The watcher
    // handle must stay alive for the lifetime of the process.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    let server = GatewayServer::new(config);
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
