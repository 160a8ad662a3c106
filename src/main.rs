//! MCP gateway
//!
//! A minimal HTTP/1.1 front-end that exposes a liveness probe and bridges
//! `/mcp` requests into a JSON-RPC control-protocol dispatcher.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                   MCP GATEWAY                    │
//!    Client Request        │  ┌─────────┐   ┌──────────────┐   ┌───────────┐  │
//!    ──────────────────────┼─▶│   net   │──▶│ request line │──▶│  routing  │  │
//!                          │  │listener │   │    parser    │   │   table   │  │
//!                          │  └─────────┘   └──────────────┘   └─────┬─────┘  │
//!                          │               /healthz, 404 ◀───────────┤        │
//!                          │                                         ▼ /mcp   │
//!    Client Response       │  ┌─────────┐   ┌──────────────┐   ┌───────────┐  │
//!    ◀─────────────────────┼──│response │◀──│  transport   │◀─▶│    mcp    │  │
//!                          │  │ + close │   │    bridge    │   │ dispatcher│  │
//!                          │  └─────────┘   └──────────────┘   └─────┬─────┘  │
//!                          │                                         ▼        │
//!                          │                                  tools / events  │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use mcp_gateway::config::{self, GatewayConfig};
use mcp_gateway::lifecycle::Gateway;
use mcp_gateway::mcp::{Event, InMemoryEvents};
use mcp_gateway::observability;

#[derive(Parser)]
#[command(name = "mcp-gateway")]
#[command(about = "HTTP front-end for the MCP control protocol", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (all interfaces unless --bind is given).
    #[arg(short, long)]
    port: Option<u16>,

    /// Full bind address, e.g. 127.0.0.1:8080.
    #[arg(long, conflicts_with = "port")]
    bind: Option<String>,

    /// Log level override.
    #[arg(long)]
    log_level: Option<String>,

    /// JSON file with calendar events served by `get_events_today`.
    #[arg(long)]
    events: Option<PathBuf>,
}

fn load_events(path: Option<&PathBuf>) -> Result<Vec<Event>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(Vec::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.bind_address = format!("{}:{}", config.listener.bind_host(), port);
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;

    observability::logging::init(&config.observability)?;
    tracing::info!("mcp-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        receive_buffer_bytes = config.listener.receive_buffer_bytes,
        pending_policy = ?config.bridge.pending_policy,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let events = load_events(cli.events.as_ref())?;
    tracing::info!(count = events.len(), "Calendar events loaded");

    let gateway = Gateway::new(config, Arc::new(InMemoryEvents::new(events)));
    if let Err(e) = gateway.run_until_signal().await {
        tracing::error!(error = %e, "Failed to start HTTP server");
        return Err(e.into());
    }
    Ok(())
}
