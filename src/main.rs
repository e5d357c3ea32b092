//! Script Gateway
//!
//! An authenticated, rate-limited HTTP service that runs scripts from a
//! configured directory and returns their structured output.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ log ─▶ rate limit ─▶ IP allow-list ─▶ API key
//!                                   │        │ 429          │ 403            │ 401
//!                                   │        ▼              ▼                ▼
//!                                   │     rejected       rejected         rejected
//!                                   │
//!                                   ▼
//!                           ┌──────────────────┐      ┌──────────────────────┐
//!                           │     handlers     │─────▶│   ScriptRegistry     │ list / describe
//!                           │ health root run  │      │  (help text, 5s cap) │
//!                           │  list describe   │      └──────────────────────┘
//!                           └────────┬─────────┘
//!                                    ▼
//!                           ┌──────────────────┐      ┌──────────────────────┐
//!                           │ ProcessDispatcher│─────▶│  child process       │
//!                           │ sanitize + argv  │◀─────│  --key=value flags   │
//!                           │ timeout + decode │      │  JSON on stdout      │
//!                           └──────────────────┘      └──────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use script_gateway::config::{load_config, GatewayConfig};
use script_gateway::observability::{logging, metrics};
use script_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "script-gateway")]
#[command(about = "Gated HTTP service for running scripts", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!("script-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if args.config.is_none() {
        tracing::warn!("No configuration file given; using defaults");
    }
    if config.auth.api_keys.is_empty() {
        tracing::warn!("No API keys configured; every request will be rejected with 401");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        allowed_ips = %config.access.allowed_ips.join(", "),
        execution_capacity = config.rate_limit.execution.capacity,
        execution_refill = config.rate_limit.execution.refill_per_second,
        scripts_dir = %config.scripts.directory,
        run_timeout_secs = config.scripts.run_timeout_secs,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
