//! Binding bridge server.
//!
//! Hosts platform-style bindings (object storage, key-value, queue, and
//! upstream services) and lets code outside the platform call them over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                    BINDING BRIDGE                     │
//!                    │                                                       │
//!  Client proxy      │  ┌──────────┐    ┌──────────┐    ┌─────────────────┐  │
//!  (R2Bucket, ...) ──┼─▶│  http    │───▶│ routing  │───▶│    handlers     │  │
//!  POST + headers    │  │  server  │    │ selectors│    │ r2 kv d1 queue  │  │
//!                    │  └──────────┘    │ + table  │    │ service         │  │
//!                    │                  └──────────┘    └───────┬─────────┘  │
//!                    │                                          ▼            │
//!                    │                                  ┌───────────────┐    │
//!  Typed result  ◀───┼──── JSON / empty / header + body ◀─│   bindings    │    │
//!                    │                                  └───────────────┘    │
//!                    │   config · codec · observability · lifecycle          │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use binding_bridge::config::{load_config, BridgeConfig};
use binding_bridge::http::HttpServer;
use binding_bridge::lifecycle::startup::build_binding_table;
use binding_bridge::lifecycle::Shutdown;
use binding_bridge::observability::{logging, metrics};
use binding_bridge::routing::Router;

#[derive(Parser)]
#[command(name = "binding-bridge")]
#[command(about = "Expose bindings to code running outside the platform", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);

    tracing::info!("binding-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        bindings = config.bindings.len(),
        max_header_bytes = config.codec.max_header_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let table = build_binding_table(&config.bindings)?;
    for (name, module) in table.entries() {
        tracing::info!(binding = %name, module = %module, "Binding available");
    }
    let router = Router::with_max_header_bytes(table.into(), config.codec.max_header_bytes);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signals();

    HttpServer::new(router).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
