//! hostgate: host-aware reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                     HOSTGATE                      │
//!                         │                                                   │
//!     Client Request      │  ┌──────────┐   ┌─────────────┐   ┌────────────┐  │
//!     ────────────────────┼─▶│   http   │──▶│     net     │──▶│  routing   │  │
//!                         │  │  server  │   │ client_addr │   │  decision  │  │
//!                         │  └──────────┘   └─────────────┘   └─────┬──────┘  │
//!                         │        ▲                                │         │
//!                         │        │ 403 / 404 / 502                ▼         │
//!                         │        │                         ┌────────────┐   │
//!     Client Response     │  ┌─────┴────┐                    │    http    │   │
//!     ◀───────────────────┼──│ response │◀───────────────────│  forward   │◀──┼──── Upstream
//!                         │  └──────────┘                    │ + websocket│   │
//!                         │                                  └────────────┘   │
//!                         │  ┌─────────────────────────────────────────────┐  │
//!                         │  │config · security · observability · lifecycle│  │
//!                         │  └─────────────────────────────────────────────┘  │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use hostgate::config::loader;
use hostgate::http::HttpServer;
use hostgate::lifecycle::{signals, startup, Shutdown};
use hostgate::net::tls::load_tls_config;
use hostgate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "hostgate")]
#[command(about = "Host-aware reverse proxy with per-host IP allow-lists", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults to $HOSTGATE_CONFIG when set.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hostgate starting");

    let config = loader::load(cli.config.as_deref())?;
    let server = HttpServer::new(&config)?;
    startup::log_configuration(&config, server.routes());

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone());

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let tls = load_tls_config(tls).await?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
