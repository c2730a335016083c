//! User service (v1)
//!
//! A CRUD HTTP service for users built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────────┐
//!                  │                     USER SERVICE                       │
//!                  │                                                        │
//!   Client Request │  ┌──────────┐   ┌───────────────┐   ┌──────────────┐   │
//!   ───────────────┼─▶│  http    │──▶│ observability │──▶│   handler    │   │
//!                  │  │  server  │   │  middleware   │   │  (bind/map)  │   │
//!                  │  └──────────┘   └───────┬───────┘   └──────┬───────┘   │
//!                  │                         │                  ▼           │
//!                  │                 metrics / access log ┌──────────────┐   │
//!                  │                 exception sink       │   use case   │   │
//!                  │                                      └──────┬───────┘   │
//!                  │                                             ▼           │
//!                  │                                      ┌──────────────┐   │
//!                  │                                      │  repository  │   │
//!                  │                                      └──────────────┘   │
//!                  └────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use user_service::config::load_config;
use user_service::lifecycle::signals::wait_for_signal;
use user_service::observability::logging::init_logging;
use user_service::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "CRUD HTTP service for users", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "APP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability)?;

    tracing::info!("user-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        log_format = ?config.observability.log_format,
        exception_sink = config.observability.exception_sink,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    wait_for_signal().await?;
    shutdown.trigger();

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
