//! StockSync Relay
//!
//! A small sync server implementing the direct-by-name backend, for LAN
//! deployments and local development:
//!   GET  /get?endpoint=<name>   returns the stored collection
//!   POST /sync?endpoint=<name>  merges the pushed collection and returns it
//!   GET  /health
//!
//! Usage:
//!   stocksync-relay --port 4010
//!
//! Collections live in memory only; restarting the relay empties it and the
//! next push from each device repopulates it.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stocksync_relay::{build_router, RelayState};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stocksync-relay")]
#[command(about = "StockSync direct-backend sync relay")]
struct Args {
    /// Port to listen on (HTTP)
    #[arg(short, long, default_value = "4010")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("StockSync Relay starting...");

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let app = build_router(Arc::new(RelayState::new()));

    println!("\n========================================");
    println!("  StockSync Relay Running");
    println!("========================================");
    println!("  Listening: http://{}", addr);
    println!("\n  Client config:");
    println!("  {{\"backend\":{{\"kind\":\"direct\",\"base_url\":\"http://YOUR_HOST:{}\"}}}}", args.port);
    println!("========================================\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("StockSync Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
