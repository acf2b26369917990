//! Stockcast server - on-demand next-day price forecasts
//!
//! Serves a single JSON endpoint that fetches daily closes for a symbol,
//! trains a fresh sequence model, and answers with a prediction and a
//! BUY/SELL/HOLD decision. Each request is self-contained; no model state
//! survives between requests.
//!
//! # Usage
//! ```sh
//! HTTP_PORT=5000 cargo run
//! ```

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use stockcast::config::Config;
use stockcast::infrastructure::YahooMarketData;
use stockcast::interfaces::routes::{self, AppState};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Stockcast {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: port={}, provider={}",
        config.http_port, config.yahoo_base_url
    );

    let market_data = Arc::new(YahooMarketData::new(&config.yahoo_base_url));
    let router = routes::router(AppState { market_data }, &config.asset_dir);

    let addr = SocketAddr::new(config.bind_addr, config.http_port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Couldn't bind to {addr}"))?;
    info!("Listening on {addr}. Press Ctrl+C to shutdown.");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received. Exiting...");
        })
        .await
        .context("Http server failed")?;

    Ok(())
}
