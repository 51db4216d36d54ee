//! Binance price ingestor - Main executable
//!
//! Polls the public Binance ticker endpoint once a minute and appends every
//! snapshot to the `crypto_prices` table in PostgreSQL.
use anyhow::Context;
use binance_price_ingestor::{BinanceTickerClient, Config, Connector, IngestorService};
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging to stdout with default level of "info"
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();
    info!(
        "Starting Binance price ingestor v{}",
        binance_price_ingestor::VERSION
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Using database {}", config.database.summary());

    // Pool connects lazily, the readiness wait makes the first connection
    let connector = Arc::new(Connector::new(config.database.connect_options()));

    let ticker = BinanceTickerClient::new(&config.binance_api_base)
        .context("Failed to create Binance ticker client")?;
    info!("Polling {}", ticker.url());

    let mut ingestor = IngestorService::new(
        Arc::new(ticker),
        connector.clone(),
        config.readiness.clone(),
        config.intervals.clone(),
    );

    if let Err(e) = ingestor.start().await {
        error!("Startup failed: {}", e);
        connector.close().await;
        return Err(anyhow::Error::from(e));
    }

    info!("Ingestor is running! Press Ctrl+C to stop.");
    tokio::select! {
        _ = ingestor.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    connector.close().await;
    Ok(())
}
