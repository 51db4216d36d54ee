use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;

use crate::entity::{IngestError, PriceRecord, TickerPrice};

pub const TICKER_ENDPOINT: &str = "/api/v3/ticker/price";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_SYMBOL_LEN: usize = 20;

/// Source of ticker snapshots
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Fetches one snapshot; every record shares the same `fetch_time`
    async fn fetch_snapshot(&self) -> Result<Vec<PriceRecord>, IngestError>;
}

/// Client for the public Binance spot ticker endpoint
pub struct BinanceTickerClient {
    http_client: Client,
    url: String,
}

impl BinanceTickerClient {
    pub fn new(api_base: &str) -> Result<Self, IngestError> {
        let http_client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| IngestError::UpstreamFetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!("{}{}", api_base.trim_end_matches('/'), TICKER_ENDPOINT),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TickerSource for BinanceTickerClient {
    async fn fetch_snapshot(&self) -> Result<Vec<PriceRecord>, IngestError> {
        debug!("Fetching ticker snapshot from {}", self.url);

        let response = self.http_client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::UpstreamFetch(format!(
                "Binance API returned {} for {}",
                status, self.url
            )));
        }

        let body = response.text().await?;
        parse_snapshot(&body, Utc::now().naive_utc())
    }
}

/// Parses a `/api/v3/ticker/price` body, stamping every record with `fetch_time`
pub fn parse_snapshot(body: &str, fetch_time: NaiveDateTime) -> Result<Vec<PriceRecord>, IngestError> {
    let tickers: Vec<TickerPrice> = serde_json::from_str(body)?;

    tickers
        .into_iter()
        .map(|ticker| to_record(ticker, fetch_time))
        .collect()
}

fn to_record(ticker: TickerPrice, fetch_time: NaiveDateTime) -> Result<PriceRecord, IngestError> {
    if ticker.symbol.is_empty() || ticker.symbol.chars().count() > MAX_SYMBOL_LEN {
        return Err(IngestError::MalformedResponse(format!(
            "invalid symbol {:?}",
            ticker.symbol
        )));
    }

    let price = Decimal::from_str(ticker.price.trim()).map_err(|e| {
        IngestError::MalformedResponse(format!(
            "invalid price {:?} for {}: {}",
            ticker.price, ticker.symbol, e
        ))
    })?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(IngestError::MalformedResponse(format!(
            "negative price {} for {}",
            price, ticker.symbol
        )));
    }

    Ok(PriceRecord::new(ticker.symbol, price, fetch_time))
}
