use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw entry of the `/api/v3/ticker/price` response
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String, // Trading pair, e.g. "BTCUSDT"
    pub price: String,  // Numeric string, e.g. "65000.12345678"
}

/// Price snapshot row stored in the `crypto_prices` table
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PriceRecord {
    pub symbol: String,
    pub price: Decimal,
    pub fetch_time: NaiveDateTime, // UTC, shared by every record of one snapshot
}

impl PriceRecord {
    pub fn new(symbol: impl Into<String>, price: Decimal, fetch_time: NaiveDateTime) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            fetch_time,
        }
    }
}
