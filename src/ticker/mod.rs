// src/ticker/mod.rs
pub mod binance_client;

pub use binance_client::{parse_snapshot, BinanceTickerClient, TickerSource, TICKER_ENDPOINT};
