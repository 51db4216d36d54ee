// src/connector/mod.rs
pub mod readiness;
pub mod schema;
pub mod store;

pub use readiness::wait_until_ready;
pub use schema::{
    crypto_prices_schema, price_table_schema, validate_table_name, TableSchema,
    CRYPTO_PRICES_TABLE,
};
pub use store::{Connector, PriceStore};
