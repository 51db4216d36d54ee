mod ingest_error;
mod price_record;

pub use ingest_error::IngestError;
pub use price_record::{PriceRecord, TickerPrice};
