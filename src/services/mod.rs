pub mod ingestor_service;

pub use ingestor_service::{CycleOutcome, IngestorService, IngestorState};
