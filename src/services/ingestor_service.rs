use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info};
use tokio::time::sleep;

use crate::config::{IntervalConfig, ReadinessConfig};
use crate::connector::{crypto_prices_schema, PriceStore, TableSchema, CRYPTO_PRICES_TABLE};
use crate::entity::IngestError;
use crate::ticker::TickerSource;

/// Lifecycle of the ingestor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    Starting,
    WaitingDb,
    EnsuringSchema,
    Fetching,
    Inserting,
    SleepingOk,
    SleepingError,
}

impl std::fmt::Display for IngestorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestorState::Starting => write!(f, "STARTING"),
            IngestorState::WaitingDb => write!(f, "WAITING_DB"),
            IngestorState::EnsuringSchema => write!(f, "ENSURING_SCHEMA"),
            IngestorState::Fetching => write!(f, "FETCHING"),
            IngestorState::Inserting => write!(f, "INSERTING"),
            IngestorState::SleepingOk => write!(f, "SLEEPING_OK"),
            IngestorState::SleepingError => write!(f, "SLEEPING_ERROR"),
        }
    }
}

/// Result of one fetch+store cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Ingested(usize),
    Failed(IngestError),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Ingested(_))
    }

    /// Sleep before the next cycle: long after success, short after failure
    pub fn next_delay(&self, intervals: &IntervalConfig) -> Duration {
        match self {
            CycleOutcome::Ingested(_) => intervals.success_delay,
            CycleOutcome::Failed(_) => intervals.error_delay,
        }
    }
}

/// Drives the periodic fetch/store cycle against one source and one table
pub struct IngestorService {
    source: Arc<dyn TickerSource>,
    store: Arc<dyn PriceStore>,
    table: String,
    schema: TableSchema,
    readiness: ReadinessConfig,
    intervals: IntervalConfig,
    state: IngestorState,
}

impl IngestorService {
    pub fn new(
        source: Arc<dyn TickerSource>,
        store: Arc<dyn PriceStore>,
        readiness: ReadinessConfig,
        intervals: IntervalConfig,
    ) -> Self {
        Self {
            source,
            store,
            table: CRYPTO_PRICES_TABLE.to_string(),
            schema: crypto_prices_schema(),
            readiness,
            intervals,
            state: IngestorState::Starting,
        }
    }

    /// Targets a different destination table
    pub fn with_table(mut self, table: impl Into<String>, schema: TableSchema) -> Self {
        self.table = table.into();
        self.schema = schema;
        self
    }

    pub fn state(&self) -> IngestorState {
        self.state
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn transition(&mut self, next: IngestorState) {
        debug!("Ingestor state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Waits for the database and provisions the destination table.
    ///
    /// Any error here is fatal for the process.
    pub async fn start(&mut self) -> Result<(), IngestError> {
        self.transition(IngestorState::WaitingDb);
        self.store
            .wait_for_ready(self.readiness.max_attempts, self.readiness.retry_delay)
            .await?;

        self.transition(IngestorState::EnsuringSchema);
        self.store.ensure_table(&self.table, &self.schema).await?;

        Ok(())
    }

    /// Runs one fetch+insert cycle and moves into the matching sleeping state
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = match self.fetch_and_store().await {
            Ok(count) => CycleOutcome::Ingested(count),
            Err(e) => CycleOutcome::Failed(e),
        };

        match &outcome {
            CycleOutcome::Ingested(count) => {
                self.transition(IngestorState::SleepingOk);
                info!("[{}] Successfully ingested {} records", Utc::now(), count);
            }
            CycleOutcome::Failed(e) => {
                self.transition(IngestorState::SleepingError);
                error!("Error: {}", e);
            }
        }

        outcome
    }

    async fn fetch_and_store(&mut self) -> Result<usize, IngestError> {
        self.transition(IngestorState::Fetching);
        let records = self.source.fetch_snapshot().await?;

        self.transition(IngestorState::Inserting);
        self.store.insert_rows(&records, &self.table).await?;

        Ok(records.len())
    }

    /// Runs cycles until the process is terminated
    pub async fn run(&mut self) {
        loop {
            let outcome = self.run_cycle().await;
            let delay = outcome.next_delay(&self.intervals);
            debug!("Next cycle in {:?}", delay);
            sleep(delay).await;
        }
    }
}
