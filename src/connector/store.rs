use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::connector::readiness::wait_until_ready;
use crate::connector::schema::{validate_table_name, TableSchema};
use crate::entity::{IngestError, PriceRecord};

// Postgres caps a statement at 65535 bind parameters, three per row
const MAX_ROWS_PER_STATEMENT: usize = 65535 / 3;

/// Destination of price snapshots
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Blocks until the store answers a liveness query, or fails after `max_attempts`
    async fn wait_for_ready(&self, max_attempts: u32, retry_delay: Duration)
        -> Result<(), IngestError>;

    /// Creates `name` and its indexes if absent, in one transaction
    async fn ensure_table(&self, name: &str, schema: &TableSchema) -> Result<(), IngestError>;

    /// Appends `rows` to `table` in one transaction, returning the number of rows written
    async fn insert_rows(&self, rows: &[PriceRecord], table: &str) -> Result<u64, IngestError>;
}

/// PostgreSQL-backed store owning the connection pool
pub struct Connector {
    pool: PgPool,
}

impl Connector {
    /// Creates a connector whose pool opens connections on first use
    pub fn new(options: PgConnectOptions) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Self { pool }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Trivial liveness query
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64, IngestError> {
        let table = validate_table_name(table)?;
        let row = sqlx::query(&format!("SELECT COUNT(*) as count FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }

    /// Releases every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[async_trait]
impl PriceStore for Connector {
    async fn wait_for_ready(
        &self,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), IngestError> {
        wait_until_ready(max_attempts, retry_delay, || self.ping()).await?;
        Ok(())
    }

    async fn ensure_table(&self, name: &str, schema: &TableSchema) -> Result<(), IngestError> {
        let name = validate_table_name(name)?;

        let mut tx = self.pool.begin().await?;
        for statement in schema.statements() {
            debug!("Executing schema statement: {}", statement);
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Table '{}' is ready.", name);
        Ok(())
    }

    async fn insert_rows(&self, rows: &[PriceRecord], table: &str) -> Result<u64, IngestError> {
        let table = validate_table_name(table)?;

        if rows.is_empty() {
            info!("Inserted 0 rows into '{}'", table);
            return Ok(0);
        }

        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (symbol, price, fetch_time) ",
                table
            ));
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.symbol.clone())
                    .push_bind(record.price)
                    .push_bind(record.fetch_time);
            });

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        info!("Inserted {} rows into '{}'", inserted, table);
        Ok(inserted)
    }
}
