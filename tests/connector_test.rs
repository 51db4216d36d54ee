//! Integration tests for the PostgreSQL connector
//!
//! Require a reachable database: set TEST_DATABASE_URL and run with
//! `cargo test -- --ignored`.

use binance_price_ingestor::{
    parse_snapshot, price_table_schema, Connector, IngestError, PriceRecord, PriceStore,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

static TABLE_SEQ: AtomicU32 = AtomicU32::new(0);

async fn connector() -> Connector {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    Connector::from_pool(pool)
}

/// Unique table (and index) name per test so counts are not shared
fn scratch_table() -> (String, String) {
    let n = TABLE_SEQ.fetch_add(1, Ordering::SeqCst);
    let table = format!("crypto_prices_test_{}_{}", std::process::id(), n);
    let index = format!("idx_{}", table);
    (table, index)
}

async fn drop_table(connector: &Connector, table: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(connector.pool())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_wait_for_ready_succeeds_against_live_database() {
    let connector = connector().await;
    connector
        .wait_for_ready(3, Duration::from_millis(10))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_ensure_table_is_idempotent() {
    let connector = connector().await;
    let (table, index) = scratch_table();
    let schema = price_table_schema(&table, &index).unwrap();

    connector.ensure_table(&table, &schema).await.unwrap();
    connector.ensure_table(&table, &schema).await.unwrap();

    let columns: Vec<String> = sqlx::query_scalar(
        "SELECT column_name::text FROM information_schema.columns
         WHERE table_name = $1 ORDER BY ordinal_position",
    )
    .bind(&table)
    .fetch_all(connector.pool())
    .await
    .unwrap();
    assert_eq!(columns, vec!["id", "symbol", "price", "fetch_time"]);

    let indexes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pg_indexes WHERE tablename = $1 AND indexname = $2")
            .bind(&table)
            .bind(&index)
            .fetch_one(connector.pool())
            .await
            .unwrap();
    assert_eq!(indexes, 1);

    drop_table(&connector, &table).await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_insert_rows_increases_count_by_batch_size() {
    let connector = connector().await;
    let (table, index) = scratch_table();
    let schema = price_table_schema(&table, &index).unwrap();
    connector.ensure_table(&table, &schema).await.unwrap();

    let body = r#"[
        {"symbol":"BTCUSDT","price":"65000.12345678"},
        {"symbol":"ETHUSDT","price":"3100.50000000"},
        {"symbol":"BNBUSDT","price":"590.10000000"}
    ]"#;
    let records = parse_snapshot(body, Utc::now().naive_utc()).unwrap();

    let before = connector.count_rows(&table).await.unwrap();
    let inserted = connector.insert_rows(&records, &table).await.unwrap();
    let after = connector.count_rows(&table).await.unwrap();

    assert_eq!(inserted, 3);
    assert_eq!(after - before, 3);

    // Appending the same snapshot again is allowed
    connector.insert_rows(&records, &table).await.unwrap();
    assert_eq!(connector.count_rows(&table).await.unwrap(), before + 6);

    drop_table(&connector, &table).await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_stored_price_keeps_full_precision() {
    let connector = connector().await;
    let (table, index) = scratch_table();
    let schema = price_table_schema(&table, &index).unwrap();
    connector.ensure_table(&table, &schema).await.unwrap();

    let records = parse_snapshot(
        r#"[{"symbol":"BTCUSDT","price":"65000.12345678"}]"#,
        Utc::now().naive_utc(),
    )
    .unwrap();
    connector.insert_rows(&records, &table).await.unwrap();

    let stored: PriceRecord = sqlx::query_as(&format!(
        "SELECT symbol, price, fetch_time FROM {} ORDER BY id DESC LIMIT 1",
        table
    ))
    .fetch_one(connector.pool())
    .await
    .unwrap();

    assert_eq!(stored.symbol, "BTCUSDT");
    assert_eq!(stored.price, Decimal::from_str("65000.12345678").unwrap());

    drop_table(&connector, &table).await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_empty_batch_is_noop() {
    let connector = connector().await;
    let (table, index) = scratch_table();
    let schema = price_table_schema(&table, &index).unwrap();
    connector.ensure_table(&table, &schema).await.unwrap();

    let inserted = connector.insert_rows(&[], &table).await.unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(connector.count_rows(&table).await.unwrap(), 0);

    drop_table(&connector, &table).await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_failed_batch_inserts_nothing() {
    let connector = connector().await;
    let (table, index) = scratch_table();
    let schema = price_table_schema(&table, &index).unwrap();
    connector.ensure_table(&table, &schema).await.unwrap();

    let now = Utc::now().naive_utc();
    let records = vec![
        PriceRecord::new("BTCUSDT", Decimal::from_str("65000.1").unwrap(), now),
        // Exceeds NUMERIC(18,8): ten integer digits at most
        PriceRecord::new("OVERFLOW", Decimal::from_str("123456789012.5").unwrap(), now),
    ];

    let err = connector.insert_rows(&records, &table).await.unwrap_err();

    assert!(matches!(err, IngestError::StoreWrite(_)));
    assert_eq!(connector.count_rows(&table).await.unwrap(), 0);

    drop_table(&connector, &table).await;
}

#[tokio::test]
async fn test_wait_for_ready_gives_up_on_unreachable_database() {
    let options = sqlx::postgres::PgConnectOptions::new()
        .host("127.0.0.1")
        .port(9)
        .username("nobody")
        .database("nothing");
    let connector = Connector::new(options);

    let err = connector
        .wait_for_ready(2, Duration::from_millis(10))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::StartupConnectivity { attempts: 2, .. }));
}

#[tokio::test]
async fn test_invalid_table_name_rejected_before_query() {
    let options = sqlx::postgres::PgConnectOptions::new().host("127.0.0.1").port(9);
    let connector = Connector::new(options);

    let err = connector
        .insert_rows(&[], "prices; DROP TABLE users")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::InvalidTableName(_)));
}
