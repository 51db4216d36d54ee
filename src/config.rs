use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::entity::IngestError;

pub const DEFAULT_POSTGRES_HOST: &str = "postgres";
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_BINANCE_API_BASE: &str = "https://api.binance.com";

/// PostgreSQL connection settings
#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// `user@host:port/database`, safe to log
    pub fn summary(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Startup readiness wait settings
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Sleep durations between cycles
#[derive(Debug, Clone)]
pub struct IntervalConfig {
    pub success_delay: Duration,
    pub error_delay: Duration,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_secs(60),
            error_delay: Duration::from_secs(10),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub binance_api_base: String,
    pub readiness: ReadinessConfig,
    pub intervals: IntervalConfig,
}

impl Config {
    /// Loads configuration from process environment variables
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let readiness_defaults = ReadinessConfig::default();
        let interval_defaults = IntervalConfig::default();

        let database = DatabaseConfig {
            user: required(&lookup, "POSTGRES_USER")?,
            password: required(&lookup, "POSTGRES_PASSWORD")?,
            database: required(&lookup, "POSTGRES_DB")?,
            host: optional(&lookup, "POSTGRES_HOST")
                .unwrap_or_else(|| DEFAULT_POSTGRES_HOST.to_string()),
            port: parse_or(&lookup, "POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
        };

        Ok(Self {
            database,
            binance_api_base: optional(&lookup, "BINANCE_API_BASE")
                .unwrap_or_else(|| DEFAULT_BINANCE_API_BASE.to_string()),
            readiness: ReadinessConfig {
                max_attempts: parse_or(
                    &lookup,
                    "DB_WAIT_MAX_ATTEMPTS",
                    readiness_defaults.max_attempts,
                )?,
                retry_delay: seconds_or(
                    &lookup,
                    "DB_WAIT_DELAY_SECS",
                    readiness_defaults.retry_delay,
                )?,
            },
            intervals: IntervalConfig {
                success_delay: seconds_or(
                    &lookup,
                    "INGEST_INTERVAL_SECS",
                    interval_defaults.success_delay,
                )?,
                error_delay: seconds_or(
                    &lookup,
                    "INGEST_RETRY_DELAY_SECS",
                    interval_defaults.error_delay,
                )?,
            },
        })
    }
}

// Empty values are treated as unset
fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, IngestError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .ok_or_else(|| IngestError::Config(format!("{} must be set in environment variables", key)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IngestError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(lookup, key) {
        Some(value) => value
            .parse()
            .map_err(|e| IngestError::Config(format!("invalid {} {:?}: {}", key, value, e))),
        None => Ok(default),
    }
}

fn seconds_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, IngestError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}
