#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Could not connect to database after {attempts} attempts: {last_error}")]
    StartupConnectivity { attempts: u32, last_error: String },

    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Database error: {0}")]
    StoreWrite(#[from] sqlx::Error),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IngestError::MalformedResponse(err.to_string())
        } else {
            IngestError::UpstreamFetch(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::MalformedResponse(err.to_string())
    }
}
