use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{info, warn};
use tokio::time::sleep;

use crate::entity::IngestError;

/// Runs `probe` until it succeeds or `max_attempts` consecutive failures occur.
///
/// Every failed attempt is logged and followed by the same fixed `retry_delay`,
/// the last one included. Returns the number of the attempt that succeeded, or
/// `IngestError::StartupConnectivity` once the budget is spent.
pub async fn wait_until_ready<F, Fut, E>(
    max_attempts: u32,
    retry_delay: Duration,
    mut probe: F,
) -> Result<u32, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut last_error = String::from("no connection attempt was made");

    for attempt in 1..=max_attempts {
        match probe().await {
            Ok(()) => {
                info!("Database connection established.");
                return Ok(attempt);
            }
            Err(e) => {
                warn!(
                    "Waiting for database... ({}/{}): {}",
                    attempt, max_attempts, e
                );
                last_error = e.to_string();
                sleep(retry_delay).await;
            }
        }
    }

    Err(IngestError::StartupConnectivity {
        attempts: max_attempts,
        last_error,
    })
}
