use std::future::Future;
use std::time::Duration;

use docsync_core::SyncError;

/// Runs `op` up to `attempts` times with exponential backoff
/// (`base_delay * 2^(attempt - 1)`) between tries. A `success: false` result
/// folded into `Err` by the caller is retried identically to a raised
/// error — this helper only sees `Result`.
pub async fn retry_with_backoff<F, Fut, T>(attempts: u32, base_delay: Duration, mut op: F) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(attempt, attempts, error = %err, "sync transport call failed");
                last_err = Some(err);
                if attempt < attempts {
                    let delay = base_delay * 2u32.pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt runs"))
}
