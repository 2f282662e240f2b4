//! Retry-with-backoff for retryable provider errors (spec §4.5: "base 1s,
//! factor 2, jitter, cap 3 attempts").

use std::future::Future;
use std::time::Duration;

use basalt_types::ProviderError;
use rand::Rng;

const BASE_DELAY: Duration = Duration::from_secs(1);
const FACTOR: u32 = 2;
const MAX_ATTEMPTS: u32 = 3;

/// Run `op` up to [`MAX_ATTEMPTS`] times, retrying with jittered exponential
/// backoff whenever it fails with a [`ProviderError::is_retryable`] error.
/// The first error that is not retryable, or the last error after the
/// attempt cap is reached, is returned.
pub(crate) async fn with_backoff<F, Fut, T>(mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_retryable() => {
                let delay = backoff_delay(attempt);
                tracing::warn!(attempt, ?delay, error = %err, "retrying provider call");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `base * factor^(attempt - 1)`, with up to 25% jitter added on top.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY * FACTOR.pow(attempt - 1);
    let jitter_ms = rand::thread_rng().gen_range(0..=(exp.as_millis() as u64 / 4).max(1));
    exp + Duration::from_millis(jitter_ms)
}
