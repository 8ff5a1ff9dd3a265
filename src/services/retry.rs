//! Bounded exponential-backoff retry for transient service failures.

use super::ServiceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;

/// Run `op` until it succeeds, fails permanently, or `max_attempts` attempts
/// have been made. Only [`ServiceError::is_transient`] errors are retried.
pub async fn retry_bounded<T, F, Fut>(
    max_attempts: usize,
    initial_interval: Duration,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_attempts = max_attempts.max(1);
    let attempts = AtomicUsize::new(0);
    let policy = ExponentialBackoff {
        initial_interval,
        current_interval: initial_interval,
        max_interval: Duration::from_secs(5),
        max_elapsed_time: None,
        ..Default::default()
    };

    retry(policy, || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let fut = op();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(attempt, max_attempts, "Transient failure, retrying: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}
