//! Bounded polling with backoff.

use std::future::Future;

use tokio::time::sleep;

use crate::resilience::backoff::calculate_backoff;

/// Call `op` until it yields `Some`, at most `attempts` times.
///
/// Errors stop the loop immediately; `Ok(None)` means nothing appeared within
/// the budget.
pub async fn poll_until_some<T, E, F, Fut>(
    attempts: u32,
    base_ms: u64,
    max_ms: u64,
    mut op: F,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 0..attempts {
        if attempt > 0 {
            sleep(calculate_backoff(attempt, base_ms, max_ms)).await;
        }
        if let Some(value) = op().await? {
            return Ok(Some(value));
        }
        tracing::debug!(attempt = attempt + 1, attempts, "Nothing yet, backing off");
    }
    Ok(None)
}
