use std::future::Future;
use std::time::Duration;

/// Exponential backoff schedule for image downloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Sleeps between consecutive attempts: `base * 2^n`, capped at `max_delay`.
    ///
    /// There is one delay fewer than there are attempts.
    pub fn delays(&self) -> Vec<Duration> {
        (0..self.max_attempts.saturating_sub(1))
            .map(|n| {
                self.base_delay
                    .saturating_mul(2u32.saturating_pow(n))
                    .min(self.max_delay)
            })
            .collect()
    }
}

/// Retry `op` using the provided sleep schedule.
///
/// - The operation is attempted once immediately.
/// - After a failure accepted by `should_retry`, we sleep for the next delay and retry.
/// - Any other failure is returned as-is.
/// - When delays are exhausted, the final attempt's result is returned.
///
/// `op` receives the 1-based attempt number. Sleeping is injected so tests run
/// without a timer.
pub async fn retry_with_delays<T, E, Op, Fut, S, SFut>(
    mut op: Op,
    delays: &[Duration],
    should_retry: impl Fn(&E) -> bool,
    mut sleep: S,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let mut attempt = 1u32;
    for delay in delays {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) => sleep(*delay).await,
            Err(err) => return Err(err),
        }
        attempt += 1;
    }
    op(attempt).await
}
