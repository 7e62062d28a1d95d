//! Bounded retry around a fallible async operation

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// All attempts within one cycle failed. Carries the last underlying error.
#[derive(Debug, thiserror::Error)]
#[error("all {tries} attempts failed, last error: {last}")]
pub struct RetryExhausted<E: fmt::Display + fmt::Debug> {
    pub tries: u32,
    pub last: E,
}

/// Invoke `op` up to `max_tries` times, sleeping `retry_wait` between
/// attempts. Returns on the first success. `max_tries` of 1 means no
/// retrying; a zero `retry_wait` retries immediately.
///
/// Generic over the wrapped operation; no fetch or decode knowledge here.
pub async fn with_retry<T, E, F, Fut>(
    mut op: F,
    max_tries: u32,
    retry_wait: Duration,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display + fmt::Debug,
{
    let tries = max_tries.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= tries => {
                return Err(RetryExhausted { tries, last: error });
            }
            Err(error) => {
                tracing::warn!(attempt, max_tries = tries, error = %error, "attempt failed, retrying");
            }
        }
        attempt += 1;
        sleep(retry_wait).await;
    }
}
