use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Startup Retry with Exponential Backoff
// ============================================================================
//
// Used while the service is coming up: the database may still be starting
// when the process launches. Request-path operations are never retried;
// a failed order transaction is reported to the caller as-is.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each failure
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let grown = Duration::from_millis(((delay.as_millis() as f64) * self.multiplier) as u64);
        grown.min(self.max_delay)
    }
}

/// Whether an error is worth another attempt.
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

impl IsTransient for sqlx::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::Protocol(_)
        )
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// attempts. The last error is returned unchanged.
pub async fn retry_on_transient<F, Fut, T, E>(
    config: &RetryConfig,
    what: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) if !error.is_transient() => {
                tracing::error!(what, error = %error, "Permanent failure, not retrying");
                return Err(error);
            }
            Err(error) if attempt >= config.max_attempts => {
                tracing::error!(what, attempt, error = %error, "Giving up after all attempts");
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(
                    what,
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying after delay"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
