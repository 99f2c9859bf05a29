use std::future::Future;
use std::time::Duration;

use super::errors::OrderError;

/// Run `operation` under `deadline`. On expiry the future is dropped, which
/// drops (and so rolls back) any transaction it still holds.
pub async fn with_deadline<T>(
    deadline: Duration,
    operation: impl Future<Output = Result<T, OrderError>>,
) -> Result<T, OrderError> {
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(timeout = ?deadline, "Order operation exceeded deadline");
            Err(OrderError::DeadlineExceeded(deadline))
        }
    }
}
