//! Retrying operations that lose an optimistic concurrency race.

use std::future::Future;

use tracing::warn;
use tuition_core::FeeResult;

/// Runs `op` until it succeeds, fails with a non-conflict error, or has been
/// attempted `max_attempts` times. Each attempt must re-read its inputs.
///
/// A `max_attempts` of 0 is treated as 1.
///
/// # Errors
///
/// Returns the last error from `op`.
pub async fn retry_on_conflict<T, F, Fut>(max_attempts: u32, mut op: F) -> FeeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FeeResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_conflict() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "Concurrent modification, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tuition_core::FeeError;

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_on_conflict(3, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(FeeError::conflict("student_fee", "f1", "version 1", "version 2"))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: FeeResult<()> = retry_on_conflict(2, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FeeError::conflict("payment", "p1", "pending", "completed"))
        })
        .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: FeeResult<()> = retry_on_conflict(5, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FeeError::not_found("payment", "p1"))
        })
        .await;
        assert_eq!(result.unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
