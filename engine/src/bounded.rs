//! Deadline helper for collaborator calls
//!
//! Every call that leaves the process goes through [`bounded`] so a slow
//! fleet, weather, cache or reasoning service can only cost a fixed budget.

use sdk::errors::EngineError;
use std::future::Future;
use std::time::Duration;

/// Await `fut` for at most `limit`, mapping an elapsed deadline to
/// `EngineError::Timeout` tagged with `operation`.
pub async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::timeout(operation, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let value = bounded(Duration::from_millis(50), "noop", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_timeout() {
        let err = bounded(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, EngineError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { millis: 10, .. }));
    }
}
