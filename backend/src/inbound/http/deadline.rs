//! Per-call deadlines for service invocations.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::Error;

/// Deadlines applied around service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Applied to every call without a dedicated budget.
    pub default: Duration,
    /// Visit verification.
    pub verify_visit: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(10),
            verify_visit: Duration::from_secs(8),
        }
    }
}

/// Await `call`, failing with `service_unavailable` once `limit` elapses.
///
/// The abandoned future is dropped; a transaction in flight rolls back.
pub async fn within<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, limit_ms = limit.as_millis(), "service call exceeded its deadline");
            Err(Error::service_unavailable(format!("{operation} timed out")))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    #[tokio::test]
    async fn slow_calls_become_service_unavailable() {
        let err = within(Duration::from_millis(50), "publish review", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, Error>(())
        })
        .await
        .expect_err("deadline exceeded");

        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert_eq!(err.message(), "publish review timed out");
    }

    #[rstest]
    #[tokio::test]
    async fn fast_calls_pass_through() {
        let value = within(Duration::from_secs(1), "noop", async { Ok::<_, Error>(7) })
            .await
            .expect("completes");
        assert_eq!(value, 7);
    }

    #[rstest]
    #[tokio::test]
    async fn failures_are_not_masked() {
        let err = within(Duration::from_secs(1), "noop", async {
            Err::<(), _>(Error::not_found("review"))
        })
        .await
        .expect_err("propagates");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
