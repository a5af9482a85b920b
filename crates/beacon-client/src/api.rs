//! The remote reporting port.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use beacon_core::http::HttpError;
use beacon_core::{
    ExpectationInputs, ExpectationRecord, FailedExpectation, FulfilledExpectation,
    RescheduledExpectation, SystemInputs, SystemRecord,
};

/// Upper bound on any single remote call made by a live system or expectation.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Result type alias for remote calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors from the beacon service or the path to it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Http(#[from] HttpError),

    #[error("beacon returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// Operations the beacon service exposes to a reporting client.
///
/// Implementations must be cheap to share; live systems and expectations
/// hold the same `Arc<dyn BeaconApi>` as the client that created them.
#[async_trait]
pub trait BeaconApi: Send + Sync {
    async fn create_system(&self, inputs: &SystemInputs) -> ApiResult<SystemRecord>;

    async fn delete_system(&self, path: &str) -> ApiResult<()>;

    async fn create_expectation(&self, inputs: &ExpectationInputs)
    -> ApiResult<ExpectationRecord>;

    async fn delete_expectation(&self, path: &str) -> ApiResult<()>;

    async fn fulfil_expectation(&self, path: &str, body: &FulfilledExpectation) -> ApiResult<()>;

    async fn fail_expectation(&self, path: &str, body: &FailedExpectation) -> ApiResult<()>;

    async fn reschedule_expectation(
        &self,
        path: &str,
        body: &RescheduledExpectation,
    ) -> ApiResult<()>;
}

/// Run a remote call, giving up after `timeout`.
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = ApiResult<T>>,
) -> ApiResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ApiError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let err = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn bounded_passes_through() {
        let value = bounded(Duration::from_secs(1), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = bounded::<()>(Duration::from_secs(1), async {
            Err(ApiError::Status {
                status: 503,
                body: "down".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "beacon returned 503: down");
    }
}
