//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Turn an elapsed deadline into a typed, retryable error

use std::future::Future;
use std::time::Duration;

use crate::upstream::types::{Service, UpstreamError, UpstreamResult};

/// Run `fut`, failing with `UpstreamError::Timeout` once `limit` elapses.
pub async fn with_deadline<T, F>(service: Service, limit: Duration, fut: F) -> UpstreamResult<T>
where
    F: Future<Output = UpstreamResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout {
            service,
            secs: limit.as_secs(),
        }),
    }
}
