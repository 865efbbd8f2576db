//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed upstream call is retried
//! - Execute retries with exponential backoff + jitter
//! - Enforce retry budget (retries as a fraction of calls)
//!
//! # Design Decisions
//! - Only `UpstreamError::is_transient` failures are retried
//! - Jittered backoff prevents thundering herd across subtopic workers
//! - Retry budget prevents retry storms when a provider is down

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::with_deadline;
use crate::upstream::types::{Service, UpstreamResult};

/// Shared allowance of retries across all upstream calls.
#[derive(Debug)]
pub struct RetryBudget {
    ratio: f32,
    min_retries: u64,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl RetryBudget {
    pub fn new(ratio: f32, min_retries: u64) -> Self {
        Self {
            ratio,
            min_retries,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    /// Count one logical call (not attempts).
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn allowance(&self) -> u64 {
        let by_ratio = (self.requests.load(Ordering::Relaxed) as f64 * self.ratio as f64) as u64;
        by_ratio.max(self.min_retries)
    }

    /// Whether a retry would currently be allowed.
    pub fn can_retry(&self) -> bool {
        self.retries.load(Ordering::Relaxed) < self.allowance()
    }

    /// Take one retry from the budget if any is left.
    pub fn try_acquire(&self) -> bool {
        let allowance = self.allowance();
        self.retries
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |used| {
                (used < allowance).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn retries_used(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

/// Retry policy applied to every upstream call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt_timeout: Duration,
    budget: Arc<RetryBudget>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, attempt_timeout: Duration) -> Self {
        let budget = Arc::new(RetryBudget::new(config.budget_ratio, config.budget_min_retries));
        Self {
            config,
            attempt_timeout,
            budget,
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    fn max_attempts(&self) -> u32 {
        if self.config.enabled {
            self.config.max_attempts.max(1)
        } else {
            1
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, service: Service, label: &str, mut op: F) -> UpstreamResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        self.budget.record_request();
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match with_deadline(service, self.attempt_timeout, op()).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= max_attempts || !err.is_transient() {
                return Err(err);
            }

            if !self.budget.try_acquire() {
                tracing::warn!(
                    service = %service,
                    op = label,
                    attempt,
                    error = %err,
                    "Retry budget exhausted, giving up"
                );
                return Err(err);
            }

            let delay = calculate_backoff(attempt, self.config.base_delay_ms, self.config.max_delay_ms);
            tracing::info!(
                service = %service,
                op = label,
                attempt,
                delay = ?delay,
                error = %err,
                "Retrying upstream call"
            );
            metrics::record_retry(service);
            tokio::time::sleep(delay).await;
        }
    }
}
