//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call (LLM / search / store):
//!     → timeouts.rs (per-attempt deadline)
//!     → On transient failure: retries.rs (budget check, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient failures (transport, timeout, 429, 5xx) are retried
//! - A retry budget caps retries as a fraction of total calls

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::{RetryBudget, RetryPolicy};
pub use timeouts::with_deadline;
