//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for log aggregation)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP span into every pipeline log line
//! - Metric calls are no-ops until a recorder is installed, so tests need no setup

pub mod logging;
pub mod metrics;
