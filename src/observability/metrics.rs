//! Metrics collection and exposition.
//!
//! # Metrics
//! - `aura_http_requests_total` (counter): requests by route, status
//! - `aura_http_request_duration_seconds` (histogram): latency by route
//! - `aura_upstream_calls_total` (counter): upstream calls by service, outcome
//! - `aura_upstream_call_duration_seconds` (histogram): upstream latency by service
//! - `aura_upstream_retries_total` (counter): retries by service
//! - `aura_subtopics_total` (counter): enriched subtopics by outcome
//! - `aura_plans_saved_total` (counter): saved plans

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::upstream::types::Service;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "aura_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("aura_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(service: Service, success: bool, start: Instant) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(
        "aura_upstream_calls_total",
        "service" => service.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("aura_upstream_call_duration_seconds", "service" => service.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(service: Service) {
    metrics::counter!("aura_upstream_retries_total", "service" => service.as_str()).increment(1);
}

pub fn record_subtopic(outcome: &'static str) {
    metrics::counter!("aura_subtopics_total", "outcome" => outcome).increment(1);
}

pub fn record_plan_saved() {
    metrics::counter!("aura_plans_saved_total").increment(1);
}
