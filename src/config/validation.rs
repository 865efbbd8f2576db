//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool sizes > 0)
//! - Check that upstream URLs and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `planner.weeks`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    for (field, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("planner.subtopic_timeout_secs", config.planner.subtopic_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let planner = &config.planner;
    if planner.weeks == 0 {
        errors.push(ValidationError::new("planner.weeks", "must be greater than zero"));
    }
    if planner.max_concurrency == 0 {
        errors.push(ValidationError::new("planner.max_concurrency", "must be greater than zero"));
    }
    if planner.max_search_results == 0 {
        errors.push(ValidationError::new("planner.max_search_results", "must be greater than zero"));
    }
    if planner.resources_per_week == 0 {
        errors.push(ValidationError::new("planner.resources_per_week", "must be greater than zero"));
    } else if planner.resources_per_week > planner.max_search_results {
        errors.push(ValidationError::new(
            "planner.resources_per_week",
            "cannot exceed planner.max_search_results",
        ));
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "cannot exceed retries.max_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&config.retries.budget_ratio) {
        errors.push(ValidationError::new("retries.budget_ratio", "must be within 0.0..=1.0"));
    }

    for (field, value) in [
        ("llm.base_url", &config.llm.base_url),
        ("search.base_url", &config.search.base_url),
        ("store.endpoint", &config.store.endpoint),
    ] {
        if let Err(e) = url::Url::parse(value) {
            errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
        }
    }

    if config.llm.model.trim().is_empty() {
        errors.push(ValidationError::new("llm.model", "must not be empty"));
    }
    if !matches!(config.search.search_depth.as_str(), "basic" | "advanced") {
        errors.push(ValidationError::new(
            "search.search_depth",
            "must be \"basic\" or \"advanced\"",
        ));
    }
    if config.store.collection_id.trim().is_empty() {
        errors.push(ValidationError::new("store.collection_id", "must not be empty"));
    }

    for origin in &config.cors.allowed_origins {
        if url::Url::parse(&origin.replacen("*.", "", 1)).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not an origin", origin),
            ));
        }
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"json\"",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
