//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.
//! Secrets (API keys, project IDs) are deliberately absent: they are read from
//! the environment when the upstream clients are first needed.

use serde::{Deserialize, Serialize};

/// Root configuration for the Aura backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Plan generation settings.
    pub planner: PlannerConfig,

    /// Retry configuration for upstream calls.
    pub retries: RetryConfig,

    /// Language model settings.
    pub llm: LlmConfig,

    /// Web search settings.
    pub search: SearchConfig,

    /// Document store settings.
    pub store: StoreConfig,

    /// Cross-origin settings for the web and mobile frontends.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout for upstream calls in seconds.
    pub connect_secs: u64,

    /// Total time allowed for a single upstream call in seconds.
    pub upstream_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 60,
            request_secs: 300,
        }
    }
}

/// Plan generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Number of weekly subtopics requested from the model.
    pub weeks: usize,

    /// Size of the worker pool that enriches subtopics.
    pub max_concurrency: usize,

    /// Results requested per search.
    pub max_search_results: usize,

    /// Resources kept per week after curation.
    pub resources_per_week: usize,

    /// Deadline for one subtopic's whole pipeline in seconds.
    pub subtopic_timeout_secs: u64,

    /// Re-query once when the model judges the first results irrelevant.
    pub self_correction: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            weeks: 4,
            max_concurrency: 4,
            max_search_results: 5,
            resources_per_week: 2,
            subtopic_timeout_secs: 90,
            self_correction: true,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per upstream call (including the first).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Percentage of calls that can be retries (retry budget).
    /// e.g., 0.2 for 20% budget.
    pub budget_ratio: f32,

    /// Retries always allowed regardless of the ratio.
    pub budget_min_retries: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
            budget_ratio: 0.2,
            budget_min_retries: 10,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL.
    pub base_url: String,

    /// Model name.
    pub model: String,

    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: None,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API base URL.
    pub base_url: String,

    /// Search depth ("basic" or "advanced").
    pub search_depth: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            search_depth: "basic".to_string(),
        }
    }
}

/// Which document store backs saved plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Hosted Appwrite database.
    Appwrite,
    /// Process-local map, lost on restart.
    Memory,
}

/// Document store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Appwrite API endpoint.
    pub endpoint: String,

    /// Collection holding saved plans.
    pub collection_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Appwrite,
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            collection_id: "685da5d700336bdeab10".to_string(),
        }
    }
}

/// Cross-origin resource sharing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. A `*.` label matches any subdomain,
    /// e.g. "https://*.netlify.app".
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "https://aura-agentic-app.netlify.app".to_string(),
                "https://*.netlify.app".to_string(),
                "https://*.vercel.app".to_string(),
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Enable strict input validation.
    pub strict_validation: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 1024 * 1024, // 1MB
            strict_validation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hosted_services() {
        let config = AppConfig::default();
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.store.backend, StoreBackend::Appwrite);
        assert_eq!(config.planner.weeks, 4);
        assert_eq!(config.planner.resources_per_week, 2);
        assert!(config
            .cors
            .allowed_origins
            .iter()
            .any(|o| o == "https://*.vercel.app"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [planner]
            weeks = 6

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.planner.weeks, 6);
        assert_eq!(config.planner.max_search_results, 5);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
    }
}
