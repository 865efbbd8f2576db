//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply PORT / AURA_* overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow running with no file at all
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets never live here; see `upstream::registry`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::{
    CorsConfig, ListenerConfig, LlmConfig, ObservabilityConfig, PlannerConfig, RetryConfig,
    SearchConfig, SecurityConfig, StoreBackend, StoreConfig, TimeoutConfig,
};
