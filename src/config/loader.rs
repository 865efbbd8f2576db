//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
///
/// Without a file the defaults are used, which is what a container
/// deployment relies on.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply deployment overrides.
///
/// `AURA_BIND_ADDRESS` wins over `PORT`; `PORT` binds on all interfaces as
/// container platforms expect.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
        let port: u16 = port.trim().parse().map_err(|e| ConfigError::Env {
            var: "PORT",
            message: format!("{}", e),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(addr) = lookup("AURA_BIND_ADDRESS").filter(|a| !a.trim().is_empty()) {
        config.listener.bind_address = addr.trim().to_string();
    }

    if let Some(level) = lookup("AURA_LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
        config.observability.log_level = level.trim().to_string();
    }

    Ok(())
}
