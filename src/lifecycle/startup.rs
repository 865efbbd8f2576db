//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener last, so traffic arrives only when ready
//!
//! # Design Decisions
//! - Fail fast: a bad bind address is fatal
//! - A bad metrics address is logged and skipped; the API still serves

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::observability::metrics;

/// Install the Prometheus exporter if configured.
pub fn start_metrics(config: &AppConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(e) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            error = %e,
            "Failed to parse metrics address"
        ),
    }
}

/// Bind the API listener.
pub async fn bind_listener(config: &AppConfig) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        let listener = bind_listener(&config).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_garbage() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        assert!(bind_listener(&config).await.is_err());
    }
}
