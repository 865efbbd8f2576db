use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use aura_backend::config::load_config;
use aura_backend::http::HttpServer;
use aura_backend::lifecycle::{self, Shutdown};
use aura_backend::observability::logging;

#[derive(Parser)]
#[command(name = "aura-backend")]
#[command(about = "Learning-plan generation backend", version)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "AURA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "aura-backend starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        weeks = config.planner.weeks,
        max_concurrency = config.planner.max_concurrency,
        store = ?config.store.backend,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    lifecycle::start_metrics(&config);
    let listener = lifecycle::bind_listener(&config).await?;

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    lifecycle::spawn_signal_handler(shutdown.clone());

    HttpServer::new(config).run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
