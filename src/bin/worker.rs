#![allow(clippy::missing_errors_doc)]

use lambda_runtime::Error;
use tldr_pages::core::config::AppConfig;
use tldr_pages::worker::build_pool;
use tracing::{error, info};

pub use tldr_pages::worker::handler;

/// Local mode: poll the queue directly and drain it, instead of being
/// driven by SQS events.
async fn run_local(config: &AppConfig) -> Result<(), Error> {
    let pool = build_pool(config).await.map_err(|e| {
        error!("Failed to initialize worker: {}", e);
        Error::from(e)
    })?;

    let shutdown = pool.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let cycles = pool.run_until_empty().await?;
    let processed: usize = cycles.iter().map(|c| c.tasks.len()).sum();
    info!(cycles = cycles.len(), processed, "Queue drained");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tldr_pages::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    if config.is_local() {
        return run_local(&config).await;
    }

    lambda_runtime::run(lambda_runtime::service_fn(handler)).await?;
    Ok(())
}
