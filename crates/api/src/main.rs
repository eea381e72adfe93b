//! Air Quality Forecast API - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to read configuration")?;
    init_logging(&settings.log_level, settings.log_format)?;

    info!("=== CO Forecast API v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(settings).await
}
