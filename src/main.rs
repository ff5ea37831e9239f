//! llm-router entry point: load configuration, build the runtime, serve HTTP.

use llm_router::{init_logging, RouterConfig, RouterError, RouterRuntime};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), RouterError> {
    init_logging();

    tracing::info!("llm-router v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("ROUTER_CONFIG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = RouterConfig::load(&config_path)?;
    tracing::info!(path = %config_path.display(), "configuration loaded");

    let runtime = RouterRuntime::new(config)?;
    runtime.start().await
}
