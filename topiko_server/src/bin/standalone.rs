use std::sync::Arc;

use topiko::{DirectoryPipeline, PipelineConfig};
use topiko_server::{AppState, ServerConfig, StoreConfig, build_coordinator, location_from_env, start_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let pipeline = Arc::new(DirectoryPipeline::new(PipelineConfig::from_env()?)?);
    let coordinator = build_coordinator(pipeline, StoreConfig::from_env(), location_from_env())?;
    coordinator.reload_listings().await?;
    coordinator.refresh_location().await;

    let state = AppState {
        coordinator: Arc::new(coordinator),
    };
    let handle = start_server(state, ServerConfig::from_env()).await?;
    // Park forever
    handle.await.ok();
    Ok(())
}
