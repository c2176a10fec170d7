// THEORY:
// `topiko_server` puts the directory pipeline behind HTTP. It owns the outside
// world: the REST listing store, environment configuration and, behind the
// `web` feature, the axum router with its WebSocket feed of published maps.
//
// Startup order matters: configuration is validated first, the listing store is
// chosen (REST when configured, the sample catalogue otherwise), and a single
// `ViewCoordinator` is shared by every request handler through `AppState`.

use std::sync::Arc;

use topiko::core_modules::translations::Notice;
use topiko::error::LocationError;
use topiko::sources::{FixedLocation, ListingStore, LocationProvider, NoLocation, StaticListingStore};
use topiko::{Coords, DirectoryPipeline, ViewCoordinator};
use tracing::{info, warn};

pub mod api;
#[cfg(feature = "web")]
mod routes;
pub mod store;

pub use store::{RestListingStore, StoreConfig};

const DEFAULT_BIND: &str = "127.0.0.1:3001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("TOPIKO_BIND")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        Self { bind_addr }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
        }
    }
}

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ViewCoordinator>,
}

/// Picks the REST store when it is configured and the sample catalogue
/// otherwise, tagging the latter so users know the data is not live.
pub fn build_coordinator(
    pipeline: Arc<DirectoryPipeline>,
    store_config: Option<StoreConfig>,
    locator: Arc<dyn LocationProvider>,
) -> topiko::Result<ViewCoordinator> {
    let coordinator = match store_config {
        Some(config) => {
            let store: Arc<dyn ListingStore> = Arc::new(RestListingStore::new(config)?);
            ViewCoordinator::new(pipeline, store, locator)
        }
        None => {
            warn!("TOPIKO_SUPABASE_URL / TOPIKO_SUPABASE_KEY not set, serving sample data");
            ViewCoordinator::new(pipeline, Arc::new(StaticListingStore::sample()), locator)
                .with_notice(Notice::SampleDataUnconfigured)
        }
    };
    Ok(coordinator)
}

/// A server has no sensor of its own. `TOPIKO_HOME="lat,lon"` pins the
/// "near me" origin; without it the filter prompts instead.
pub fn location_from_env() -> Arc<dyn LocationProvider> {
    location_from_value(std::env::var("TOPIKO_HOME").ok().as_deref())
}

fn location_from_value(value: Option<&str>) -> Arc<dyn LocationProvider> {
    match value.map(str::parse::<Coords>) {
        Some(Ok(home)) => {
            info!(latitude = home.latitude, longitude = home.longitude, "Using fixed home location");
            Arc::new(FixedLocation(home))
        }
        Some(Err(e)) => {
            warn!("Ignoring TOPIKO_HOME: {e}");
            Arc::new(NoLocation(LocationError::Failed(e)))
        }
        None => Arc::new(NoLocation(LocationError::Unsupported)),
    }
}

#[cfg(feature = "web")]
pub async fn start_server(state: AppState, cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!("Directory server listening on http://{}", cfg.bind_addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server stopped: {e}");
        }
    });

    Ok(server)
}

#[cfg(not(feature = "web"))]
pub async fn start_server(_state: AppState, _cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Err(anyhow::anyhow!("web feature not enabled for topiko_server"))
}
