use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use topiko::core_modules::catalog_filter::ListingFilter;
use topiko::core_modules::translations::{category, labels};
use topiko::core_modules::utils::map_raster::map_raster;
use topiko::error::LocationError;
use topiko::sources::{FixedLocation, LocationProvider, NoLocation, StaticListingStore};
use topiko::{Coords, DirectoryPipeline, DirectoryView, Language, PipelineConfig, ViewCoordinator, ViewMode, ViewRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Canvas side limits, in pixels.
const MIN_SIDE: i64 = 16;
const MAX_SIDE: i64 = 4096;

/// Runs the directory pipeline over a listings file and renders the map view.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON array of listing rows, as returned by the listing API
    input: PathBuf,
    /// Where to write the map snapshot (PNG)
    output: PathBuf,
    /// Only keep listings near this position
    #[arg(long, value_name = "LAT,LON")]
    near: Option<Coords>,
    /// Ask for "near me" without a position, to see the location prompt
    #[arg(long, conflicts_with = "near")]
    near_me: bool,
    /// Category id to include; repeat for several
    #[arg(long = "category", value_name = "ID")]
    categories: Vec<String>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value = "en")]
    lang: Language,
    #[arg(long, default_value_t = 1200, value_parser = clap::value_parser!(u32).range(MIN_SIDE..=MAX_SIDE))]
    width: u32,
    #[arg(long, default_value_t = 900, value_parser = clap::value_parser!(u32).range(MIN_SIDE..=MAX_SIDE))]
    height: u32,
    /// Serve the loaded listings over HTTP after rendering
    #[cfg(feature = "web")]
    #[arg(long)]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // --- 1. Argument Parsing & Setup ---
    let cli = Cli::parse();
    let raw = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let store = StaticListingStore::from_json(&raw).with_context(|| format!("parsing {}", cli.input.display()))?;

    // --- 2. Pipeline & Coordinator ---
    let pipeline = Arc::new(DirectoryPipeline::new(PipelineConfig::from_env()?)?);
    let locator: Arc<dyn LocationProvider> = match cli.near {
        Some(position) => Arc::new(FixedLocation(position)),
        None => Arc::new(NoLocation(LocationError::Unsupported)),
    };
    let coordinator = ViewCoordinator::new(Arc::clone(&pipeline), Arc::new(store), locator);
    coordinator.reload_listings().await?;
    coordinator.refresh_location().await;

    let filter = ListingFilter {
        categories: cli.categories.clone(),
        search_term: cli.search.clone().unwrap_or_default(),
        near_me: cli.near.is_some() || cli.near_me,
    };

    // --- 3. List View ---
    let list = coordinator
        .compute(ViewRequest {
            filter: filter.clone(),
            page: cli.page,
            mode: ViewMode::List,
            ..ViewRequest::default()
        })
        .await?;
    print_list(&list, cli.lang);

    // --- 4. Map View ---
    let published = coordinator
        .refresh(ViewRequest {
            filter,
            mode: ViewMode::Map,
            ..ViewRequest::default()
        })
        .await?
        .context("map refresh was superseded")?;
    info!(generation = published.generation, markers = published.view.map_points.len(), "Map view ready");

    // --- 5. Render & Save ---
    let canvas = map_raster::render(&published.view.map_points, pipeline.bounds(), cli.width, cli.height);
    map_raster::save(&cli.output, &canvas)?;
    println!(
        "{}: {} marker(s) for {} listing(s). Output saved to {}",
        labels(cli.lang).map,
        published.view.map_points.len(),
        published.view.total_matches,
        cli.output.display()
    );

    #[cfg(feature = "web")]
    if cli.serve {
        let state = topiko_server::AppState {
            coordinator: Arc::new(coordinator),
        };
        let handle = topiko_server::start_server(state, topiko_server::ServerConfig::from_env()).await?;
        handle.await.ok();
    }

    Ok(())
}

fn print_list(view: &DirectoryView, lang: Language) {
    let text = labels(lang);
    if view.location_prompt {
        println!("! {}", text.location_prompt);
    }
    if view.entries.is_empty() {
        println!("{}", text.no_listings);
        return;
    }

    println!("{} ({}/{})", text.list, view.current_page, view.total_pages);
    for entry in &view.entries {
        let listing = &entry.listing;
        let category_name = category(&listing.category_id).map_or("?", |c| c.name(lang));
        match entry.distance {
            Some(km) => println!("{:>5}  {}  [{}]  {:.1} km", listing.id, listing.title(lang), category_name, km),
            None => println!("{:>5}  {}  [{}]", listing.id, listing.title(lang), category_name),
        }
        println!("       {}: {}", text.directions, listing.directions_url());
    }
}
