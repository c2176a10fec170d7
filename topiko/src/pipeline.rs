// THEORY:
// The `pipeline` module is the top-level, synchronous API of the directory.
// It wires the stages together for a single request:
//
//   listings ─► catalogue filter ─► proximity filter ─┬─► pagination  (list view)
//                                                     └─► clustering   (map view)
//
// A `DirectoryPipeline` is built once from a validated `PipelineConfig` and is
// immutable afterwards, so it can be shared freely across tasks. Every call
// recomputes from scratch; nothing is cached between calls.

use crate::config::PipelineConfig;
use crate::core_modules::catalog_filter::{DirectoryEntry, FilterOutcome, ListingFilter, apply_filter, paginate};
use crate::core_modules::cluster_engine::{MapPoint, cluster_engine};
use crate::core_modules::listing::{Coords, Listing};
use crate::core_modules::normalizer::BoundingBox;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::catalog_filter::Page;
pub use crate::core_modules::cluster_engine::Cluster;

/// Which layout the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Paginated cards, no map.
    #[default]
    List,
    /// Map only, every match clustered.
    Map,
    /// Every match as cards next to the map.
    Split,
}

/// Everything that determines a view, besides the listings themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewRequest {
    pub filter: ListingFilter,
    /// The user's position, when known.
    pub location: Option<Coords>,
    /// 1-based page for the list view. Out-of-range values are clamped.
    pub page: usize,
    pub mode: ViewMode,
}

/// The computed output for one `ViewRequest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryView {
    pub mode: ViewMode,
    /// Cards to show: one page in list mode, every match in split mode, none in map mode.
    pub entries: Vec<DirectoryEntry>,
    /// Markers to draw; empty in list mode.
    pub map_points: Vec<MapPoint>,
    pub current_page: usize,
    pub total_pages: usize,
    /// Number of listings that passed every filter.
    pub total_matches: usize,
    /// "Near me" was requested without a known location.
    pub location_prompt: bool,
}

pub struct DirectoryPipeline {
    config: PipelineConfig,
    bounds: BoundingBox,
}

impl DirectoryPipeline {
    /// Validates the configuration up front so bad bounds fail at startup
    /// rather than as `NaN` marker positions later.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let bounds = config.validate()?;
        info!(
            cluster_radius = config.cluster_radius,
            near_me_km = config.near_me_radius_km,
            per_page = config.listings_per_page,
            "Directory pipeline ready"
        );
        Ok(Self { config, bounds })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Stage 1: categories, search and "near me".
    pub fn filter(&self, listings: &[Listing], filter: &ListingFilter, location: Option<Coords>) -> FilterOutcome {
        apply_filter(listings, filter, location, self.config.near_me_radius_km)
    }

    /// Stage 2 (map): groups overlapping markers.
    pub fn cluster(&self, listings: &[Listing]) -> Vec<MapPoint> {
        cluster_engine::find_clusters(listings, &self.bounds, self.config.cluster_radius)
    }

    pub fn generate_view(&self, listings: &[Listing], request: &ViewRequest) -> DirectoryView {
        let outcome = self.filter(listings, &request.filter, request.location);
        let total_matches = outcome.entries.len();

        let view = match request.mode {
            ViewMode::List => {
                let page = paginate(&outcome.entries, request.page, self.config.listings_per_page);
                DirectoryView {
                    mode: request.mode,
                    entries: page.items,
                    map_points: Vec::new(),
                    current_page: page.current_page,
                    total_pages: page.total_pages,
                    total_matches,
                    location_prompt: outcome.location_prompt,
                }
            }
            ViewMode::Map | ViewMode::Split => {
                let matched: Vec<Listing> = outcome.entries.iter().map(|e| e.listing.clone()).collect();
                let map_points = self.cluster(&matched);
                let entries = if request.mode == ViewMode::Split {
                    outcome.entries
                } else {
                    Vec::new()
                };
                DirectoryView {
                    mode: request.mode,
                    entries,
                    map_points,
                    current_page: 1,
                    total_pages: usize::from(total_matches > 0),
                    total_matches,
                    location_prompt: outcome.location_prompt,
                }
            }
        };

        debug!(
            mode = ?view.mode,
            matches = view.total_matches,
            entries = view.entries.len(),
            markers = view.map_points.len(),
            "Generated directory view"
        );
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::sample_data::sample_listings;

    fn pipeline() -> DirectoryPipeline {
        DirectoryPipeline::new(PipelineConfig::default()).expect("default config is valid")
    }

    #[test]
    fn degenerate_config_is_rejected_at_construction() {
        let config = PipelineConfig {
            min_lat: 40.0,
            max_lat: 35.0,
            ..PipelineConfig::default()
        };
        assert!(DirectoryPipeline::new(config).is_err());
    }

    #[test]
    fn list_view_is_paginated_without_markers() {
        let listings: Vec<Listing> = (0..20)
            .map(|i| Listing::new(i, "1", 36.0 + i as f64 * 0.2, 22.0))
            .collect();
        let view = pipeline().generate_view(
            &listings,
            &ViewRequest {
                page: 3,
                ..ViewRequest::default()
            },
        );
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.current_page, 3);
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.total_matches, 20);
        assert!(view.map_points.is_empty());
    }

    #[test]
    fn map_view_clusters_every_match() {
        let view = pipeline().generate_view(
            &sample_listings(),
            &ViewRequest {
                mode: ViewMode::Map,
                ..ViewRequest::default()
            },
        );
        assert!(view.entries.is_empty());
        let marker_total: usize = view.map_points.iter().map(MapPoint::count).sum();
        assert_eq!(marker_total, view.total_matches);
        // The two Athens sample listings are a few hundred metres apart.
        assert!(view
            .map_points
            .iter()
            .any(|p| matches!(p, MapPoint::Cluster(c) if c.count == 2)));
    }

    #[test]
    fn split_view_keeps_full_list_and_map() {
        let view = pipeline().generate_view(
            &sample_listings(),
            &ViewRequest {
                mode: ViewMode::Split,
                ..ViewRequest::default()
            },
        );
        assert_eq!(view.entries.len(), sample_listings().len());
        assert!(!view.map_points.is_empty());
    }

    #[test]
    fn near_me_in_map_view_only_clusters_nearby() {
        let view = pipeline().generate_view(
            &sample_listings(),
            &ViewRequest {
                filter: ListingFilter {
                    near_me: true,
                    ..ListingFilter::default()
                },
                location: Some(Coords::new(37.9838, 23.7275)),
                mode: ViewMode::Map,
                ..ViewRequest::default()
            },
        );
        assert_eq!(view.total_matches, 2);
        assert!(!view.location_prompt);
    }

    #[test]
    fn near_me_without_location_raises_prompt() {
        let view = pipeline().generate_view(
            &sample_listings(),
            &ViewRequest {
                filter: ListingFilter {
                    near_me: true,
                    ..ListingFilter::default()
                },
                ..ViewRequest::default()
            },
        );
        assert!(view.location_prompt);
        assert_eq!(view.total_matches, sample_listings().len());
    }
}
