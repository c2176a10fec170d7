// THEORY:
// The `catalog_filter` turns the full set of approved listings into what the
// list and map views show. Filters run in a fixed order: categories, then the
// text search, then "near me". Pagination is applied last and only by the list
// view; the map and split views always see every match.
//
// "Near me" depends on a location the user may not have shared. Without one the
// proximity step is skipped and `location_prompt` is raised so the caller can
// ask the user to enable location services. That is a missing capability, not
// an error.

use crate::core_modules::listing::{Coords, Listing};
use crate::core_modules::proximity::{NearbyListing, filter_nearby};
use serde::{Deserialize, Serialize};

pub const LISTINGS_PER_PAGE: usize = 9;

/// The user's current filter selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    /// Selected category ids. Empty means every category.
    pub categories: Vec<String>,
    pub search_term: String,
    pub near_me: bool,
}

impl ListingFilter {
    /// Adds the category if it is not selected, removes it otherwise.
    pub fn toggle_category(&mut self, category_id: &str) {
        if let Some(index) = self.categories.iter().position(|c| c == category_id) {
            self.categories.remove(index);
        } else {
            self.categories.push(category_id.to_string());
        }
    }

    fn accepts(&self, listing: &Listing, lowercased_term: &str) -> bool {
        let category_ok =
            self.categories.is_empty() || self.categories.iter().any(|c| *c == listing.category_id);
        let term_ok = lowercased_term.is_empty() || listing.matches_term(lowercased_term);
        category_ok && term_ok
    }
}

/// A listing as shown in the list view, with its distance when "near me" ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<NearbyListing> for DirectoryEntry {
    fn from(nearby: NearbyListing) -> Self {
        Self {
            listing: nearby.listing,
            distance: Some(nearby.distance),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub entries: Vec<DirectoryEntry>,
    /// "Near me" was requested but no location was available.
    pub location_prompt: bool,
}

pub fn apply_filter(
    listings: &[Listing],
    filter: &ListingFilter,
    location: Option<Coords>,
    max_km: f64,
) -> FilterOutcome {
    let term = filter.search_term.trim().to_lowercase();
    let matching: Vec<Listing> = listings
        .iter()
        .filter(|listing| filter.accepts(listing, &term))
        .cloned()
        .collect();

    match (filter.near_me, location) {
        (true, Some(user)) => FilterOutcome {
            entries: filter_nearby(&matching, user, max_km)
                .into_iter()
                .map(DirectoryEntry::from)
                .collect(),
            location_prompt: false,
        },
        (near_me, _) => FilterOutcome {
            entries: matching
                .into_iter()
                .map(|listing| DirectoryEntry {
                    listing,
                    distance: None,
                })
                .collect(),
            location_prompt: near_me,
        },
    }
}

/// One page of results. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Slices out `page`, clamping it into `1..=total_pages`.
///
/// An empty input yields a single empty page 1 of 0.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let current_page = page.clamp(1, total_pages.max(1));
    let start = (current_page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        current_page,
        total_pages,
    }
}
