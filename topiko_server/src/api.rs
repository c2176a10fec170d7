// Query-string parsing and JSON response shapes for the HTTP surface. Nothing
// here depends on axum, so it is compiled and tested without the `web` feature.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use topiko::core_modules::catalog_filter::{DirectoryEntry, ListingFilter};
use topiko::core_modules::listing::{Category, ContactLinks};
use topiko::core_modules::normalizer::NormalizedPoint;
use topiko::core_modules::translations::{Notice, labels};
use topiko::{Coords, DirectoryView, Language, MapPoint, ViewMode, ViewRequest};

pub const DEFAULT_RASTER_WIDTH: u32 = 800;
pub const DEFAULT_RASTER_HEIGHT: u32 = 600;
const MAX_RASTER_SIDE: u32 = 2048;
const MIN_RASTER_SIDE: u32 = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid 'near' parameter: {0}")]
    Near(String),

    #[error("Invalid 'lang' parameter: {0}")]
    Language(String),
}

/// `?categories=1,2&q=&near=lat,lon&page=&lang=`
///
/// `near=me` asks for the position last reported by the location provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryQuery {
    pub categories: Option<String>,
    pub q: Option<String>,
    pub near: Option<String>,
    pub page: Option<usize>,
    pub lang: Option<String>,
}

impl DirectoryQuery {
    pub fn language(&self) -> Result<Language, QueryError> {
        match self.lang.as_deref() {
            None | Some("") => Ok(Language::default()),
            Some(raw) => raw.parse().map_err(QueryError::Language),
        }
    }

    pub fn to_request(&self, mode: ViewMode) -> Result<ViewRequest, QueryError> {
        let categories = self
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        let (near_me, location) = match self.near.as_deref().map(str::trim) {
            None | Some("") => (false, None),
            Some("me") => (true, None),
            Some(raw) => (true, Some(raw.parse::<Coords>().map_err(QueryError::Near)?)),
        };

        Ok(ViewRequest {
            filter: ListingFilter {
                categories,
                search_term: self.q.clone().unwrap_or_default(),
                near_me,
            },
            location,
            page: self.page.unwrap_or(1),
            mode,
        })
    }
}

/// `?width=&height=` for the PNG endpoint, on top of the directory filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RasterQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl RasterQuery {
    pub fn dimensions(&self) -> (u32, u32) {
        let clamp = |side: Option<u32>, default: u32| side.unwrap_or(default).clamp(MIN_RASTER_SIDE, MAX_RASTER_SIDE);
        (
            clamp(self.width, DEFAULT_RASTER_WIDTH),
            clamp(self.height, DEFAULT_RASTER_HEIGHT),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryItem<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub icon: &'a str,
}

impl<'a> CategoryItem<'a> {
    pub fn new(category: &'a Category, language: Language) -> Self {
        Self {
            id: &category.id,
            name: category.name(language),
            icon: &category.icon,
        }
    }
}

/// One card of the list view, already localized.
#[derive(Debug, Serialize)]
pub struct ListingCard<'a> {
    pub id: i64,
    pub category_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub directions_url: String,
    pub detail_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactLinks>,
}

impl<'a> ListingCard<'a> {
    pub fn new(entry: &'a DirectoryEntry, language: Language) -> Self {
        let listing = &entry.listing;
        Self {
            id: listing.id,
            category_id: &listing.category_id,
            title: listing.title(language),
            description: listing.description(language),
            image: listing.images.first().map(String::as_str),
            distance_km: entry.distance,
            directions_url: listing.directions_url(),
            detail_path: listing.detail_path(),
            contact: listing.contact.as_ref().map(|c| c.links()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse<'a> {
    pub entries: Vec<ListingCard<'a>>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
    /// Present when "near me" was asked for without a known position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_prompt: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

impl<'a> ListingsResponse<'a> {
    pub fn new(view: &'a DirectoryView, notice: Option<Notice>, language: Language) -> Self {
        let text = labels(language);
        Self {
            entries: view.entries.iter().map(|e| ListingCard::new(e, language)).collect(),
            current_page: view.current_page,
            total_pages: view.total_pages,
            total_matches: view.total_matches,
            location_prompt: view.location_prompt.then_some(text.location_prompt),
            notice: notice.map(|n| n.message(language)),
            empty_message: (view.total_matches == 0).then_some(text.no_listings),
        }
    }
}

/// A map marker with its position on the 0-100 plane.
#[derive(Debug, Serialize)]
pub struct MarkerItem<'a> {
    #[serde(flatten)]
    pub point: &'a MapPoint,
    pub position: NormalizedPoint,
}

#[derive(Debug, Serialize)]
pub struct MapResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    pub markers: Vec<MarkerItem<'a>>,
    pub total_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_prompt: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

impl<'a> MapResponse<'a> {
    pub fn new(
        view: &'a DirectoryView,
        bounds: &topiko::core_modules::normalizer::BoundingBox,
        notice: Option<Notice>,
        language: Language,
    ) -> Self {
        Self {
            generation: None,
            markers: view
                .map_points
                .iter()
                .map(|point| MarkerItem {
                    point,
                    position: point.marker_position(bounds),
                })
                .collect(),
            total_matches: view.total_matches,
            location_prompt: view.location_prompt.then_some(labels(language).location_prompt),
            notice: notice.map(|n| n.message(language)),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topiko::core_modules::sample_data::sample_listings;
    use topiko::{DirectoryPipeline, PipelineConfig};

    fn query(pairs: &[(&str, &str)]) -> DirectoryQuery {
        let mut query = DirectoryQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "categories" => query.categories = value,
                "q" => query.q = value,
                "near" => query.near = value,
                "page" => query.page = value.and_then(|v| v.parse().ok()),
                "lang" => query.lang = value,
                other => panic!("unknown query key {other}"),
            }
        }
        query
    }

    #[test]
    fn categories_and_search_are_split_and_trimmed() {
        let request = query(&[("categories", "1, 3,,"), ("q", "pottery"), ("page", "2")])
            .to_request(ViewMode::List)
            .expect("valid query");
        assert_eq!(request.filter.categories, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(request.filter.search_term, "pottery");
        assert_eq!(request.page, 2);
        assert!(!request.filter.near_me);
    }

    #[test]
    fn near_accepts_coordinates_or_me() {
        let explicit = query(&[("near", "37.98,23.72")])
            .to_request(ViewMode::Map)
            .expect("valid query");
        assert!(explicit.filter.near_me);
        assert_eq!(explicit.location, Some(Coords::new(37.98, 23.72)));

        let stored = query(&[("near", "me")]).to_request(ViewMode::Map).expect("valid query");
        assert!(stored.filter.near_me);
        assert_eq!(stored.location, None);
    }

    #[test]
    fn bad_near_and_lang_are_rejected() {
        assert!(matches!(
            query(&[("near", "athens")]).to_request(ViewMode::List),
            Err(QueryError::Near(_))
        ));
        assert!(matches!(query(&[("lang", "fr")]).language(), Err(QueryError::Language(_))));
        assert_eq!(query(&[("lang", "el")]).language(), Ok(Language::Gr));
        assert_eq!(query(&[]).language(), Ok(Language::En));
    }

    #[test]
    fn raster_dimensions_are_clamped() {
        assert_eq!(RasterQuery::default().dimensions(), (DEFAULT_RASTER_WIDTH, DEFAULT_RASTER_HEIGHT));
        let huge = RasterQuery {
            width: Some(100_000),
            height: Some(1),
        };
        assert_eq!(huge.dimensions(), (MAX_RASTER_SIDE, MIN_RASTER_SIDE));
    }

    #[test]
    fn listings_response_is_localized() {
        let pipeline = DirectoryPipeline::new(PipelineConfig::default()).expect("default config is valid");
        let view = pipeline.generate_view(
            &sample_listings(),
            &query(&[("near", "me")]).to_request(ViewMode::List).expect("valid query"),
        );
        let response = ListingsResponse::new(&view, Some(Notice::SampleDataUnconfigured), Language::Gr);

        assert_eq!(response.location_prompt, Some(labels(Language::Gr).location_prompt));
        assert_eq!(response.notice, Some(labels(Language::Gr).sample_data_unconfigured));
        assert_eq!(response.entries[0].title, "Χαμάμ Αθηνών");
        assert!(response.entries[0].contact.as_ref().is_some_and(|c| c.call.starts_with("tel:")));
        assert!(response.empty_message.is_none());
    }

    #[test]
    fn map_response_carries_marker_positions() {
        let pipeline = DirectoryPipeline::new(PipelineConfig::default()).expect("default config is valid");
        let view = pipeline.generate_view(&sample_listings(), &ViewRequest {
            mode: ViewMode::Map,
            ..ViewRequest::default()
        });
        let response = MapResponse::new(&view, pipeline.bounds(), None, Language::En).with_generation(3);
        let json = serde_json::to_value(&response).expect("serializable");

        assert_eq!(json["generation"], 3);
        assert_eq!(json["markers"][0]["type"], "cluster");
        let x = json["markers"][0]["position"]["x"].as_f64().expect("numeric x");
        assert!((0.0..=100.0).contains(&x));
    }
}
