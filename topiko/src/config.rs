// Runtime tunables for the directory pipeline, read from `TOPIKO_*` variables.

use std::{env, fmt::Display, str::FromStr};

use tracing::{debug, info, warn};

use crate::core_modules::catalog_filter::LISTINGS_PER_PAGE;
use crate::core_modules::cluster_engine::CLUSTER_RADIUS_NORMALIZED;
use crate::core_modules::normalizer::BoundingBox;
use crate::core_modules::proximity::NEAR_ME_RADIUS_KM;
use crate::error::{Result, TopikoError};

/// Tunables for the `DirectoryPipeline`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    /// Marker merge radius on the 0–100 map plane.
    pub cluster_radius: f64,
    /// "Near me" cut-off in kilometres.
    pub near_me_radius_km: f64,
    pub listings_per_page: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let bounds = BoundingBox::greece();
        Self {
            min_lat: bounds.min_lat(),
            max_lat: bounds.max_lat(),
            min_lon: bounds.min_lon(),
            max_lon: bounds.max_lon(),
            cluster_radius: CLUSTER_RADIUS_NORMALIZED,
            near_me_radius_km: NEAR_ME_RADIUS_KM,
            listings_per_page: LISTINGS_PER_PAGE,
        }
    }
}

impl PipelineConfig {
    /// Reads `TOPIKO_*` environment variables, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            min_lat: try_load(&lookup, "TOPIKO_MIN_LAT", defaults.min_lat)?,
            max_lat: try_load(&lookup, "TOPIKO_MAX_LAT", defaults.max_lat)?,
            min_lon: try_load(&lookup, "TOPIKO_MIN_LON", defaults.min_lon)?,
            max_lon: try_load(&lookup, "TOPIKO_MAX_LON", defaults.max_lon)?,
            cluster_radius: try_load(&lookup, "TOPIKO_CLUSTER_RADIUS", defaults.cluster_radius)?,
            near_me_radius_km: try_load(&lookup, "TOPIKO_NEAR_ME_KM", defaults.near_me_radius_km)?,
            listings_per_page: try_load(&lookup, "TOPIKO_PAGE_SIZE", defaults.listings_per_page)?,
        };
        info!(?config, "Loaded pipeline configuration");
        Ok(config)
    }

    /// Checks every tunable and builds the bounding box. Called once at startup.
    pub fn validate(&self) -> Result<BoundingBox> {
        let bounds = BoundingBox::new(self.min_lat, self.max_lat, self.min_lon, self.max_lon)?;
        if !(self.cluster_radius.is_finite() && self.cluster_radius > 0.0) {
            return Err(TopikoError::InvalidConfig(format!(
                "cluster radius must be a positive number, got {}",
                self.cluster_radius
            )));
        }
        if !(self.near_me_radius_km.is_finite() && self.near_me_radius_km > 0.0) {
            return Err(TopikoError::InvalidConfig(format!(
                "near-me radius must be a positive number of km, got {}",
                self.near_me_radius_km
            )));
        }
        if self.listings_per_page == 0 {
            return Err(TopikoError::InvalidConfig("page size must be at least 1".into()));
        }
        Ok(bounds)
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            TopikoError::InvalidConfig(format!("{key}={raw}: {e}"))
        }),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_describe_greece() {
        let config = PipelineConfig::from_lookup(lookup_from(&[])).expect("defaults load");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.validate().expect("defaults are valid"), BoundingBox::greece());
        assert_eq!(config.listings_per_page, 9);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("TOPIKO_CLUSTER_RADIUS", "3.5"),
            ("TOPIKO_PAGE_SIZE", " 12 "),
        ]))
        .expect("overrides load");
        assert_eq!(config.cluster_radius, 3.5);
        assert_eq!(config.listings_per_page, 12);
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let result = PipelineConfig::from_lookup(lookup_from(&[("TOPIKO_NEAR_ME_KM", "far")]));
        assert!(matches!(result, Err(TopikoError::InvalidConfig(_))));
    }

    #[test]
    fn degenerate_axis_fails_validation() {
        let config = PipelineConfig {
            min_lon: 25.0,
            max_lon: 25.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(TopikoError::InvalidConfig(_))));
    }

    #[test]
    fn non_positive_radii_fail_validation() {
        let zero_radius = PipelineConfig {
            cluster_radius: 0.0,
            ..PipelineConfig::default()
        };
        assert!(zero_radius.validate().is_err());

        let nan_distance = PipelineConfig {
            near_me_radius_km: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(nan_distance.validate().is_err());

        let no_page = PipelineConfig {
            listings_per_page: 0,
            ..PipelineConfig::default()
        };
        assert!(no_page.validate().is_err());
    }
}
