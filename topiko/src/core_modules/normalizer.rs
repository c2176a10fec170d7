// THEORY:
// The `normalizer` maps geographic degrees onto the 0–100 "normalized plane" the
// map is drawn on. It is a presentation transform only: a linear stretch over
// a fixed bounding box, not a projection. Distances measured here are used to
// decide which markers overlap on screen and must never be read as kilometres.
//
// Key architectural principles:
// 1.  **Validated Bounds**: A `BoundingBox` can only be built through `new` (or the
//     built-in Greece constant), which rejects non-finite or degenerate axes.
//     Division by a zero-width axis therefore cannot happen at render time.
// 2.  **Per-Axis Monotonic**: `x` grows with longitude, `y` shrinks with
//     latitude (north is up), and equal inputs always give equal outputs.
// 3.  **No Clamping**: Points outside the box land outside 0–100. Clamping would
//     collapse distinct far-away points onto the border and merge them.

use crate::core_modules::listing::Coords;
use crate::error::{Result, TopikoError};
use serde::Serialize;

/// `((value - min) / (max - min)) * 100`.
///
/// The caller guarantees `min < max`; `BoundingBox` enforces that for every
/// call made by this crate.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min)) * 100.0
}

/// A position on the 0–100 × 0–100 map plane. `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn distance_to(&self, other: &NormalizedPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The geographic extent rendered by the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        for (name, value) in [
            ("min_lat", min_lat),
            ("max_lat", max_lat),
            ("min_lon", min_lon),
            ("max_lon", max_lon),
        ] {
            if !value.is_finite() {
                return Err(TopikoError::InvalidConfig(format!(
                    "bounding box {name} must be finite, got {value}"
                )));
            }
        }
        if min_lat >= max_lat {
            return Err(TopikoError::InvalidConfig(format!(
                "bounding box latitude range is empty: min {min_lat} >= max {max_lat}"
            )));
        }
        if min_lon >= max_lon {
            return Err(TopikoError::InvalidConfig(format!(
                "bounding box longitude range is empty: min {min_lon} >= max {max_lon}"
            )));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Mainland Greece and the islands.
    pub const fn greece() -> Self {
        Self {
            min_lat: 34.8,
            max_lat: 41.8,
            min_lon: 19.5,
            max_lon: 29.7,
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Projects degrees onto the map plane, latitude inverted so north is up.
    pub fn project(&self, coords: Coords) -> NormalizedPoint {
        NormalizedPoint {
            x: normalize(coords.longitude, self.min_lon, self.max_lon),
            y: 100.0 - normalize(coords.latitude, self.min_lat, self.max_lat),
        }
    }

    pub fn contains(&self, coords: Coords) -> bool {
        (self.min_lat..=self.max_lat).contains(&coords.latitude)
            && (self.min_lon..=self.max_lon).contains(&coords.longitude)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::greece()
    }
}
