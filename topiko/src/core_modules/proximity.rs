// THEORY:
// The `proximity` module powers the "near me" filter. It works on raw degrees
// with the haversine great-circle formula; the normalized map plane is a
// non-uniform stretch and is never used for real-world distances.

use crate::core_modules::listing::{Coords, Listing};
use serde::Serialize;
use std::f64::consts::PI;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Listings further than this from the user are hidden by "near me".
pub const NEAR_ME_RADIUS_KM: f64 = 50.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: Coords, to: Coords) -> f64 {
    let to_rad = |deg: f64| deg * PI / 180.0;

    let d_lat = to_rad(to.latitude - from.latitude);
    let d_lon = to_rad(to.longitude - from.longitude);
    let lat1 = to_rad(from.latitude);
    let lat2 = to_rad(to.latitude);

    let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// A listing together with its distance from the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyListing {
    #[serde(flatten)]
    pub listing: Listing,
    /// Kilometres from the user.
    pub distance: f64,
}

/// Keeps listings strictly closer than `max_km` to `user`, nearest first.
///
/// The sort is stable: listings at exactly the same distance keep their input
/// order. Listings with non-finite coordinates get a `NaN` distance and are
/// dropped.
pub fn filter_nearby(listings: &[Listing], user: Coords, max_km: f64) -> Vec<NearbyListing> {
    let mut nearby: Vec<NearbyListing> = listings
        .iter()
        .map(|listing| NearbyListing {
            distance: haversine_km(listing.coords(), user),
            listing: listing.clone(),
        })
        .filter(|entry| entry.distance < max_km)
        .collect();
    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}
