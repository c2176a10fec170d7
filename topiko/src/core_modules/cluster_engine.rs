// THEORY:
// The `ClusterEngine` is the spatial grouping layer of the map view. Markers
// that would sit on top of each other are replaced by a single `Cluster` marker
// showing how many listings it holds.
//
// Algorithm steps (greedy, single-link, non-transitive):
// 1.  **Validation**: Listings whose latitude or longitude is not finite are
//     dropped. They never appear as a marker or inside a cluster.
// 2.  **Projection**: Every remaining listing is projected once onto the
//     normalized plane through the `BoundingBox`.
// 3.  **Seeding**: Listings are visited in input order. An unassigned listing
//     becomes a seed and collects every *other* unassigned listing closer than
//     the radius. Collected neighbours do not recruit further listings, so
//     chains are not followed. Seed order therefore decides the grouping:
//     with A–B and B–C close but A–C far, seeding at B pulls A and C together.
// 4.  **Aggregation**: A group of two or more becomes a `Cluster` whose position
//     is the mean of its members' raw degrees, keyed by a running counter.
// 5.  **Leftovers**: Listings absorbed by no group stay standalone markers.
//
// Cost is O(n²) in the number of valid listings. That is fine for a few hundred
// records. Larger inputs would need a grid or k-d tree that keeps the same
// radius and the same non-transitive semantics.

use crate::core_modules::listing::{Coords, Listing};
use crate::core_modules::normalizer::{BoundingBox, NormalizedPoint};
use serde::{Deserialize, Serialize};

/// Markers closer than this on the 0–100 plane are merged.
pub const CLUSTER_RADIUS_NORMALIZED: f64 = 6.0;

/// A synthesized marker standing for several nearby listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique within one clustering pass only. Not stable across passes.
    pub key: u64,
    /// Members in the order they were collected; the seed comes first.
    pub listings: Vec<Listing>,
    /// Mean latitude of the members, in degrees.
    pub lat: f64,
    /// Mean longitude of the members, in degrees.
    pub lon: f64,
    pub count: usize,
}

impl Cluster {
    pub fn coords(&self) -> Coords {
        Coords::new(self.lat, self.lon)
    }
}

/// Something the map draws: one listing or a cluster of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapPoint {
    Listing(Listing),
    Cluster(Cluster),
}

impl MapPoint {
    pub fn coords(&self) -> Coords {
        match self {
            MapPoint::Listing(listing) => listing.coords(),
            MapPoint::Cluster(cluster) => cluster.coords(),
        }
    }

    /// Where the marker sits on the map plane (`x` = left %, `y` = top %).
    pub fn marker_position(&self, bounds: &BoundingBox) -> NormalizedPoint {
        bounds.project(self.coords())
    }

    /// Number of listings behind this marker.
    pub fn count(&self) -> usize {
        match self {
            MapPoint::Listing(_) => 1,
            MapPoint::Cluster(cluster) => cluster.count,
        }
    }

    pub fn listing_ids(&self) -> Vec<i64> {
        match self {
            MapPoint::Listing(listing) => vec![listing.id],
            MapPoint::Cluster(cluster) => cluster.listings.iter().map(|l| l.id).collect(),
        }
    }
}

pub mod cluster_engine {
    use super::*; // Make the marker types from the parent module available.
    use tracing::debug;

    /// Partitions `listings` into clusters and standalone markers.
    ///
    /// Clusters come first in the output, followed by standalone listings in
    /// input order. The input is only borrowed; members are cloned into the
    /// output.
    pub fn find_clusters(listings: &[Listing], bounds: &BoundingBox, radius: f64) -> Vec<MapPoint> {
        // --- 1. Validation ---
        let valid: Vec<&Listing> = listings.iter().filter(|l| l.has_valid_coords()).collect();
        let skipped = listings.len() - valid.len();
        if skipped > 0 {
            debug!(skipped, "Excluding listings with non-finite coordinates from the map");
        }
        if valid.is_empty() {
            return Vec::new();
        }

        // --- 2. Projection ---
        let positions: Vec<NormalizedPoint> =
            valid.iter().map(|l| bounds.project(l.coords())).collect();

        // --- 3. Seeding ---
        // Assignment is tracked by position so records sharing an id are still
        // each emitted exactly once.
        let mut assigned = vec![false; valid.len()];
        let mut clusters: Vec<MapPoint> = Vec::new();
        let mut next_key: u64 = 0;

        for seed in 0..valid.len() {
            if assigned[seed] {
                continue;
            }

            let mut members = vec![seed];
            for other in 0..valid.len() {
                if other == seed || assigned[other] {
                    continue;
                }
                if positions[seed].distance_to(&positions[other]) < radius {
                    members.push(other);
                }
            }

            // --- 4. Aggregation ---
            if members.len() > 1 {
                for &member in &members {
                    assigned[member] = true;
                }
                clusters.push(MapPoint::Cluster(build_cluster(next_key, &members, &valid)));
                next_key += 1;
            }
        }

        // --- 5. Leftovers ---
        let cluster_count = clusters.len();
        let mut points = clusters;
        points.extend(
            valid
                .iter()
                .zip(&assigned)
                .filter(|&(_, &is_assigned)| !is_assigned)
                .map(|(listing, _)| MapPoint::Listing((*listing).clone())),
        );

        debug!(
            valid = valid.len(),
            clusters = cluster_count,
            standalone = points.len() - cluster_count,
            "Clustered map points"
        );
        points
    }

    fn build_cluster(key: u64, members: &[usize], valid: &[&Listing]) -> Cluster {
        let count = members.len();
        let (sum_lat, sum_lon) = members.iter().fold((0.0, 0.0), |(lat, lon), &i| {
            (lat + valid[i].lat, lon + valid[i].lon)
        });
        Cluster {
            key,
            listings: members.iter().map(|&i| valid[i].clone()).collect(),
            lat: sum_lat / count as f64,
            lon: sum_lon / count as f64,
            count,
        }
    }
}
