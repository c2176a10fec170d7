// THEORY:
// The `sources` module defines the two asynchronous collaborators of the
// directory: where listings come from (`ListingStore`) and where the user is
// (`LocationProvider`). Both are single-shot requests: one call, one result or
// one error, no streams and no retries.
//
// Implementations are constructed once at startup and handed to whoever needs
// them behind an `Arc`. There are no process-wide client singletons.

use crate::core_modules::listing::{Coords, Listing};
use crate::core_modules::sample_data::sample_listings;
use crate::error::{LocationError, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

/// Read access to approved listings in the backing store.
pub trait ListingStore: Send + Sync {
    fn fetch_approved(&self) -> BoxFuture<'_, Result<Vec<Listing>>>;
}

/// A one-shot reading of the user's position.
pub trait LocationProvider: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, std::result::Result<Coords, LocationError>>;
}

/// An in-memory store over a fixed set of rows.
#[derive(Debug, Clone, Default)]
pub struct StaticListingStore {
    listings: Vec<Listing>,
}

impl StaticListingStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// The built-in sample catalogue.
    pub fn sample() -> Self {
        Self::new(sample_listings())
    }

    /// Parses a JSON array of backend rows.
    pub fn from_json(json: &str) -> Result<Self> {
        let listings: Vec<Listing> = serde_json::from_str(json)?;
        debug!(rows = listings.len(), "Parsed listing rows");
        Ok(Self::new(listings))
    }
}

impl ListingStore for StaticListingStore {
    fn fetch_approved(&self) -> BoxFuture<'_, Result<Vec<Listing>>> {
        let approved = self
            .listings
            .iter()
            .filter(|l| l.approved)
            .cloned()
            .map(Listing::with_placeholder_image)
            .collect();
        futures::future::ready(Ok(approved)).boxed()
    }
}

/// A position known up front, e.g. passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coords);

impl LocationProvider for FixedLocation {
    fn current_position(&self) -> BoxFuture<'_, std::result::Result<Coords, LocationError>> {
        futures::future::ready(Ok(self.0)).boxed()
    }
}

/// A client that cannot, or may not, report its position.
#[derive(Debug, Clone)]
pub struct NoLocation(pub LocationError);

impl LocationProvider for NoLocation {
    fn current_position(&self) -> BoxFuture<'_, std::result::Result<Coords, LocationError>> {
        futures::future::ready(Err(self.0.clone())).boxed()
    }
}
