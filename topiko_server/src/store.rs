// Listing store backed by a PostgREST/Supabase-style HTTP API.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::time::Duration;
use topiko::Listing;
use topiko::error::{Result, TopikoError};
use topiko::sources::ListingStore;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the hosted listing table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
}

impl StoreConfig {
    /// `None` unless both `TOPIKO_SUPABASE_URL` and `TOPIKO_SUPABASE_KEY` are set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("TOPIKO_SUPABASE_URL").filter(|v| !v.trim().is_empty())?;
        let api_key = lookup("TOPIKO_SUPABASE_KEY").filter(|v| !v.trim().is_empty())?;
        Some(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn approved_listings_url(&self) -> String {
        format!("{}/rest/v1/listings?select=*&approved=eq.true", self.base_url)
    }
}

pub struct RestListingStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl RestListingStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TopikoError::Store(format!("HTTP client setup failed: {e}")))?;
        info!(base_url = %config.base_url, "Using REST listing store");
        Ok(Self { client, config })
    }

    async fn fetch(&self) -> Result<Vec<Listing>> {
        let url = self.config.approved_listings_url();
        debug!("Fetching listings: {url}");

        let rows: Vec<Listing> = self
            .client
            .get(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| TopikoError::Store(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| TopikoError::Store(format!("listing query rejected: {e}")))?
            .json()
            .await
            .map_err(|e| TopikoError::Store(format!("unreadable listing rows: {e}")))?;

        Ok(approved_with_images(rows))
    }
}

impl ListingStore for RestListingStore {
    fn fetch_approved(&self) -> BoxFuture<'_, Result<Vec<Listing>>> {
        self.fetch().boxed()
    }
}

/// The query already filters on `approved`, but rows are re-checked so a
/// misconfigured view can never leak pending listings.
fn approved_with_images(rows: Vec<Listing>) -> Vec<Listing> {
    let total = rows.len();
    let listings: Vec<Listing> = rows
        .into_iter()
        .filter(|l| l.approved)
        .map(Listing::with_placeholder_image)
        .collect();
    debug!(total, kept = listings.len(), "Received listing rows");
    listings
}
