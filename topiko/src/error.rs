use thiserror::Error;

/// Errors surfaced by the directory pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum TopikoError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Location unavailable: {0}")]
    Location(#[from] LocationError),

    #[error("Listing store failed: {0}")]
    Store(String),

    #[error("Malformed listing payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Map raster failed: {0}")]
    Raster(#[from] image::ImageError),

    #[error("View coordinator is shut down")]
    CoordinatorClosed,
}

/// Why a location sensor could not produce a position.
///
/// None of these are fatal: the "near me" filter is skipped and the user is
/// prompted to enable location services instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Geolocation is not supported by this client.")]
    Unsupported,

    #[error("Permission to read the current position was denied.")]
    PermissionDenied,

    #[error("Error: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, TopikoError>;
