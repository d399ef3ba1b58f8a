//! Error types for the soiltex library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving soil texture and hydraulics.
#[derive(Error, Debug)]
pub enum SoilError {
    /// IO error when reading files or spawning processes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON resource or model output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error from the raster service.
    #[cfg(feature = "fetch")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Coordinates outside the valid WGS84 range.
    #[error("Invalid coordinates: longitude={longitude}, latitude={latitude} (valid: longitude ±180°, latitude ±90°)")]
    InvalidCoordinates { longitude: f64, latitude: f64 },

    /// Depth label is not one of the four canonical layers.
    #[error("Unknown depth label: {label} (expected 0-5cm, 5-15cm, 15-30cm or 30-60cm)")]
    UnknownDepth { label: String },

    /// The requested depth has no complete texture data at this location.
    #[error("Depth {depth} not found in texture data (available: {available:?})")]
    DepthNotFound { depth: String, available: Vec<String> },

    /// Raster payload could not be decoded.
    #[error("Raster decode failed: {0}")]
    Raster(String),

    /// Raster service answered, but not with a usable coverage.
    #[error("Coverage {coverage_id} fetch failed: {reason}")]
    FetchFailed { coverage_id: String, reason: String },

    /// The sampled pixel holds the nodata value.
    #[error("No data for coverage {coverage_id} at the query point")]
    NoData { coverage_id: String },

    /// None of the candidate soil table paths exist.
    #[error("Soil texture table not found (searched: {searched:?})")]
    SoilTableNotFound { searched: Vec<PathBuf> },

    /// Soil texture table has no entries to match against.
    #[error("Soil texture table is empty")]
    EmptySoilTable,

    /// No moisture model is configured.
    #[error("Moisture model not configured")]
    ModelUnavailable,

    /// Moisture model ran but did not produce usable output.
    #[error("Moisture model failed: {0}")]
    ModelFailed(String),

    /// The aggregation worker pool could not be started.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// No property source configured and the `fetch` feature is disabled.
    #[error("No property source configured")]
    NoSource,
}

/// Result type alias using [`SoilError`].
pub type Result<T> = std::result::Result<T, SoilError>;
