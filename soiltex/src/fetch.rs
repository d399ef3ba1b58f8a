//! SoilGrids WCS client.
//!
//! This module is only available when the `fetch` feature is enabled.
//!
//! Each [`CoverageRequest`] becomes one WCS 1.0.0 `GetCoverage` call for a
//! small GeoTIFF around the query point. The response body is spooled to a
//! temporary `.tif` file, decoded, and the pixel nearest the query point is
//! returned. The temporary file is removed when the request finishes,
//! whether or not it succeeded.
//!
//! Requests are not retried.

use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{Result, SoilError};
use crate::raster::RasterTile;
use crate::source::{CoverageRequest, PropertyReading, PropertySource};

/// Default SoilGrids map server.
pub const DEFAULT_BASE_URL: &str = "https://maps.isric.org/mapserv";

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default tile size in pixels.
const DEFAULT_TILE_PIXELS: u32 = 10;

/// Configuration for the raster service client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Map server endpoint; the per-service map file is passed as `map=`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Requested tile width in pixels.
    pub width: u32,
    /// Requested tile height in pixels.
    pub height: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            width: DEFAULT_TILE_PIXELS,
            height: DEFAULT_TILE_PIXELS,
        }
    }
}

impl FetchConfig {
    /// Point the client at a different map server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the requested tile size.
    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }
}

/// Blocking SoilGrids coverage client.
pub struct SoilGridsClient {
    client: Client,
    config: FetchConfig,
}

impl SoilGridsClient {
    /// Create a new client with the given configuration.
    ///
    /// Must not be called from within an async runtime; use
    /// `spawn_blocking` there.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SoilError::FetchFailed {
                coverage_id: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Query parameters for a WCS 1.0.0 GetCoverage request.
    fn query_params(&self, request: &CoverageRequest) -> Vec<(&'static str, String)> {
        vec![
            (
                "map",
                format!("/map/{}.map", request.property.service_id()),
            ),
            ("SERVICE", "WCS".to_string()),
            ("VERSION", "1.0.0".to_string()),
            ("REQUEST", "GetCoverage".to_string()),
            ("COVERAGE", request.coverage_id()),
            ("CRS", "urn:ogc:def:crs:EPSG::4326".to_string()),
            ("BBOX", request.bbox().to_wcs_bbox()),
            ("WIDTH", self.config.width.to_string()),
            ("HEIGHT", self.config.height.to_string()),
            ("FORMAT", "GEOTIFF_INT16".to_string()),
        ]
    }

    /// Download the coverage tile for `request`.
    fn download(&self, request: &CoverageRequest) -> Result<Vec<u8>> {
        let coverage_id = request.coverage_id();
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.query_params(request))
            .send()?;

        if !response.status().is_success() {
            return Err(SoilError::FetchFailed {
                coverage_id,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes()?;

        // Service exceptions come back as XML with a 200 status.
        if bytes.is_empty() || bytes.starts_with(b"<") {
            let snippet: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(SoilError::FetchFailed {
                coverage_id,
                reason: format!("Not a raster response: {}", snippet),
            });
        }

        Ok(bytes.to_vec())
    }
}

impl PropertySource for SoilGridsClient {
    fn fetch(&self, request: &CoverageRequest) -> Result<PropertyReading> {
        let bytes = self.download(request)?;

        let mut temp = tempfile::Builder::new()
            .prefix("soiltex-")
            .suffix(".tif")
            .tempfile()?;
        temp.write_all(&bytes)?;
        temp.flush()?;

        let tile = RasterTile::from_file(temp.path(), request.bbox())?;
        let value = tile
            .sample_nearest(request.point.longitude, request.point.latitude)
            .ok_or_else(|| SoilError::NoData {
                coverage_id: request.coverage_id(),
            })?;

        Ok(PropertyReading {
            value,
            unit: request.property.mapped_unit().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Coordinates;
    use crate::property::{Depth, TextureProperty};

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!((config.width, config.height), (10, 10));
    }

    #[test]
    fn test_config_builders() {
        let config = FetchConfig::default()
            .with_base_url("http://localhost:9000/wcs")
            .with_timeout(5)
            .with_tile_size(0, 20);
        assert_eq!(config.base_url, "http://localhost:9000/wcs");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!((config.width, config.height), (1, 20));
    }

    #[test]
    fn test_query_params() {
        let client = SoilGridsClient::new(FetchConfig::default()).unwrap();
        let request = CoverageRequest::new(
            TextureProperty::Silt,
            Depth::D15To30,
            Coordinates::new(115.0, 30.5),
        );
        let params = client.query_params(&request);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("map"), "/map/silt.map");
        assert_eq!(get("COVERAGE"), "silt_15-30cm_mean");
        assert_eq!(get("WIDTH"), "10");
        assert!(get("BBOX").starts_with("114.99"));
    }

    #[test]
    fn test_unreachable_server_is_error() {
        let client = SoilGridsClient::new(
            FetchConfig::default()
                .with_base_url("http://127.0.0.1:9/mapserv")
                .with_timeout(2),
        )
        .unwrap();
        let request = CoverageRequest::new(
            TextureProperty::Clay,
            Depth::D0To5,
            Coordinates::new(115.0, 30.5),
        );
        assert!(client.fetch(&request).is_err());
    }
}
