//! Query coordinates and the bounding boxes requested around them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoilError};

/// Default half-width of the requested bounding box, in degrees.
pub const DEFAULT_BUFFER_DEG: f64 = 0.01;

/// A WGS84 query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Check that the point lies within the WGS84 range.
    ///
    /// # Errors
    ///
    /// Returns [`SoilError::InvalidCoordinates`] for a longitude outside
    /// [-180, 180], a latitude outside [-90, 90], or a non-finite value.
    ///
    /// ```
    /// use soiltex::Coordinates;
    ///
    /// assert!(Coordinates::new(115.0, 30.5).validate().is_ok());
    /// assert!(Coordinates::new(200.0, 30.5).validate().is_err());
    /// assert!(Coordinates::new(115.0, -95.0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<Self> {
        if !(-180.0..=180.0).contains(&self.longitude) || !(-90.0..=90.0).contains(&self.latitude)
        {
            return Err(SoilError::InvalidCoordinates {
                longitude: self.longitude,
                latitude: self.latitude,
            });
        }
        Ok(*self)
    }
}

/// A geographic bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western boundary longitude.
    pub west: f64,
    /// Southern boundary latitude.
    pub south: f64,
    /// Eastern boundary longitude.
    pub east: f64,
    /// Northern boundary latitude.
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Square box of half-width `buffer` degrees centred on `point`.
    pub fn around(point: Coordinates, buffer: f64) -> Self {
        Self::new(
            point.longitude - buffer,
            point.latitude - buffer,
            point.longitude + buffer,
            point.latitude + buffer,
        )
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// `west,south,east,north`, the WCS 1.0.0 `BBOX` order for EPSG:4326.
    pub fn to_wcs_bbox(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}
