//! The seam between texture aggregation and the remote raster service.

use crate::coords::{BoundingBox, Coordinates, DEFAULT_BUFFER_DEG};
use crate::error::Result;
use crate::property::{Depth, TextureProperty};

/// Default SoilGrids statistic.
pub const DEFAULT_STATISTIC: &str = "mean";

/// One `(property, depth)` lookup at a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRequest {
    pub property: TextureProperty,
    pub depth: Depth,
    /// SoilGrids statistic, e.g. `mean`, `Q0.5`.
    pub statistic: String,
    pub point: Coordinates,
    /// Half-width of the requested box in degrees.
    pub buffer: f64,
}

impl CoverageRequest {
    pub fn new(property: TextureProperty, depth: Depth, point: Coordinates) -> Self {
        Self {
            property,
            depth,
            statistic: DEFAULT_STATISTIC.to_string(),
            point,
            buffer: DEFAULT_BUFFER_DEG,
        }
    }

    /// Coverage identifier, e.g. `clay_0-5cm_mean`.
    ///
    /// ```
    /// use soiltex::{Coordinates, CoverageRequest, Depth, TextureProperty};
    ///
    /// let req = CoverageRequest::new(
    ///     TextureProperty::Clay,
    ///     Depth::D0To5,
    ///     Coordinates::new(115.0, 30.5),
    /// );
    /// assert_eq!(req.coverage_id(), "clay_0-5cm_mean");
    /// ```
    pub fn coverage_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.property.service_id(),
            self.depth.as_str(),
            self.statistic
        )
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::around(self.point, self.buffer)
    }
}

/// A sampled property value together with its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReading {
    pub value: f64,
    pub unit: String,
}

/// Anything that can resolve a [`CoverageRequest`] to a value.
///
/// Implementations are called concurrently from the aggregation pool.
pub trait PropertySource: Send + Sync {
    fn fetch(&self, request: &CoverageRequest) -> Result<PropertyReading>;
}
