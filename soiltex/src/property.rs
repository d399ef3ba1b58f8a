//! Soil layers and texture properties served by SoilGrids.
//!
//! SoilGrids publishes one coverage per `(property, depth, statistic)`
//! triple, identified as `{property}_{depth}_{statistic}`, e.g.
//! `clay_0-5cm_mean`. Only the three texture fractions and the four
//! topsoil layers are used here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SoilError;

/// One of the four canonical soil layers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Depth {
    #[default]
    #[serde(rename = "0-5cm")]
    D0To5,
    #[serde(rename = "5-15cm")]
    D5To15,
    #[serde(rename = "15-30cm")]
    D15To30,
    #[serde(rename = "30-60cm")]
    D30To60,
}

impl Depth {
    /// All layers, top to bottom.
    pub const ALL: [Depth; 4] = [Depth::D0To5, Depth::D5To15, Depth::D15To30, Depth::D30To60];

    /// The SoilGrids depth label.
    ///
    /// ```
    /// use soiltex::Depth;
    ///
    /// assert_eq!(Depth::D15To30.as_str(), "15-30cm");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::D0To5 => "0-5cm",
            Depth::D5To15 => "5-15cm",
            Depth::D15To30 => "15-30cm",
            Depth::D30To60 => "30-60cm",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = SoilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Depth::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| SoilError::UnknownDepth {
                label: s.to_string(),
            })
    }
}

/// A texture fraction published as its own SoilGrids service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureProperty {
    Clay,
    Sand,
    Silt,
}

impl TextureProperty {
    /// All texture properties in the order they are requested.
    pub const ALL: [TextureProperty; 3] = [
        TextureProperty::Clay,
        TextureProperty::Sand,
        TextureProperty::Silt,
    ];

    /// SoilGrids service id (also the coverage id prefix).
    pub fn service_id(&self) -> &'static str {
        match self {
            TextureProperty::Clay => "clay",
            TextureProperty::Sand => "sand",
            TextureProperty::Silt => "silt",
        }
    }

    /// Mapped unit of the published integer values.
    pub fn mapped_unit(&self) -> &'static str {
        // clay, sand and silt share the same conversion factor
        "g/kg"
    }
}

impl fmt::Display for TextureProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_id())
    }
}
