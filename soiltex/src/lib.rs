//! # soiltex - Soil Texture and Hydraulics
//!
//! Library for looking up soil texture composition at any coordinate from
//! SoilGrids 250m rasters, matching it to a soil class, and extracting
//! hydraulic properties from an external soil-moisture model.
//!
//! ## Features
//!
//! - **Texture per depth**: clay/sand/silt for the 0-5, 5-15, 15-30 and
//!   30-60 cm layers, fetched concurrently on a bounded pool
//! - **Soil class matching**: nearest class in a static texture table
//! - **Hydraulics**: field capacity, wilting point, saturated water content
//!   and conductivity, van Genuchten parameters, available water
//!
//! ## Quick Start
//!
//! ```ignore
//! use soiltex::{Coordinates, SoilServiceBuilder};
//!
//! let service = SoilServiceBuilder::from_env().build()?;
//! let outcome = service.hydraulics(Coordinates::new(115.0, 30.5), "0-5cm")?;
//! if let Some(report) = outcome.report {
//!     println!("Available water: {:?}", report.merged.available_water);
//! }
//! ```
//!
//! ## Cargo Features
//!
//! - `fetch`: the SoilGrids WCS client ([`fetch::SoilGridsClient`]) and
//!   GeoTIFF decoding ([`raster`]). Without it a [`PropertySource`] must be
//!   supplied to the builder.

pub mod classify;
pub mod coords;
pub mod error;
pub mod hydraulics;
pub mod model;
pub mod property;
pub mod service;
pub mod source;
pub mod texture;

#[cfg(feature = "fetch")]
pub mod fetch;
#[cfg(feature = "fetch")]
pub mod raster;

// Re-export main types at crate root for convenience
pub use classify::{normalize_code, SoilMatch, SoilTextureTable, TextureFractions};
pub use coords::{BoundingBox, Coordinates};
pub use error::{Result, SoilError};
pub use hydraulics::{extract_all, HydraulicProperties, HydraulicReport};
pub use model::{CommandModel, ModelRun, MoistureModel};
pub use property::{Depth, TextureProperty};
pub use service::{HydraulicsOutcome, SoilService, SoilServiceBuilder};
pub use source::{CoverageRequest, PropertyReading, PropertySource};
pub use texture::{SoilSample, TextureAggregator, WORKER_THREADS};
