//! Soil texture and hydraulics service.
//!
//! [`SoilService`] composes the texture aggregator, the soil class table and
//! the moisture model behind two operations:
//!
//! - [`SoilService::texture`]: texture composition per depth at a point;
//! - [`SoilService::hydraulics`]: texture at one depth, matched soil class
//!   and the hydraulic properties reported by the moisture model.
//!
//! ```ignore
//! use soiltex::{Coordinates, SoilServiceBuilder};
//!
//! let service = SoilServiceBuilder::from_env().build()?;
//! let samples = service.texture(Coordinates::new(115.0, 30.5))?;
//! for sample in samples {
//!     println!("{}: clay {}%", sample.depth, sample.clay_percent);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{SoilMatch, SoilTextureTable};
use crate::coords::Coordinates;
use crate::error::{Result, SoilError};
use crate::hydraulics::{extract_all, HydraulicReport};
use crate::model::{CommandModel, MoistureModel};
use crate::property::Depth;
use crate::source::PropertySource;
use crate::texture::{SoilSample, TextureAggregator};

#[cfg(feature = "fetch")]
use crate::fetch::{FetchConfig, SoilGridsClient};

/// Everything a hydraulics lookup produced, including partial results.
///
/// `error` is set when a step after coordinate validation failed; the
/// fields computed before the failure are kept.
#[derive(Debug)]
pub struct HydraulicsOutcome {
    pub location: Coordinates,
    /// Requested depth label, as given.
    pub depth: String,
    pub texture: Option<SoilSample>,
    pub soil_match: Option<SoilMatch>,
    pub report: Option<HydraulicReport>,
    /// Structured values the model reported itself.
    pub model_fields: BTreeMap<String, serde_json::Value>,
    pub error: Option<SoilError>,
}

impl HydraulicsOutcome {
    fn new(location: Coordinates, depth: &str) -> Self {
        Self {
            location,
            depth: depth.to_string(),
            texture: None,
            soil_match: None,
            report: None,
            model_fields: BTreeMap::new(),
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// High-level soil service.
pub struct SoilService {
    aggregator: TextureAggregator,
    /// Loaded once at build time, read-only afterwards.
    soil_table: Option<SoilTextureTable>,
    /// Where the table was looked for, for error reporting.
    table_candidates: Vec<PathBuf>,
    model: Option<Arc<dyn MoistureModel>>,
}

impl SoilService {
    /// Create a builder for configuration options.
    pub fn builder() -> SoilServiceBuilder {
        SoilServiceBuilder::new()
    }

    /// Texture composition per depth at `point`.
    ///
    /// Depths without complete data are omitted; the list may be empty.
    ///
    /// # Errors
    ///
    /// [`SoilError::InvalidCoordinates`] for out-of-range input, or
    /// [`SoilError::WorkerPool`] if the fetch pool cannot start.
    pub fn texture(&self, point: Coordinates) -> Result<Vec<SoilSample>> {
        let point = point.validate()?;
        self.aggregator.aggregate(point)
    }

    /// Texture, soil class and hydraulic properties at one depth.
    ///
    /// # Errors
    ///
    /// Only [`SoilError::InvalidCoordinates`] is returned as an error. Every
    /// later failure (unknown or missing depth, missing soil table, model
    /// failure) is recorded in [`HydraulicsOutcome::error`].
    pub fn hydraulics(&self, point: Coordinates, depth: &str) -> Result<HydraulicsOutcome> {
        let point = point.validate()?;
        let mut outcome = HydraulicsOutcome::new(point, depth);

        if let Err(e) = self.fill_hydraulics(&mut outcome) {
            tracing::error!(
                longitude = point.longitude,
                latitude = point.latitude,
                depth = depth,
                soil_code = outcome.soil_match.as_ref().map(|m| m.normalized_code.as_str()),
                error = %e,
                error_debug = ?e,
                "Hydraulics lookup failed"
            );
            outcome.error = Some(e);
        }

        Ok(outcome)
    }

    fn fill_hydraulics(&self, outcome: &mut HydraulicsOutcome) -> Result<()> {
        let depth: Depth = outcome
            .depth
            .parse()
            .map_err(|_| SoilError::DepthNotFound {
                depth: outcome.depth.clone(),
                available: Depth::ALL.iter().map(|d| d.to_string()).collect(),
            })?;

        let samples = self.aggregator.aggregate(outcome.location)?;
        let available: Vec<String> = samples.iter().map(|s| s.depth.to_string()).collect();
        let sample = samples
            .into_iter()
            .find(|s| s.depth == depth)
            .ok_or_else(|| SoilError::DepthNotFound {
                depth: outcome.depth.clone(),
                available,
            })?;
        let (clay, silt) = (sample.clay_percent, sample.silt_percent);
        outcome.texture = Some(sample);

        let soil_match = self.classify(clay, silt)?;
        let code = soil_match.normalized_code.clone();
        outcome.soil_match = Some(soil_match);

        let model = self.model.as_ref().ok_or(SoilError::ModelUnavailable)?;
        let run = model.run(&code)?;

        outcome.report = Some(extract_all(&run.outputs));
        outcome.model_fields = run.fields;
        Ok(())
    }

    /// Match percentages against the soil class table.
    pub fn classify(&self, clay_percent: f64, silt_percent: f64) -> Result<SoilMatch> {
        let table = self
            .soil_table
            .as_ref()
            .ok_or_else(|| SoilError::SoilTableNotFound {
                searched: self.table_candidates.clone(),
            })?;
        table.classify(clay_percent, silt_percent)
    }

    pub fn soil_table(&self) -> Option<&SoilTextureTable> {
        self.soil_table.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

/// Builder for [`SoilService`].
pub struct SoilServiceBuilder {
    source: Option<Arc<dyn PropertySource>>,
    soil_table: Option<SoilTextureTable>,
    table_candidates: Vec<PathBuf>,
    model: Option<Arc<dyn MoistureModel>>,
    #[cfg(feature = "fetch")]
    fetch_config: FetchConfig,
}

impl Default for SoilServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SoilServiceBuilder {
    /// Builder with the default table locations and no moisture model.
    pub fn new() -> Self {
        Self {
            source: None,
            soil_table: None,
            table_candidates: SoilTextureTable::default_candidates(),
            model: None,
            #[cfg(feature = "fetch")]
            fetch_config: FetchConfig::default(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `SOILTEX_SOIL_TABLE` | Soil class table JSON, searched first | None |
    /// | `SOILTEX_MODEL_CMD` | Moisture model executable | None (no model) |
    /// | `SOILTEX_MODEL_ARGS` | Whitespace-separated fixed arguments | None |
    /// | `SOILTEX_MODEL_NAME` | Name for plain-text model output | executable stem |
    /// | `SOILTEX_WCS_URL` | Raster service endpoint* | `https://maps.isric.org/mapserv` |
    /// | `SOILTEX_FETCH_TIMEOUT` | Request timeout in seconds* | 120 |
    ///
    /// *Only used when the `fetch` feature is enabled.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Ok(path) = std::env::var("SOILTEX_SOIL_TABLE") {
            builder.table_candidates.insert(0, PathBuf::from(path));
        }

        if let Ok(program) = std::env::var("SOILTEX_MODEL_CMD") {
            let mut model = CommandModel::new(program);
            if let Ok(args) = std::env::var("SOILTEX_MODEL_ARGS") {
                model = model.with_args(args.split_whitespace());
            }
            if let Ok(name) = std::env::var("SOILTEX_MODEL_NAME") {
                model = model.with_name(name);
            }
            builder.model = Some(Arc::new(model));
        }

        #[cfg(feature = "fetch")]
        {
            if let Ok(url) = std::env::var("SOILTEX_WCS_URL") {
                builder.fetch_config = builder.fetch_config.with_base_url(url);
            }
            if let Some(timeout) = std::env::var("SOILTEX_FETCH_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
            {
                builder.fetch_config = builder.fetch_config.with_timeout(timeout);
            }
        }

        builder
    }

    /// Use a custom property source instead of the SoilGrids client.
    pub fn source(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use an already loaded soil class table.
    pub fn soil_table(mut self, table: SoilTextureTable) -> Self {
        self.soil_table = Some(table);
        self
    }

    /// Load the soil class table from exactly this path.
    pub fn soil_table_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.table_candidates = vec![path.as_ref().to_path_buf()];
        self
    }

    /// Set the moisture model.
    pub fn model(mut self, model: Arc<dyn MoistureModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Configure the SoilGrids client.
    #[cfg(feature = "fetch")]
    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    /// Build the [`SoilService`].
    ///
    /// A missing soil table is not an error here; hydraulics lookups report
    /// it instead. A table that exists but does not parse is.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is malformed, or no property source
    /// can be created.
    pub fn build(self) -> Result<SoilService> {
        let source = match self.source.clone() {
            Some(source) => source,
            None => self.default_source()?,
        };

        let soil_table = match self.soil_table {
            Some(table) => Some(table),
            None => match SoilTextureTable::locate(&self.table_candidates) {
                Ok((table, path)) => {
                    tracing::info!(
                        path = %path.display(),
                        classes = table.len(),
                        "Loaded soil texture table"
                    );
                    Some(table)
                }
                Err(SoilError::SoilTableNotFound { searched }) => {
                    tracing::warn!(?searched, "Soil texture table not found");
                    None
                }
                Err(e) => return Err(e),
            },
        };

        Ok(SoilService {
            aggregator: TextureAggregator::new(source),
            soil_table,
            table_candidates: self.table_candidates,
            model: self.model,
        })
    }

    #[cfg(feature = "fetch")]
    fn default_source(&self) -> Result<Arc<dyn PropertySource>> {
        Ok(Arc::new(SoilGridsClient::new(self.fetch_config.clone())?))
    }

    #[cfg(not(feature = "fetch"))]
    fn default_source(&self) -> Result<Arc<dyn PropertySource>> {
        Err(SoilError::NoSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelRun;
    use crate::property::TextureProperty;
    use crate::source::{CoverageRequest, PropertyReading};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::{NamedTempFile, TempDir};

    const BUNDLED: &str = include_str!("../../data/soil_texture.json");

    /// Loam-like texture everywhere except the deepest layer's sand.
    struct LoamSource;

    impl PropertySource for LoamSource {
        fn fetch(&self, request: &CoverageRequest) -> Result<PropertyReading> {
            if request.depth == Depth::D30To60 && request.property == TextureProperty::Sand {
                return Err(SoilError::NoData {
                    coverage_id: request.coverage_id(),
                });
            }
            let value = match request.property {
                TextureProperty::Clay => 180.0,
                TextureProperty::Sand => 420.0,
                TextureProperty::Silt => 400.0,
            };
            Ok(PropertyReading {
                value,
                unit: "g/kg".to_string(),
            })
        }
    }

    /// Records the codes it was run with.
    struct RecordingModel {
        codes: Mutex<Vec<String>>,
        fail: bool,
    }

    impl MoistureModel for RecordingModel {
        fn run(&self, soil_code: &str) -> Result<ModelRun> {
            self.codes.lock().unwrap().push(soil_code.to_string());
            if self.fail {
                return Err(SoilError::ModelFailed("empty result".to_string()));
            }
            let mut run = ModelRun::default();
            run.outputs.insert(
                "vg".to_string(),
                "qs = 0.43\n33KPa 0.28\n15000KPa 0.10\nKs = 1.5e+02".to_string(),
            );
            run.fields
                .insert("texture".to_string(), serde_json::json!("loam"));
            Ok(run)
        }
    }

    fn table() -> SoilTextureTable {
        SoilTextureTable::from_json_str(BUNDLED).unwrap()
    }

    fn point() -> Coordinates {
        Coordinates::new(115.0, 30.5)
    }

    fn service_with(model: Option<Arc<RecordingModel>>) -> SoilService {
        let mut builder = SoilServiceBuilder::new()
            .source(Arc::new(LoamSource))
            .soil_table(table());
        if let Some(model) = model {
            builder = builder.model(model);
        }
        builder.build().unwrap()
    }

    fn recording(fail: bool) -> Arc<RecordingModel> {
        Arc::new(RecordingModel {
            codes: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[test]
    fn test_texture_drops_incomplete_depth() {
        let service = service_with(None);
        let samples = service.texture(point()).unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.depth != Depth::D30To60));
    }

    #[test]
    fn test_texture_invalid_coordinates() {
        let service = service_with(None);
        assert!(matches!(
            service.texture(Coordinates::new(200.0, 0.0)),
            Err(SoilError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            service.texture(Coordinates::new(0.0, -95.0)),
            Err(SoilError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_hydraulics_complete() {
        let model = recording(false);
        let service = service_with(Some(model.clone()));
        let outcome = service.hydraulics(point(), "0-5cm").unwrap();

        assert!(outcome.is_complete(), "{:?}", outcome.error);
        assert_eq!(outcome.texture.as_ref().unwrap().clay_percent, 18.0);

        let soil_match = outcome.soil_match.as_ref().unwrap();
        assert_eq!(soil_match.normalized_code, "0004");
        assert_eq!(*model.codes.lock().unwrap(), vec!["0004".to_string()]);

        let report = outcome.report.as_ref().unwrap();
        assert_eq!(report.merged.saturated_water_content, Some(0.43));
        assert_eq!(report.merged.available_water, Some(0.18));
        assert_eq!(report.merged.saturated_conductivity, Some(150.0));
        assert_eq!(outcome.model_fields["texture"], "loam");
    }

    #[test]
    fn test_hydraulics_unknown_depth() {
        let service = service_with(Some(recording(false)));
        let outcome = service.hydraulics(point(), "60-100cm").unwrap();

        assert!(matches!(
            outcome.error,
            Some(SoilError::DepthNotFound { ref depth, .. }) if depth == "60-100cm"
        ));
        assert!(outcome.texture.is_none());
    }

    #[test]
    fn test_hydraulics_depth_without_data() {
        let service = service_with(Some(recording(false)));
        let outcome = service.hydraulics(point(), "30-60cm").unwrap();

        match outcome.error {
            Some(SoilError::DepthNotFound { available, .. }) => {
                assert_eq!(available, vec!["0-5cm", "5-15cm", "15-30cm"]);
            }
            other => panic!("expected DepthNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_hydraulics_model_failure_keeps_partial_fields() {
        let service = service_with(Some(recording(true)));
        let outcome = service.hydraulics(point(), "5-15cm").unwrap();

        assert!(matches!(outcome.error, Some(SoilError::ModelFailed(_))));
        assert!(outcome.texture.is_some());
        assert_eq!(outcome.soil_match.unwrap().normalized_code, "0004");
        assert!(outcome.report.is_none());
    }

    #[test]
    fn test_hydraulics_without_model() {
        let service = service_with(None);
        let outcome = service.hydraulics(point(), "0-5cm").unwrap();
        assert!(matches!(outcome.error, Some(SoilError::ModelUnavailable)));
        assert!(outcome.soil_match.is_some());
    }

    #[test]
    fn test_hydraulics_missing_table() {
        let temp_dir = TempDir::new().unwrap();
        let service = SoilServiceBuilder::new()
            .source(Arc::new(LoamSource))
            .soil_table_path(temp_dir.path().join("missing.json"))
            .model(recording(false))
            .build()
            .unwrap();

        assert!(service.soil_table().is_none());
        let outcome = service.hydraulics(point(), "0-5cm").unwrap();
        assert!(matches!(
            outcome.error,
            Some(SoilError::SoilTableNotFound { .. })
        ));
        assert!(outcome.texture.is_some());
    }

    #[test]
    fn test_table_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BUNDLED.as_bytes()).unwrap();

        let service = SoilServiceBuilder::new()
            .source(Arc::new(LoamSource))
            .soil_table_path(file.path())
            .build()
            .unwrap();
        assert_eq!(service.soil_table().unwrap().len(), 12);
    }

    #[test]
    fn test_malformed_table_fails_build() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let result = SoilServiceBuilder::new()
            .source(Arc::new(LoamSource))
            .soil_table_path(file.path())
            .build();
        assert!(matches!(result, Err(SoilError::Json(_))));
    }

    #[test]
    fn test_from_env_model() {
        let orig_cmd = std::env::var("SOILTEX_MODEL_CMD").ok();
        let orig_table = std::env::var("SOILTEX_SOIL_TABLE").ok();

        std::env::set_var("SOILTEX_MODEL_CMD", "/opt/models/vg-model");
        std::env::set_var("SOILTEX_SOIL_TABLE", "/etc/soiltex/table.json");

        let builder = SoilServiceBuilder::from_env();
        assert!(builder.model.is_some());
        assert_eq!(
            builder.table_candidates[0],
            PathBuf::from("/etc/soiltex/table.json")
        );

        match orig_cmd {
            Some(v) => std::env::set_var("SOILTEX_MODEL_CMD", v),
            None => std::env::remove_var("SOILTEX_MODEL_CMD"),
        }
        match orig_table {
            Some(v) => std::env::set_var("SOILTEX_SOIL_TABLE", v),
            None => std::env::remove_var("SOILTEX_SOIL_TABLE"),
        }
    }
}
