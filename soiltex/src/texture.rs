//! Texture aggregation across the four topsoil layers.
//!
//! One aggregation issues 12 independent lookups (3 properties × 4 depths)
//! on a dedicated pool of [`WORKER_THREADS`] OS threads. Every task owns its
//! own result slot; the slots are folded by depth once all tasks joined.
//!
//! A depth is reported only when all three fractions resolved and their sum
//! is positive. Anything else drops that depth from the result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coords::Coordinates;
use crate::error::{Result, SoilError};
use crate::property::{Depth, TextureProperty};
use crate::source::{CoverageRequest, PropertyReading, PropertySource};

/// Size of the fetch pool used per aggregation.
pub const WORKER_THREADS: usize = 4;

/// Texture composition of one soil layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    pub depth: Depth,
    /// Raw clay value in `unit`.
    pub clay_content: f64,
    /// Raw sand value in `unit`.
    pub sand_content: f64,
    /// Raw silt value in `unit`.
    pub silt_content: f64,
    /// Sum of the three raw values.
    pub total: f64,
    pub clay_percent: f64,
    pub sand_percent: f64,
    pub silt_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl SoilSample {
    /// Build a sample from raw contents.
    ///
    /// Returns `None` if the contents do not sum to a positive total.
    /// Percentages are rounded to two decimals.
    ///
    /// ```
    /// use soiltex::{Depth, SoilSample};
    ///
    /// let sample = SoilSample::from_contents(Depth::D0To5, 200.0, 500.0, 300.0, None).unwrap();
    /// assert_eq!(sample.clay_percent, 20.0);
    /// assert!(SoilSample::from_contents(Depth::D0To5, 0.0, 0.0, 0.0, None).is_none());
    /// ```
    pub fn from_contents(
        depth: Depth,
        clay: f64,
        sand: f64,
        silt: f64,
        unit: Option<String>,
    ) -> Option<Self> {
        let total = clay + sand + silt;
        if !total.is_finite() || total <= 0.0 {
            return None;
        }

        Some(Self {
            depth,
            clay_content: clay,
            sand_content: sand,
            silt_content: silt,
            total,
            clay_percent: round_dp(clay / total * 100.0, 2),
            sand_percent: round_dp(sand / total * 100.0, 2),
            silt_percent: round_dp(silt / total * 100.0, 2),
            unit,
        })
    }
}

/// Outcome of one `(property, depth)` task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub property: TextureProperty,
    pub depth: Depth,
    pub reading: Option<PropertyReading>,
}

/// Fans texture lookups out over a bounded worker pool.
pub struct TextureAggregator {
    source: Arc<dyn PropertySource>,
    workers: usize,
}

impl TextureAggregator {
    pub fn new(source: Arc<dyn PropertySource>) -> Self {
        Self {
            source,
            workers: WORKER_THREADS,
        }
    }

    /// Texture per depth at `point`, in canonical depth order.
    ///
    /// # Errors
    ///
    /// Only fails if the worker pool cannot be created. Individual lookup
    /// failures are logged and drop the affected depth.
    pub fn aggregate(&self, point: Coordinates) -> Result<Vec<SoilSample>> {
        let tasks: Vec<CoverageRequest> = TextureProperty::ALL
            .iter()
            .flat_map(|&property| {
                Depth::ALL
                    .iter()
                    .map(move |&depth| CoverageRequest::new(property, depth, point))
            })
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("soiltex-fetch-{}", i))
            .build()
            .map_err(|e| SoilError::WorkerPool(e.to_string()))?;

        let start = Instant::now();
        let results: Vec<TaskResult> = pool.install(|| {
            tasks
                .par_iter()
                .map(|request| self.run_task(request))
                .collect()
        });

        let samples = assemble(&results);
        tracing::info!(
            longitude = point.longitude,
            latitude = point.latitude,
            depths = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Texture aggregation complete"
        );

        Ok(samples)
    }

    fn run_task(&self, request: &CoverageRequest) -> TaskResult {
        let reading = match self.source.fetch(request) {
            Ok(reading) => Some(reading),
            Err(e) => {
                tracing::warn!(
                    coverage_id = %request.coverage_id(),
                    error = %e,
                    "Coverage lookup failed"
                );
                None
            }
        };

        TaskResult {
            property: request.property,
            depth: request.depth,
            reading,
        }
    }
}

/// Fold task results into per-depth samples.
///
/// Depths missing any property, or whose contents sum to zero, are
/// omitted and logged.
pub fn assemble(results: &[TaskResult]) -> Vec<SoilSample> {
    let mut by_depth: BTreeMap<Depth, BTreeMap<TextureProperty, &PropertyReading>> =
        BTreeMap::new();
    for result in results {
        if let Some(reading) = &result.reading {
            by_depth
                .entry(result.depth)
                .or_default()
                .insert(result.property, reading);
        }
    }

    let mut samples = Vec::new();
    for depth in Depth::ALL {
        let readings = by_depth.remove(&depth).unwrap_or_default();
        let value = |p: TextureProperty| readings.get(&p).map(|r| r.value);

        let (Some(clay), Some(sand), Some(silt)) = (
            value(TextureProperty::Clay),
            value(TextureProperty::Sand),
            value(TextureProperty::Silt),
        ) else {
            let missing: Vec<&str> = TextureProperty::ALL
                .iter()
                .filter(|p| !readings.contains_key(*p))
                .map(|p| p.service_id())
                .collect();
            tracing::warn!(depth = %depth, ?missing, "Dropping depth with incomplete texture");
            continue;
        };

        let unit = readings.values().next().map(|r| r.unit.clone());
        match SoilSample::from_contents(depth, clay, sand, silt, unit) {
            Some(sample) => samples.push(sample),
            None => tracing::warn!(depth = %depth, "Dropping depth with non-positive texture total"),
        }
    }

    samples
}

/// Round `value` to `places` decimal places.
pub(crate) fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed values per property; `fail` lists (property, depth) pairs that error.
    struct FakeSource {
        fail: Vec<(TextureProperty, Depth)>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(fail: Vec<(TextureProperty, Depth)>) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PropertySource for FakeSource {
        fn fetch(&self, request: &CoverageRequest) -> Result<PropertyReading> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(&(request.property, request.depth)) {
                return Err(SoilError::NoData {
                    coverage_id: request.coverage_id(),
                });
            }
            let value = match request.property {
                TextureProperty::Clay => 250.0,
                TextureProperty::Sand => 400.0,
                TextureProperty::Silt => 350.0,
            };
            Ok(PropertyReading {
                value,
                unit: "g/kg".to_string(),
            })
        }
    }

    fn point() -> Coordinates {
        Coordinates::new(115.0, 30.5)
    }

    #[test]
    fn test_all_depths_present() {
        let source = Arc::new(FakeSource::new(vec![]));
        let aggregator = TextureAggregator::new(source.clone());
        let samples = aggregator.aggregate(point()).unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 12);
        let depths: Vec<Depth> = samples.iter().map(|s| s.depth).collect();
        assert_eq!(depths, Depth::ALL.to_vec());

        let first = &samples[0];
        assert_eq!(first.total, 1000.0);
        assert_eq!(first.clay_percent, 25.0);
        assert_eq!(first.sand_percent, 40.0);
        assert_eq!(first.silt_percent, 35.0);
        assert_eq!(first.unit.as_deref(), Some("g/kg"));
    }

    #[test]
    fn test_depth_with_missing_property_is_dropped() {
        let source = Arc::new(FakeSource::new(vec![
            (TextureProperty::Sand, Depth::D5To15),
            (TextureProperty::Clay, Depth::D30To60),
            (TextureProperty::Silt, Depth::D30To60),
        ]));
        let samples = TextureAggregator::new(source).aggregate(point()).unwrap();

        let depths: Vec<Depth> = samples.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![Depth::D0To5, Depth::D15To30]);
    }

    #[test]
    fn test_every_lookup_failing_gives_empty_list() {
        let fail = TextureProperty::ALL
            .iter()
            .flat_map(|&p| Depth::ALL.iter().map(move |&d| (p, d)))
            .collect();
        let samples = TextureAggregator::new(Arc::new(FakeSource::new(fail)))
            .aggregate(point())
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_zero_total_is_dropped() {
        let zero = |property| TaskResult {
            property,
            depth: Depth::D0To5,
            reading: Some(PropertyReading {
                value: 0.0,
                unit: "g/kg".to_string(),
            }),
        };
        let results: Vec<TaskResult> = TextureProperty::ALL.iter().map(|&p| zero(p)).collect();
        assert!(assemble(&results).is_empty());
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let cases = [
            (1.0, 1.0, 1.0),
            (123.0, 456.0, 421.0),
            (17.0, 3.0, 980.0),
            (333.0, 333.0, 334.0),
        ];
        for (clay, sand, silt) in cases {
            let s = SoilSample::from_contents(Depth::D0To5, clay, sand, silt, None).unwrap();
            let sum = s.clay_percent + s.sand_percent + s.silt_percent;
            assert!((sum - 100.0).abs() <= 0.011, "sum {} for {:?}", sum, (clay, sand, silt));
        }
    }

    #[test]
    fn test_sample_serializes_response_fields() {
        let sample = SoilSample::from_contents(Depth::D15To30, 200.0, 500.0, 300.0, None).unwrap();
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["depth"], "15-30cm");
        for key in [
            "clay_content",
            "sand_content",
            "silt_content",
            "total",
            "clay_percent",
            "sand_percent",
            "silt_percent",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("unit").is_none());
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(33.33333, 2), 33.33);
        assert_eq!(round_dp(0.18000000000000002, 3), 0.18);
    }
}
