//! Extraction of hydraulic properties from moisture-model text output.
//!
//! The model prints one quantity per line next to a fixed marker. Each
//! line is scanned independently for every marker; a value that fails to
//! parse is simply left out.
//!
//! | Marker | Property | Token |
//! |--------|----------|-------|
//! | `qs =` | saturated water content | first after marker |
//! | `33KPa` | field capacity | last on line |
//! | `15000KPa` | wilting point | last on line |
//! | `Ks =` | saturated conductivity | first after marker, `<base>e+<exp>` allowed |
//! | `a =` | van Genuchten alpha | first after marker |
//! | `Therefore n =`, `n =` | van Genuchten n | first after marker |
//!
//! Available water is derived as `field_capacity - wilting_point`, rounded
//! to three decimals, whenever both are known.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::texture::round_dp;

const SATURATED_WATER_MARKER: &str = "qs =";
const FIELD_CAPACITY_MARKER: &str = "33KPa";
const WILTING_POINT_MARKER: &str = "15000KPa";
const CONDUCTIVITY_MARKER: &str = "Ks =";
const ALPHA_MARKER: &str = "a =";
const N_MARKER_LONG: &str = "Therefore n =";
const N_MARKER: &str = "n =";

/// Hydraulic properties found in model output. Absent metrics are `None`
/// and are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydraulicProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_water_content: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wilting_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_conductivity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub van_genuchten_alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub van_genuchten_n: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_water: Option<f64>,
}

impl HydraulicProperties {
    /// Scan model output text.
    ///
    /// ```
    /// use soiltex::HydraulicProperties;
    ///
    /// let props = HydraulicProperties::from_text("  qs = 0.42 (cm3/cm3)\n  Ks = 1.5e+02 cm/day");
    /// assert_eq!(props.saturated_water_content, Some(0.42));
    /// assert_eq!(props.saturated_conductivity, Some(150.0));
    /// ```
    pub fn from_text(text: &str) -> Self {
        let mut props = Self::default();
        for line in text.lines() {
            props.scan_line(line);
        }
        props.derive_available_water();
        props
    }

    fn scan_line(&mut self, line: &str) {
        if let Some(v) = token_after(line, SATURATED_WATER_MARKER).and_then(parse_float) {
            self.saturated_water_content = Some(v);
        }
        if line.contains(FIELD_CAPACITY_MARKER) {
            if let Some(v) = last_token(line).and_then(parse_float) {
                self.field_capacity = Some(v);
            }
        }
        if line.contains(WILTING_POINT_MARKER) {
            if let Some(v) = last_token(line).and_then(parse_float) {
                self.wilting_point = Some(v);
            }
        }
        if let Some(v) = token_after(line, CONDUCTIVITY_MARKER).and_then(parse_conductivity) {
            self.saturated_conductivity = Some(v);
        }
        if let Some(v) = token_after(line, ALPHA_MARKER).and_then(parse_float) {
            self.van_genuchten_alpha = Some(v);
        }
        let n_token = token_after(line, N_MARKER_LONG).or_else(|| token_after(line, N_MARKER));
        if let Some(v) = n_token.and_then(parse_float) {
            self.van_genuchten_n = Some(v);
        }
    }

    fn derive_available_water(&mut self) {
        self.available_water = match (self.field_capacity, self.wilting_point) {
            (Some(fc), Some(wp)) => Some(round_dp(fc - wp, 3)),
            _ => None,
        };
    }

    /// Overlay the metrics present in `other` onto `self`.
    ///
    /// `available_water` is recomputed from the merged inputs.
    pub fn merge(&mut self, other: &HydraulicProperties) {
        self.saturated_water_content = other
            .saturated_water_content
            .or(self.saturated_water_content);
        self.field_capacity = other.field_capacity.or(self.field_capacity);
        self.wilting_point = other.wilting_point.or(self.wilting_point);
        self.saturated_conductivity = other
            .saturated_conductivity
            .or(self.saturated_conductivity);
        self.van_genuchten_alpha = other.van_genuchten_alpha.or(self.van_genuchten_alpha);
        self.van_genuchten_n = other.van_genuchten_n.or(self.van_genuchten_n);
        self.derive_available_water();
    }

    /// True if no metric was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Properties per model plus the merged view across all models.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HydraulicReport {
    /// All models folded in name order; later models win per metric.
    pub merged: HydraulicProperties,
    pub per_model: BTreeMap<String, HydraulicProperties>,
}

/// Extract properties from every model's output.
pub fn extract_all(outputs: &BTreeMap<String, String>) -> HydraulicReport {
    let mut report = HydraulicReport::default();
    for (model, text) in outputs {
        let props = HydraulicProperties::from_text(text);
        report.merged.merge(&props);
        report.per_model.insert(model.clone(), props);
    }
    report
}

fn token_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let idx = line.find(marker)?;
    line[idx + marker.len()..].split_whitespace().next()
}

fn last_token(line: &str) -> Option<&str> {
    line.split_whitespace().last()
}

fn parse_float(token: &str) -> Option<f64> {
    token.parse().ok()
}

/// Parse `<base>e+<exp>` as `base * 10^exp`, anything else as a float.
fn parse_conductivity(token: &str) -> Option<f64> {
    match token.split_once("e+") {
        Some((base, exp)) => {
            let base: f64 = base.parse().ok()?;
            let exp: i32 = exp.parse().ok()?;
            Some(base * 10f64.powi(exp))
        }
        None => parse_float(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OUTPUT: &str = "\
Soil class 0008
  qs = 0.42 (cm3/cm3)
  Water content at 33KPa: 0.28
  Water content at 15000KPa: 0.10
  Ks = 1.5e+02
  a = 0.019 (1/cm)
  m = 0.31, Therefore n = 1.45
";

    #[test]
    fn test_saturated_water_content() {
        let props = HydraulicProperties::from_text("  qs = 0.42 (cm3/cm3)");
        assert_eq!(props.saturated_water_content, Some(0.42));
    }

    #[test]
    fn test_available_water() {
        let props = HydraulicProperties::from_text(SAMPLE_OUTPUT);
        assert_eq!(props.field_capacity, Some(0.28));
        assert_eq!(props.wilting_point, Some(0.10));
        assert_eq!(props.available_water, Some(0.18));
    }

    #[test]
    fn test_full_output() {
        let props = HydraulicProperties::from_text(SAMPLE_OUTPUT);
        assert_eq!(props.saturated_conductivity, Some(150.0));
        assert_eq!(props.van_genuchten_alpha, Some(0.019));
        assert_eq!(props.van_genuchten_n, Some(1.45));
    }

    #[test]
    fn test_conductivity_forms() {
        assert_eq!(parse_conductivity("1.5e+02"), Some(150.0));
        assert_eq!(parse_conductivity("12.5"), Some(12.5));
        assert_eq!(parse_conductivity("2.0e-01"), Some(0.2));
        assert_eq!(parse_conductivity("xe+2"), None);
    }

    #[test]
    fn test_prefers_long_n_marker() {
        let props = HydraulicProperties::from_text("Therefore n = 1.6");
        assert_eq!(props.van_genuchten_n, Some(1.6));

        let props = HydraulicProperties::from_text("n = 1.3");
        assert_eq!(props.van_genuchten_n, Some(1.3));
    }

    #[test]
    fn test_parse_failures_are_skipped() {
        let props = HydraulicProperties::from_text(
            "qs = n/a\nKs = ???\nWater content at 33KPa: missing\n15000KPa 0.1",
        );
        assert_eq!(props.saturated_water_content, None);
        assert_eq!(props.saturated_conductivity, None);
        assert_eq!(props.field_capacity, None);
        assert_eq!(props.wilting_point, Some(0.1));
        assert_eq!(props.available_water, None);
    }

    #[test]
    fn test_empty_text() {
        let props = HydraulicProperties::from_text("");
        assert!(props.is_empty());
        assert_eq!(serde_json::to_string(&props).unwrap(), "{}");
    }

    #[test]
    fn test_extract_all_merges_in_name_order() {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "alpha_model".to_string(),
            "qs = 0.40\n33KPa 0.30\n15000KPa 0.12".to_string(),
        );
        outputs.insert("beta_model".to_string(), "qs = 0.45\n33KPa 0.32".to_string());

        let report = extract_all(&outputs);
        assert_eq!(report.per_model.len(), 2);
        assert_eq!(report.per_model["alpha_model"].available_water, Some(0.18));
        assert_eq!(report.per_model["beta_model"].available_water, None);

        assert_eq!(report.merged.saturated_water_content, Some(0.45));
        assert_eq!(report.merged.field_capacity, Some(0.32));
        assert_eq!(report.merged.wilting_point, Some(0.12));
        assert_eq!(report.merged.available_water, Some(0.2));
    }
}
