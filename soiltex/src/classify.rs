//! Nearest-class lookup against a static soil texture table.
//!
//! The table maps a soil class code to reference clay/silt/sand
//! percentages. A sample is assigned the class minimising the sum of
//! absolute differences over all three fractions. Ties go to the first
//! code in lexicographic order.
//!
//! # Table Format
//!
//! ```json
//! {
//!   "4": { "name": "loam", "clay": 18.0, "silt": 40.0, "sand": 42.0 },
//!   "12": { "name": "clay", "clay": 65.0, "silt": 20.0, "sand": 15.0 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoilError};

/// File name of the bundled table.
pub const SOIL_TABLE_FILE: &str = "soil_texture.json";

/// Length every class code is normalized to.
pub const CODE_LENGTH: usize = 4;

/// Reference composition of one soil class, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureFractions {
    pub clay: f64,
    pub silt: f64,
    pub sand: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TextureFractions {
    /// Sum of absolute differences against a sample.
    fn distance(&self, clay: f64, silt: f64, sand: f64) -> f64 {
        (self.clay - clay).abs() + (self.silt - silt).abs() + (self.sand - sand).abs()
    }
}

/// Result of a table lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilMatch {
    /// Table key as stored.
    pub code: String,
    /// Key normalized to [`CODE_LENGTH`] characters.
    pub normalized_code: String,
    pub distance: f64,
    pub name: Option<String>,
}

/// Immutable soil class table.
#[derive(Debug, Clone, Default)]
pub struct SoilTextureTable {
    entries: BTreeMap<String, TextureFractions>,
}

impl SoilTextureTable {
    pub fn from_entries(entries: BTreeMap<String, TextureFractions>) -> Self {
        Self { entries }
    }

    /// Parse a table from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, TextureFractions> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Load a table from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load the first candidate path that exists.
    ///
    /// # Errors
    ///
    /// [`SoilError::SoilTableNotFound`] if no candidate exists; parse errors
    /// of the first existing candidate are returned as-is.
    pub fn locate(candidates: &[PathBuf]) -> Result<(Self, PathBuf)> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Ok((Self::from_path(path)?, path.clone())),
            None => Err(SoilError::SoilTableNotFound {
                searched: candidates.to_vec(),
            }),
        }
    }

    /// Installation-relative locations searched for the bundled table:
    /// `<exe dir>/data/soil_texture.json`, then `./data/soil_texture.json`.
    pub fn default_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(dir.join("data").join(SOIL_TABLE_FILE));
        }
        candidates.push(PathBuf::from("data").join(SOIL_TABLE_FILE));
        candidates
    }

    /// Find the class closest to a sample.
    ///
    /// `sand` is derived as `100 - clay - silt`.
    ///
    /// # Errors
    ///
    /// [`SoilError::EmptySoilTable`] if the table has no entries.
    pub fn classify(&self, clay_percent: f64, silt_percent: f64) -> Result<SoilMatch> {
        let sand_percent = 100.0 - clay_percent - silt_percent;

        let mut best: Option<(&String, &TextureFractions, f64)> = None;
        for (code, fractions) in &self.entries {
            let d = fractions.distance(clay_percent, silt_percent, sand_percent);
            if best.map_or(true, |(_, _, best_d)| d < best_d) {
                best = Some((code, fractions, d));
            }
        }

        let (code, fractions, distance) = best.ok_or(SoilError::EmptySoilTable)?;
        Ok(SoilMatch {
            code: code.clone(),
            normalized_code: normalize_code(code),
            distance,
            name: fractions.name.clone(),
        })
    }

    pub fn get(&self, code: &str) -> Option<&TextureFractions> {
        self.entries.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TextureFractions)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a class code to exactly [`CODE_LENGTH`] characters.
///
/// Longer codes are truncated, shorter ones left-padded with `0`.
///
/// ```
/// use soiltex::classify::normalize_code;
///
/// assert_eq!(normalize_code("7"), "0007");
/// assert_eq!(normalize_code("1234"), "1234");
/// assert_eq!(normalize_code("123456"), "1234");
/// ```
pub fn normalize_code(code: &str) -> String {
    let truncated: String = code.chars().take(CODE_LENGTH).collect();
    format!("{:0>width$}", truncated, width = CODE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const BUNDLED: &str = include_str!("../../data/soil_texture.json");

    fn bundled() -> SoilTextureTable {
        SoilTextureTable::from_json_str(BUNDLED).unwrap()
    }

    fn entry(clay: f64, silt: f64, sand: f64) -> TextureFractions {
        TextureFractions {
            clay,
            silt,
            sand,
            name: None,
        }
    }

    #[test]
    fn test_bundled_table_loads() {
        let table = bundled();
        assert_eq!(table.len(), 12);
        for (_, f) in table.iter() {
            assert!((f.clay + f.silt + f.sand - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_classify_exact_match() {
        let table = bundled();
        let m = table.classify(18.0, 40.0).unwrap();
        assert_eq!(m.code, "4");
        assert_eq!(m.normalized_code, "0004");
        assert_eq!(m.name.as_deref(), Some("loam"));
        assert_eq!(m.distance, 0.0);
    }

    #[test]
    fn test_classify_is_nearest() {
        let table = bundled();
        for clay in (0..=100).step_by(5) {
            for silt in (0..=(100 - clay)).step_by(5) {
                let (clay, silt) = (clay as f64, silt as f64);
                let sand = 100.0 - clay - silt;
                let m = table.classify(clay, silt).unwrap();
                assert!(table.get(&m.code).is_some());
                for (_, f) in table.iter() {
                    assert!(m.distance <= f.distance(clay, silt, sand) + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_tie_goes_to_first_key() {
        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), entry(20.0, 40.0, 40.0));
        entries.insert("a".to_string(), entry(20.0, 40.0, 40.0));
        let table = SoilTextureTable::from_entries(entries);

        assert_eq!(table.classify(20.0, 40.0).unwrap().code, "a");
    }

    #[test]
    fn test_empty_table() {
        let table = SoilTextureTable::default();
        assert!(matches!(
            table.classify(20.0, 40.0),
            Err(SoilError::EmptySoilTable)
        ));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(""), "0000");
        assert_eq!(normalize_code("12"), "0012");
        assert_eq!(normalize_code("abcd"), "abcd");
        assert_eq!(normalize_code("abcdef"), "abcd");
        assert_eq!(normalize_code("粘土壤土类"), "粘土壤土");
    }

    #[test]
    fn test_locate_first_existing() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BUNDLED.as_bytes()).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.json");
        let candidates = vec![missing, file.path().to_path_buf()];

        let (table, path) = SoilTextureTable::locate(&candidates).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(path, file.path());
    }

    #[test]
    fn test_locate_none_found() {
        let temp_dir = TempDir::new().unwrap();
        let candidates = vec![temp_dir.path().join("a.json"), temp_dir.path().join("b.json")];
        let err = SoilTextureTable::locate(&candidates).unwrap_err();
        assert!(matches!(err, SoilError::SoilTableNotFound { searched } if searched.len() == 2));
    }

    #[test]
    fn test_malformed_table() {
        assert!(matches!(
            SoilTextureTable::from_json_str("{\"1\": {\"clay\": \"x\"}}"),
            Err(SoilError::Json(_))
        ));
    }
}
