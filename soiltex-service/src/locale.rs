//! Localized field labels for hydraulics responses.
//!
//! Response data is always keyed by the English field names; the labels
//! map those keys to display text in the requested language.

use std::collections::BTreeMap;

use serde::Deserialize;
use utoipa::ToSchema;

/// Display language for response labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

/// (field, English, Chinese)
const LABELS: &[(&str, &str, &str)] = &[
    ("location", "Location", "位置"),
    ("longitude", "Longitude", "经度"),
    ("latitude", "Latitude", "纬度"),
    ("depth", "Depth", "深度"),
    ("texture", "Soil texture", "土壤质地"),
    ("clay_percent", "Clay (%)", "粘粒含量(%)"),
    ("sand_percent", "Sand (%)", "砂粒含量(%)"),
    ("silt_percent", "Silt (%)", "粉粒含量(%)"),
    ("soil_code", "Soil class code", "土壤类型代码"),
    ("soil_class", "Soil class", "土壤类型"),
    ("hydraulic_properties", "Hydraulic properties", "水力特性"),
    ("merged", "All models", "综合结果"),
    ("per_model", "Per model", "各模型结果"),
    ("model_fields", "Model fields", "模型字段"),
    ("saturated_water_content", "Saturated water content", "饱和含水量"),
    ("field_capacity", "Field capacity", "田间持水量"),
    ("wilting_point", "Wilting point", "凋萎点"),
    ("saturated_conductivity", "Saturated conductivity", "饱和导水率"),
    ("van_genuchten_alpha", "van Genuchten alpha", "van Genuchten α"),
    ("van_genuchten_n", "van Genuchten n", "van Genuchten n"),
    ("available_water", "Available water", "有效水含量"),
    ("error", "Error", "错误"),
];

/// Field name → label in `lang`.
pub fn labels(lang: Lang) -> BTreeMap<&'static str, &'static str> {
    LABELS
        .iter()
        .map(|&(field, en, zh)| {
            let label = match lang {
                Lang::En => en,
                Lang::Zh => zh,
            };
            (field, label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_cover_both_languages() {
        let en = labels(Lang::En);
        let zh = labels(Lang::Zh);
        assert_eq!(en.len(), zh.len());
        assert_eq!(en["field_capacity"], "Field capacity");
        assert_eq!(zh["field_capacity"], "田间持水量");
    }

    #[test]
    fn test_lang_deserialize() {
        let lang: Lang = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(lang, Lang::Zh);
        assert_eq!(Lang::default(), Lang::En);
    }
}
