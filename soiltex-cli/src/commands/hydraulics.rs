use anyhow::{Context, Result};
use serde::Serialize;
use soiltex::{Coordinates, HydraulicProperties, SoilSample};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::build_service;

#[derive(Serialize)]
struct HydraulicsOutput {
    lon: f64,
    lat: f64,
    depth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    texture: Option<SoilSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soil_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soil_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hydraulic_properties: Option<HydraulicProperties>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    per_model: BTreeMap<String, HydraulicProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(
    table: Option<PathBuf>,
    model: Option<PathBuf>,
    lon: f64,
    lat: f64,
    depth: &str,
    json: bool,
) -> Result<()> {
    let service = build_service(table, model)?;

    let outcome = service
        .hydraulics(Coordinates::new(lon, lat), depth)
        .context("Failed to get soil hydraulics")?;

    let (soil_code, soil_class) = match outcome.soil_match {
        Some(m) => (Some(m.normalized_code), m.name),
        None => (None, None),
    };
    let (merged, per_model) = match outcome.report {
        Some(r) => (Some(r.merged), r.per_model),
        None => (None, BTreeMap::new()),
    };
    let output = HydraulicsOutput {
        lon,
        lat,
        depth: outcome.depth,
        texture: outcome.texture,
        soil_code,
        soil_class,
        hydraulic_properties: merged,
        per_model,
        error: outcome.error.map(|e| e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Location:   {}, {}", output.lon, output.lat);
    println!("Depth:      {}", output.depth);
    if let Some(t) = &output.texture {
        println!(
            "Texture:    clay {:.2}%  sand {:.2}%  silt {:.2}%",
            t.clay_percent, t.sand_percent, t.silt_percent
        );
    }
    if let Some(code) = &output.soil_code {
        println!(
            "Soil class: {} ({})",
            code,
            output.soil_class.as_deref().unwrap_or("unnamed")
        );
    }
    if let Some(p) = &output.hydraulic_properties {
        print_metric("Saturated water content", p.saturated_water_content);
        print_metric("Field capacity", p.field_capacity);
        print_metric("Wilting point", p.wilting_point);
        print_metric("Available water", p.available_water);
        print_metric("Saturated conductivity", p.saturated_conductivity);
        print_metric("van Genuchten alpha", p.van_genuchten_alpha);
        print_metric("van Genuchten n", p.van_genuchten_n);
    }
    if let Some(error) = &output.error {
        println!("Error:      {}", error);
    }

    Ok(())
}

pub fn print_metric(label: &str, value: Option<f64>) {
    match value {
        Some(v) => println!("  {:<24} {}", label, v),
        None => println!("  {:<24} -", label),
    }
}
