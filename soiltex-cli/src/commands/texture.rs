use anyhow::{Context, Result};
use soiltex::Coordinates;
use std::path::PathBuf;

use super::build_service;

pub fn run(
    table: Option<PathBuf>,
    model: Option<PathBuf>,
    lon: f64,
    lat: f64,
    json: bool,
) -> Result<()> {
    let service = build_service(table, model)?;

    let samples = service
        .texture(Coordinates::new(lon, lat))
        .context("Failed to get soil texture")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
        return Ok(());
    }

    if samples.is_empty() {
        println!("no data");
        return Ok(());
    }

    println!(
        "{:<8} {:>8} {:>8} {:>8}",
        "depth", "clay %", "sand %", "silt %"
    );
    for s in &samples {
        println!(
            "{:<8} {:>8.2} {:>8.2} {:>8.2}",
            s.depth, s.clay_percent, s.sand_percent, s.silt_percent
        );
    }

    Ok(())
}
