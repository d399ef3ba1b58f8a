use anyhow::{Context, Result};
use soiltex::HydraulicProperties;
use std::path::Path;

use super::hydraulics::print_metric;

pub fn run(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let props = HydraulicProperties::from_text(&text);
    if props.is_empty() {
        println!("No hydraulic properties found in {}", file.display());
        return Ok(());
    }

    print_metric("Saturated water content", props.saturated_water_content);
    print_metric("Field capacity", props.field_capacity);
    print_metric("Wilting point", props.wilting_point);
    print_metric("Available water", props.available_water);
    print_metric("Saturated conductivity", props.saturated_conductivity);
    print_metric("van Genuchten alpha", props.van_genuchten_alpha);
    print_metric("van Genuchten n", props.van_genuchten_n);

    Ok(())
}
