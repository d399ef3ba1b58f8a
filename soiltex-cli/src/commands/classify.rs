use anyhow::{bail, Context, Result};
use soiltex::SoilTextureTable;
use std::path::PathBuf;

pub fn run(table: Option<PathBuf>, clay: f64, silt: f64) -> Result<()> {
    if clay + silt > 100.0 {
        bail!("Clay and silt add up to more than 100%: {} + {}", clay, silt);
    }

    let table = match table {
        Some(path) => SoilTextureTable::from_path(&path)
            .with_context(|| format!("Failed to load soil table {}", path.display()))?,
        None => {
            let mut candidates = SoilTextureTable::default_candidates();
            if let Ok(path) = std::env::var("SOILTEX_SOIL_TABLE") {
                candidates.insert(0, PathBuf::from(path));
            }
            let (table, _) = SoilTextureTable::locate(&candidates)
                .context("Soil table not found. Use --table or set SOILTEX_SOIL_TABLE")?;
            table
        }
    };

    let m = table.classify(clay, silt)?;
    println!(
        "{} {} (distance {:.2})",
        m.normalized_code,
        m.name.as_deref().unwrap_or("unnamed"),
        m.distance
    );

    Ok(())
}
