use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use soiltex::{Coordinates, SoilSample};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::build_service;

const TEXTURE_COLUMNS: [&str; 4] = ["depth", "clay_percent", "sand_percent", "silt_percent"];

pub fn run(
    table: Option<PathBuf>,
    model: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
    lon_col: String,
    lat_col: String,
) -> Result<()> {
    let service = build_service(table, model)?;

    let file = File::open(&input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_path = output.unwrap_or_else(|| default_output(&input));
    let output_file = File::create(&output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(TEXTURE_COLUMNS);
    writer.write_record(&new_headers)?;

    for record in records {
        let lon: f64 = record
            .get(lon_idx)
            .context("Missing longitude")?
            .parse()
            .context("Invalid longitude")?;
        let lat: f64 = record
            .get(lat_idx)
            .context("Missing latitude")?
            .parse()
            .context("Invalid latitude")?;

        let samples = match service.texture(Coordinates::new(lon, lat)) {
            Ok(samples) => samples,
            Err(e) => {
                pb.println(format!("{}, {}: {}", lon, lat, e));
                Vec::new()
            }
        };

        // One row per depth; a point without data keeps one row with empty columns
        if samples.is_empty() {
            let mut new_record: Vec<&str> = record.iter().collect();
            new_record.extend(["", "", "", ""]);
            writer.write_record(&new_record)?;
        }
        for sample in &samples {
            let values = texture_values(sample);
            let mut new_record: Vec<&str> = record.iter().collect();
            new_record.extend(values.iter().map(String::as_str));
            writer.write_record(&new_record)?;
        }

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_texture.csv", stem))
}

fn texture_values(sample: &SoilSample) -> [String; 4] {
    [
        sample.depth.to_string(),
        format!("{:.2}", sample.clay_percent),
        format!("{:.2}", sample.sand_percent),
        format!("{:.2}", sample.silt_percent),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use soiltex::Depth;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("/data/points.csv")),
            PathBuf::from("/data/points_texture.csv")
        );
    }

    #[test]
    fn test_texture_values() {
        let sample = SoilSample::from_contents(Depth::D15To30, 250.0, 375.0, 375.0, None).unwrap();
        assert_eq!(texture_values(&sample), ["15-30cm", "25.00", "37.50", "37.50"]);
    }
}
