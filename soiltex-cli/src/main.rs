use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Soil texture and hydraulics CLI tool
#[derive(Parser)]
#[command(name = "soiltex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Soil class table (JSON); overrides SOILTEX_SOIL_TABLE and the default paths
    #[arg(short, long, global = true)]
    table: Option<PathBuf>,

    /// Moisture model executable; overrides the SOILTEX_MODEL_* settings
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Texture composition per depth at a coordinate
    Texture {
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Soil class and hydraulic properties at one depth
    Hydraulics {
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Soil layer: 0-5cm, 5-15cm, 15-30cm or 30-60cm
        #[arg(short, long, default_value = "0-5cm")]
        depth: String,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Match clay and silt percentages to a soil class
    Classify {
        /// Clay percentage
        #[arg(long)]
        clay: f64,

        /// Silt percentage
        #[arg(long)]
        silt: f64,
    },

    /// Extract hydraulic properties from a saved model output file
    Extract {
        /// Model output file
        file: PathBuf,
    },

    /// Texture per depth for every coordinate in a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_texture.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Texture { lon, lat, json } => {
            commands::texture::run(cli.table, cli.model, lon, lat, json)
        }
        Commands::Hydraulics {
            lon,
            lat,
            depth,
            json,
        } => commands::hydraulics::run(cli.table, cli.model, lon, lat, &depth, json),
        Commands::Classify { clay, silt } => commands::classify::run(cli.table, clay, silt),
        Commands::Extract { file } => commands::extract::run(&file),
        Commands::Batch {
            input,
            output,
            lon_col,
            lat_col,
        } => commands::batch::run(cli.table, cli.model, input, output, lon_col, lat_col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restore(key: &str, value: Option<String>) {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    #[test]
    fn test_env_settings_are_not_overrides() {
        let orig_cmd = std::env::var("SOILTEX_MODEL_CMD").ok();
        let orig_table = std::env::var("SOILTEX_SOIL_TABLE").ok();

        std::env::set_var("SOILTEX_MODEL_CMD", "/opt/vg-model");
        std::env::set_var("SOILTEX_SOIL_TABLE", "/etc/soiltex/table.json");

        // Left to SoilServiceBuilder::from_env, which also reads the model args and name
        let cli =
            Cli::try_parse_from(["soiltex", "classify", "--clay", "10", "--silt", "20"]).unwrap();
        assert!(cli.model.is_none());
        assert!(cli.table.is_none());

        restore("SOILTEX_MODEL_CMD", orig_cmd);
        restore("SOILTEX_SOIL_TABLE", orig_table);
    }

    #[test]
    fn test_explicit_flags_override() {
        let cli = Cli::try_parse_from([
            "soiltex",
            "hydraulics",
            "--lon",
            "-93.6",
            "--lat",
            "42.0",
            "--model",
            "/opt/other-model",
            "--table",
            "table.json",
        ])
        .unwrap();
        assert_eq!(cli.model, Some(PathBuf::from("/opt/other-model")));
        assert_eq!(cli.table, Some(PathBuf::from("table.json")));
        assert!(matches!(
            cli.command,
            Commands::Hydraulics { lon, ref depth, .. } if lon == -93.6 && depth == "0-5cm"
        ));
    }
}
