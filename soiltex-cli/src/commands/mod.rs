pub mod batch;
pub mod classify;
pub mod extract;
pub mod hydraulics;
pub mod texture;

use anyhow::{Context, Result};
use soiltex::{CommandModel, SoilService, SoilServiceBuilder};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the service from the environment, with command-line overrides.
///
/// Flags replace the corresponding environment settings only when given.
pub fn build_service(table: Option<PathBuf>, model: Option<PathBuf>) -> Result<SoilService> {
    let mut builder = SoilServiceBuilder::from_env();

    if let Some(table) = table {
        builder = builder.soil_table_path(table);
    }
    if let Some(model) = model {
        builder = builder.model(Arc::new(CommandModel::new(model)));
    }

    builder.build().context("Failed to create soil service")
}
