//! The external soil-moisture model.
//!
//! The model is an opaque executable: it receives a 4-character soil class
//! code and prints its results. Two stdout shapes are accepted:
//!
//! - a JSON object `{"outputs": {"<model>": "<text>", ...}, "fields": {...}}`
//!   where `fields` holds anything the model already computed itself;
//! - anything else, taken as the free-text output of a single model.
//!
//! Invocation is synchronous and has no timeout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoilError};

/// Everything one model invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    /// Free-text output keyed by model name.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// Structured values reported directly by the model.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ModelRun {
    pub fn is_empty(&self) -> bool {
        self.outputs.values().all(|t| t.trim().is_empty()) && self.fields.is_empty()
    }
}

/// A soil-moisture model that can be run for a soil class code.
pub trait MoistureModel: Send + Sync {
    fn run(&self, soil_code: &str) -> Result<ModelRun>;
}

/// Runs the model as a child process.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandModel {
    /// Model executed as `program <soil_code>`.
    ///
    /// Plain-text output is attributed to a model named after the
    /// program's file stem.
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        let program = program.as_ref().to_path_buf();
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        Self {
            program,
            args: Vec::new(),
            name,
        }
    }

    /// Fixed arguments placed before the soil code.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Name used for plain-text output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn parse_stdout(&self, stdout: &str) -> ModelRun {
        if let Ok(run) = serde_json::from_str::<ModelRun>(stdout.trim()) {
            if !run.outputs.is_empty() || !run.fields.is_empty() {
                return run;
            }
        }

        let mut outputs = BTreeMap::new();
        outputs.insert(self.name.clone(), stdout.to_string());
        ModelRun {
            outputs,
            fields: BTreeMap::new(),
        }
    }
}

impl MoistureModel for CommandModel {
    fn run(&self, soil_code: &str) -> Result<ModelRun> {
        tracing::debug!(
            program = %self.program.display(),
            soil_code = soil_code,
            "Running moisture model"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(soil_code)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SoilError::ModelFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let run = self.parse_stdout(&stdout);
        if run.is_empty() {
            return Err(SoilError::ModelFailed("empty result".to_string()));
        }

        Ok(run)
    }
}
