use crate::generator::profile::SignalConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub rows: usize,
    pub columns: usize,
    pub chunk_rows: usize,
    pub frequency: f64,
    pub noise: f64,
    pub seed: u64,
    pub passes: usize,
    pub squared_line_length: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            rows: 256,
            columns: 4,
            chunk_rows: 32,
            frequency: 8.0,
            noise: 0.05,
            seed: 0,
            passes: 3,
            squared_line_length: false,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        rows: usize,
        columns: usize,
        chunk_rows: usize,
        seed: u64,
        passes: usize,
    ) -> anyhow::Result<Self> {
        let config = Self {
            rows,
            columns,
            chunk_rows,
            seed,
            passes,
            ..Default::default()
        };
        config.validate().context("validating command line workflow")?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.noise.is_finite() && self.noise >= 0.0,
            "noise amplitude must be finite and non-negative, got {}",
            self.noise
        );
        anyhow::ensure!(
            self.frequency.is_finite(),
            "frequency must be finite, got {}",
            self.frequency
        );
        anyhow::ensure!(self.chunk_rows > 0, "chunk_rows must be positive");
        Ok(())
    }

    pub fn to_signal_config(&self) -> SignalConfig {
        SignalConfig {
            rows: self.rows,
            columns: self.columns,
            frequency: self.frequency,
            noise: self.noise,
            seed: self.seed,
        }
    }
}
