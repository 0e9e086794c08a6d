//! Pipeline configuration.
//!
//! All knobs have defaults matching the standard intraday setup; a TOML
//! file can override any subset, and CLI flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window length: preceding minutes fed into the model per sample.
    pub lookback_size: usize,
    /// Fraction of windows used for training; the remainder splits 2:1
    /// between validation and test.
    pub train_fraction: f64,
    /// Days containing a target at or above this magnitude are dropped.
    pub target_max_threshold: f64,
    /// Market open hour for the minute-of-day feature.
    pub market_open_hour: i64,
    /// Minute offset of the open within that hour (09:30 -> 30).
    pub market_open_offset_minutes: i64,
    /// Base directory for saved dataset artifacts.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_size: 60,
            train_fraction: 0.8,
            target_max_threshold: 0.03,
            market_open_hour: 9,
            market_open_offset_minutes: 30,
            output_dir: PathBuf::from("exported_data/datasets"),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }
}
