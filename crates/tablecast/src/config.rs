//! JSON pipeline configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tablecast_calib::CalibratorParams;
use tablecast_template::TemplateParams;
use tablecast_track::TrackerParams;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Every tunable of the pipeline. Missing sections fall back to defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Canvas size, rotation mode, surface and lens settings.
    pub calibration: CalibratorParams,
    pub template: TemplateParams,
    pub tracker: TrackerParams,
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
