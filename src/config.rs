//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the ring-sizer.toml file.
//! It provides a centralized way to configure the calibration reference object, the
//! screen density plausibility range and where calibration state is stored.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{DEFAULT_MAX_PPI, DEFAULT_MIN_PPI, REFERENCE_CARD_LENGTH_MM};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "ring-sizer.toml";

/// Application configuration loaded from ring-sizer.toml
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Screen calibration settings
    pub calibration: CalibrationConfig,
    /// Calibration persistence settings
    pub storage: StorageConfig,
}

/// Screen calibration settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Physical length of the reference object edge the user matches on screen.
    /// Defaults to the long edge of an ID-1 (credit) card.
    pub reference_length_mm: f64,
    /// Lowest effective screen density accepted without a warning
    pub min_ppi: i64,
    /// Highest effective screen density accepted without a warning
    pub max_ppi: i64,
}

/// Calibration persistence settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding persisted key-value state
    pub path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            reference_length_mm: REFERENCE_CARD_LENGTH_MM,
            min_ppi: DEFAULT_MIN_PPI,
            max_ppi: DEFAULT_MAX_PPI,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from("ring-sizer-state.json"),
        }
    }
}

impl Config {
    /// Load configuration from ring-sizer.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    warn!("Invalid config file format in {}: {}", path.display(), e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file at {}, using default configuration", path.display());
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    // reference length must be a positive divisor; the PPI range must be ordered
    fn sanitized(mut self) -> Self {
        let defaults = CalibrationConfig::default();
        let length = self.calibration.reference_length_mm;
        if !(length.is_finite() && length > 0.0) {
            warn!("Ignoring reference_length_mm = {}, using {}", length, defaults.reference_length_mm);
            self.calibration.reference_length_mm = defaults.reference_length_mm;
        }
        if self.calibration.min_ppi > self.calibration.max_ppi {
            warn!(
                "Ignoring inverted PPI range {}..{}, using {}..{}",
                self.calibration.min_ppi, self.calibration.max_ppi, defaults.min_ppi, defaults.max_ppi
            );
            self.calibration.min_ppi = defaults.min_ppi;
            self.calibration.max_ppi = defaults.max_ppi;
        }
        self
    }
}
