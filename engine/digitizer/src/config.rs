//! Configuration for the digitizer

use std::path::Path;

use serde::{Deserialize, Serialize};
use trigger_model::{Result, TriggerError};

use crate::clock::ClockConfig;

/// Amplitude cutoffs of the calorimeter front-end discriminators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaloThresholds {
    /// Signals below this amplitude produce no trigger primitive
    pub threshold_low: f64,

    /// Signals at or above this amplitude count in the multiplicity
    pub threshold_high: f64,
}

impl Default for CaloThresholds {
    fn default() -> Self {
        Self { threshold_low: 0.05, threshold_high: 0.15 }
    }
}

impl CaloThresholds {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold_low.is_finite() && self.threshold_high.is_finite()) {
            return Err(TriggerError::config("calorimeter thresholds must be finite"));
        }
        if self.threshold_low < 0.0 || self.threshold_low > self.threshold_high {
            return Err(TriggerError::config(format!(
                "calorimeter thresholds must satisfy 0 <= low <= high, got low={} high={}",
                self.threshold_low, self.threshold_high
            )));
        }
        Ok(())
    }
}

/// Configuration for the digitization stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigitizerConfig {
    pub clock: ClockConfig,
    #[serde(default)]
    pub calorimeter: CaloThresholds,
}

impl DigitizerConfig {
    pub fn validate(&self) -> Result<()> {
        self.clock.validate()?;
        self.calorimeter.validate()
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DigitizerConfig =
            toml::from_str(&content).map_err(|e| TriggerError::config(format!("invalid digitizer config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TriggerError::config(format!("cannot serialize digitizer config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
