//! Emulator configuration management

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use digitizer::{CaloThresholds, ClockConfig, DigitizerConfig};
use tracker_trigger::TrackerConfig;
use trigger_decision::{CaloTriggerConfig, CoincidenceConfig};
use trigger_model::DetectorType;

/// Prefix of environment overrides, e.g. `TRIGGER__COINCIDENCE__PIPELINE_SHIFT_TICKS=2`
pub const ENV_PREFIX: &str = "TRIGGER";
pub const ENV_SEPARATOR: &str = "__";

/// Main emulator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Clock reference; every domain width must be given
    pub clock: ClockConfig,

    #[serde(default)]
    pub calorimeter: CalorimeterSection,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub coincidence: CoincidenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub run: RunSettings,
}

/// Front-end thresholds and calorimeter trigger settings, one table in the file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalorimeterSection {
    pub threshold_low: f64,
    pub threshold_high: f64,
    pub total_multiplicity_threshold: u8,
    pub inhibit_single_side: bool,
    pub inhibit_both_side: bool,
}

impl Default for CalorimeterSection {
    fn default() -> Self {
        let thresholds = CaloThresholds::default();
        let trigger = CaloTriggerConfig::default();
        Self {
            threshold_low: thresholds.threshold_low,
            threshold_high: thresholds.threshold_high,
            total_multiplicity_threshold: trigger.total_multiplicity_threshold,
            inhibit_single_side: trigger.inhibit_single_side,
            inhibit_both_side: trigger.inhibit_both_side,
        }
    }
}

impl CalorimeterSection {
    pub fn thresholds(&self) -> CaloThresholds {
        CaloThresholds { threshold_low: self.threshold_low, threshold_high: self.threshold_high }
    }

    pub fn trigger(&self) -> CaloTriggerConfig {
        CaloTriggerConfig {
            total_multiplicity_threshold: self.total_multiplicity_threshold,
            inhibit_single_side: self.inhibit_single_side,
            inhibit_both_side: self.inhibit_both_side,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}

/// Batch run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Worker threads, 0 for one per core
    pub threads: usize,

    /// Detector types registered in the channel map
    pub detectors: Vec<DetectorType>,

    /// Log progress every this many events, 0 to disable
    pub progress_every: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self { threads: 0, detectors: DetectorType::ALL.to_vec(), progress_every: 0 }
    }
}

impl RunSettings {
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

impl EmulatorConfig {
    pub fn digitizer(&self) -> DigitizerConfig {
        DigitizerConfig { clock: self.clock.clone(), calorimeter: self.calorimeter.thresholds() }
    }

    /// Check every section; component configs validate themselves.
    pub fn validate(&self) -> Result<()> {
        self.digitizer().validate()?;
        self.calorimeter.trigger().validate()?;
        self.tracker.validate()?;
        self.coincidence.validate()?;

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(anyhow!("Invalid log level: {}", other)),
        }
        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => {}
            other => return Err(anyhow!("Invalid log format: {}", other)),
        }
        if self.run.detectors.is_empty() {
            return Err(anyhow!("run.detectors must name at least one detector type"));
        }
        Ok(())
    }
}

/// Load configuration from an optional TOML file and `TRIGGER__*` environment variables.
///
/// Without a file the defaults are used as the base layer. A file replaces
/// the defaults entirely, so a clock domain width it leaves out stays unset
/// and fails validation.
pub fn load_config(path: Option<&Path>) -> Result<EmulatorConfig> {
    let mut builder = config::Config::builder();
    builder = match path {
        Some(path) => {
            tracing::debug!("Loading configuration from file: {:?}", path);
            builder.add_source(config::File::from(path).format(config::FileFormat::Toml).required(true))
        }
        None => builder.add_source(
            config::Config::try_from(&EmulatorConfig::default()).context("Failed to build default configuration")?,
        ),
    };
    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR).try_parsing(true))
        .build()
        .context("Failed to read configuration sources")?;

    let config: EmulatorConfig = settings.try_deserialize().context("Invalid configuration")?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &EmulatorConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write configuration to {:?}", path))?;
    Ok(())
}
