//! Tracker trigger configuration and the lookup memories it selects.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use trigger_model::{Result, TriggerError};

use crate::memory::{self, LookupMemory};

/// Address and data widths of the five tracker memories
pub const LAYER_MEMORY_SHAPE: (u32, u32) = (9, 2);
pub const ROW_MEMORY_SHAPE: (u32, u32) = (8, 2);
pub const ZONE_ROW_MEMORY_SHAPE: (u32, u32) = (12, 3);
pub const QUADRANT_MEMORY_SHAPE: (u32, u32) = (5, 1);
pub const TRACK_CLASS_MEMORY_SHAPE: (u32, u32) = (4, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A9D2 layer projection memory file; built from `layer_min_multiplicity` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_table: Option<PathBuf>,

    /// A8D2 sliding zone row projection memory file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_table: Option<PathBuf>,

    /// A12D3 zone row projection memory file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_row_table: Option<PathBuf>,

    /// Hit layers needed on the inner (or outer) half for the IO code
    pub layer_min_multiplicity: u32,

    /// Hit layers needed in a zone quadrant for it to count toward the track class
    pub quadrant_min_multiplicity: u32,

    /// When set, a quadrant counts when two of its hit layers are at most this
    /// many empty layers apart, replacing the multiplicity rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadrant_max_gap: Option<u32>,

    /// Hit matrix buffers kept for reuse
    pub matrix_pool_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            layer_table: None,
            row_table: None,
            zone_row_table: None,
            layer_min_multiplicity: 2,
            quadrant_min_multiplicity: 3,
            quadrant_max_gap: None,
            matrix_pool_size: 4,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.layer_min_multiplicity == 0 || self.layer_min_multiplicity > 5 {
            return Err(TriggerError::config(format!(
                "tracker.layer_min_multiplicity must be in 1..=5, got {}",
                self.layer_min_multiplicity
            )));
        }
        if self.quadrant_min_multiplicity == 0 || self.quadrant_min_multiplicity > QUADRANT_MEMORY_SHAPE.0 {
            return Err(TriggerError::config(format!(
                "tracker.quadrant_min_multiplicity must be in 1..={}, got {}",
                QUADRANT_MEMORY_SHAPE.0, self.quadrant_min_multiplicity
            )));
        }
        if let Some(gap) = self.quadrant_max_gap {
            if gap + 2 > QUADRANT_MEMORY_SHAPE.0 {
                return Err(TriggerError::config(format!(
                    "tracker.quadrant_max_gap must be at most {}, got {gap}",
                    QUADRANT_MEMORY_SHAPE.0 - 2
                )));
            }
        }
        if self.matrix_pool_size == 0 {
            return Err(TriggerError::config("tracker.matrix_pool_size must be positive"));
        }
        Ok(())
    }
}

/// The lookup memories used by zone and sliding zone evaluation
#[derive(Debug, Clone)]
pub struct TrackerMemories {
    /// Layer projection to IO code
    pub layer: LookupMemory,
    /// Sliding zone row projection to LR code
    pub row: LookupMemory,
    /// Zone row projection to RML code
    pub zone_row: LookupMemory,
    /// Quadrant layer projection to a presence bit
    pub quadrant: LookupMemory,
    /// Quadrant word to track class
    pub track_class: LookupMemory,
}

impl TrackerMemories {
    /// Memories generated from the default configuration.
    pub fn defaults() -> Result<Self> {
        Self::from_config(&TrackerConfig::default())
    }

    /// Memories named by the configuration, generated where no file is given.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        let layer = match &config.layer_table {
            Some(path) => load_shaped(path, "layer", LAYER_MEMORY_SHAPE)?,
            None => memory::layer_io(config.layer_min_multiplicity)?,
        };
        let row = match &config.row_table {
            Some(path) => load_shaped(path, "row", ROW_MEMORY_SHAPE)?,
            None => memory::row_lr()?,
        };
        let zone_row = match &config.zone_row_table {
            Some(path) => load_shaped(path, "zone row", ZONE_ROW_MEMORY_SHAPE)?,
            None => memory::zone_row_rml()?,
        };
        let quadrant = match config.quadrant_max_gap {
            Some(gap) => memory::max_gap(QUADRANT_MEMORY_SHAPE.0, gap)?,
            None => memory::min_multiplicity(QUADRANT_MEMORY_SHAPE.0, config.quadrant_min_multiplicity)?,
        };
        let track_class = memory::track_class_a4d2()?;
        let memories = Self { layer, row, zone_row, quadrant, track_class };
        memories.validate()?;
        info!(
            "Tracker memories ready (layer: {}, row: {}, zone row: {}, quadrant: {})",
            memories.layer.description(),
            memories.row.description(),
            memories.zone_row.description(),
            memories.quadrant.description()
        );
        Ok(memories)
    }

    pub fn validate(&self) -> Result<()> {
        self.layer.expect_shape("layer", LAYER_MEMORY_SHAPE.0, LAYER_MEMORY_SHAPE.1)?;
        self.row.expect_shape("row", ROW_MEMORY_SHAPE.0, ROW_MEMORY_SHAPE.1)?;
        self.zone_row.expect_shape("zone row", ZONE_ROW_MEMORY_SHAPE.0, ZONE_ROW_MEMORY_SHAPE.1)?;
        self.quadrant.expect_shape("quadrant", QUADRANT_MEMORY_SHAPE.0, QUADRANT_MEMORY_SHAPE.1)?;
        self.track_class.expect_shape("track class", TRACK_CLASS_MEMORY_SHAPE.0, TRACK_CLASS_MEMORY_SHAPE.1)
    }

    /// Write every memory under `dir` in the text format, returning the paths written.
    pub fn store_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(5);
        for (name, memory) in [
            ("layer_io.mem", &self.layer),
            ("row_lr.mem", &self.row),
            ("zone_row_rml.mem", &self.zone_row),
            ("quadrant.mem", &self.quadrant),
            ("track_class.mem", &self.track_class),
        ] {
            let path = dir.join(name);
            memory.store(&path)?;
            written.push(path);
        }
        Ok(written)
    }
}

fn load_shaped(path: &Path, name: &str, (address_bits, data_bits): (u32, u32)) -> Result<LookupMemory> {
    let memory = LookupMemory::load(path)?;
    memory.expect_shape(name, address_bits, data_bits)?;
    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_memories_have_expected_shapes() {
        let memories = TrackerMemories::defaults().unwrap();
        assert_eq!(memories.layer.address_bits(), 9);
        assert_eq!(memories.zone_row.data_bits(), 3);
        assert_eq!(memories.quadrant.fetch(0b00111).unwrap(), 1);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let config = TrackerConfig { quadrant_min_multiplicity: 6, ..TrackerConfig::default() };
        assert!(matches!(config.validate(), Err(TriggerError::Configuration(_))));
        let config = TrackerConfig { matrix_pool_size: 0, ..TrackerConfig::default() };
        assert!(TrackerMemories::from_config(&config).is_err());
    }

    #[test]
    fn quadrant_gap_rule_replaces_multiplicity() {
        let config = TrackerConfig { quadrant_max_gap: Some(1), ..TrackerConfig::default() };
        let memories = TrackerMemories::from_config(&config).unwrap();
        assert_eq!(memories.quadrant.fetch(0b00101).unwrap(), 1);
        assert_eq!(memories.quadrant.fetch(0b01001).unwrap(), 0);
        assert_eq!(memories.quadrant.fetch(0b00100).unwrap(), 0);
        assert!(memories.quadrant.description().contains("maximum gap 1"));

        let config = TrackerConfig { quadrant_max_gap: Some(4), ..TrackerConfig::default() };
        assert!(matches!(config.validate(), Err(TriggerError::Configuration(_))));
    }

    #[test]
    fn table_files_override_generated_memories() {
        let dir = tempfile::tempdir().unwrap();
        let memories = TrackerMemories::defaults().unwrap();
        let written = memories.store_all(dir.path()).unwrap();
        assert_eq!(written.len(), 5);

        let config = TrackerConfig {
            layer_table: Some(dir.path().join("layer_io.mem")),
            row_table: Some(dir.path().join("row_lr.mem")),
            ..TrackerConfig::default()
        };
        let loaded = TrackerMemories::from_config(&config).unwrap();
        assert_eq!(loaded.layer.fetch(0b000111000).unwrap(), 0b11);
        assert_eq!(loaded.row.fetch(0b1000_0001).unwrap(), 0b11);
    }

    #[test]
    fn wrongly_shaped_table_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mem");
        memory::row_lr().unwrap().store(&path).unwrap();
        let config = TrackerConfig { layer_table: Some(path), ..TrackerConfig::default() };
        assert!(matches!(TrackerMemories::from_config(&config), Err(TriggerError::Configuration(_))));
    }
}
