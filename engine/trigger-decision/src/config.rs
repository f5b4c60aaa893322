//! Configuration for the calorimeter trigger and the coincidence stage

use serde::{Deserialize, Serialize};
use trigger_model::{Result, TriggerError, HTM_MAX};

/// Calorimeter trigger decision settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaloTriggerConfig {
    /// Minimum summed multiplicity of both main walls for a calorimeter decision
    pub total_multiplicity_threshold: u8,

    /// Veto ticks where only one main wall has zoning activity
    pub inhibit_single_side: bool,

    /// Veto ticks where both main walls have zoning activity
    pub inhibit_both_side: bool,
}

impl Default for CaloTriggerConfig {
    fn default() -> Self {
        Self { total_multiplicity_threshold: 1, inhibit_single_side: false, inhibit_both_side: false }
    }
}

impl CaloTriggerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.total_multiplicity_threshold == 0 || self.total_multiplicity_threshold > 2 * HTM_MAX {
            return Err(TriggerError::config(format!(
                "calorimeter.total_multiplicity_threshold must be in 1..={}, got {}",
                2 * HTM_MAX,
                self.total_multiplicity_threshold
            )));
        }
        if self.inhibit_single_side && self.inhibit_both_side {
            return Err(TriggerError::config(
                "calorimeter.inhibit_single_side and inhibit_both_side cannot both be set",
            ));
        }
        Ok(())
    }
}

/// Calorimeter/tracker alignment settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoincidenceConfig {
    /// Front-end latency, in 1600 ns ticks, added to calorimeter ticks
    pub pipeline_shift_ticks: u32,

    /// 1600 ns ticks a positive calorimeter decision stays open after its own tick
    pub calorimeter_gate_size: u32,

    /// A calorimeter zone also opens the next zone of the same side
    pub active_next_zone: bool,

    /// Longest decision span of one event, in 1600 ns ticks; longer events abort
    pub max_event_span_ticks: u32,
}

impl Default for CoincidenceConfig {
    fn default() -> Self {
        Self {
            pipeline_shift_ticks: 1,
            calorimeter_gate_size: 4,
            active_next_zone: false,
            max_event_span_ticks: 4096,
        }
    }
}

impl CoincidenceConfig {
    /// Longest gate accepted
    pub const MAX_GATE_SIZE: u32 = 64;
    pub const MAX_PIPELINE_SHIFT: u32 = 16;

    pub fn validate(&self) -> Result<()> {
        if self.pipeline_shift_ticks > Self::MAX_PIPELINE_SHIFT {
            return Err(TriggerError::config(format!(
                "coincidence.pipeline_shift_ticks must be at most {}, got {}",
                Self::MAX_PIPELINE_SHIFT,
                self.pipeline_shift_ticks
            )));
        }
        if self.calorimeter_gate_size > Self::MAX_GATE_SIZE {
            return Err(TriggerError::config(format!(
                "coincidence.calorimeter_gate_size must be at most {}, got {}",
                Self::MAX_GATE_SIZE,
                self.calorimeter_gate_size
            )));
        }
        if self.max_event_span_ticks <= self.calorimeter_gate_size {
            return Err(TriggerError::config(format!(
                "coincidence.max_event_span_ticks must exceed the calorimeter gate size {}, got {}",
                self.calorimeter_gate_size, self.max_event_span_ticks
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        CaloTriggerConfig::default().validate().unwrap();
        CoincidenceConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_configuration_errors() {
        let calo = CaloTriggerConfig { total_multiplicity_threshold: 0, ..Default::default() };
        assert!(matches!(calo.validate(), Err(TriggerError::Configuration(_))));
        let calo = CaloTriggerConfig { inhibit_single_side: true, inhibit_both_side: true, ..Default::default() };
        assert!(calo.validate().is_err());
        let coinc = CoincidenceConfig { calorimeter_gate_size: 65, ..Default::default() };
        assert!(coinc.validate().is_err());
        let coinc = CoincidenceConfig { max_event_span_ticks: 4, ..Default::default() };
        assert!(coinc.validate().is_err());
    }
}
