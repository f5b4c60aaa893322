//! Calorimeter trigger: one summary record per 25 ns tick from the crate words.

use channel_map::layout::AUX_CALO_CRATE_ID;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trigger_model::{CaloCtw, CaloCtwData, Clocktick, Result, TriggerError, TriggerRecord, HTM_MAX, NSIDES};

use crate::config::CaloTriggerConfig;

/// X-wall zones of the auxiliary crate, per side
const XWALL_ZONES: [u16; NSIDES] = [0b0011, 0b1100];
/// Gamma-veto zones of the auxiliary crate sit above the x-wall zones.
const GVETO_ZONE_SHIFT: u16 = 4;
const GVETO_ZONE_MASK: u16 = 0b1111;

pub const XT_INFO_XWALL_SIDE_0: u8 = 0;
pub const XT_INFO_XWALL_SIDE_1: u8 = 1;
pub const XT_INFO_EXTERNAL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaloTriggerRecord {
    pub clocktick_25ns: Clocktick,
    /// Main wall zoning word per side
    pub zoning_word: [u16; NSIDES],
    /// Main wall multiplicity per side, saturating
    pub total_multiplicity: [u8; NSIDES],
    pub gveto_zoning_word: u8,
    /// Auxiliary crate multiplicity
    pub total_multiplicity_gveto: u8,
    pub lto: [bool; NSIDES],
    pub lto_gveto: bool,
    /// Bit 0 x-wall side 0, bit 1 x-wall side 1, bit 2 external trigger
    pub xt_info: u8,
    /// Zoning activity on exactly one main wall
    pub single_side_coinc: bool,
    pub total_multiplicity_threshold: bool,
    pub decision: bool,
}

impl CaloTriggerRecord {
    pub fn is_empty(&self) -> bool {
        self.zoning_word == [0; NSIDES]
            && self.total_multiplicity == [0; NSIDES]
            && self.gveto_zoning_word == 0
            && self.total_multiplicity_gveto == 0
            && self.lto == [false; NSIDES]
            && !self.lto_gveto
            && self.xt_info == 0
    }

    fn add_main_wall(&mut self, side: usize, ctw: &CaloCtw) {
        self.zoning_word[side] |= ctw.zoning_word();
        self.total_multiplicity[side] = (self.total_multiplicity[side] + ctw.htm()).min(HTM_MAX);
        self.lto[side] |= ctw.is_lto();
        if ctw.is_xt() {
            self.xt_info |= 1 << XT_INFO_EXTERNAL;
        }
    }

    fn add_aux_crate(&mut self, ctw: &CaloCtw) {
        let zoning = ctw.zoning_word();
        for (side, mask) in XWALL_ZONES.iter().enumerate() {
            if zoning & mask != 0 {
                self.xt_info |= 1 << side;
            }
        }
        self.gveto_zoning_word |= (zoning >> GVETO_ZONE_SHIFT & GVETO_ZONE_MASK) as u8;
        self.total_multiplicity_gveto = (self.total_multiplicity_gveto + ctw.htm()).min(HTM_MAX);
        self.lto_gveto |= ctw.is_lto();
        if ctw.is_xt() {
            self.xt_info |= 1 << XT_INFO_EXTERNAL;
        }
    }
}

pub struct CaloTriggerAlgorithm {
    config: CaloTriggerConfig,
}

impl CaloTriggerAlgorithm {
    pub fn new(config: CaloTriggerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CaloTriggerConfig {
        &self.config
    }

    /// Record for one 25 ns tick built from the crate words at that tick.
    pub fn record_at(&self, ctws: &CaloCtwData, clocktick: Clocktick) -> Result<CaloTriggerRecord> {
        self.build_record(clocktick, ctws.at_clocktick(clocktick))
    }

    fn build_record<'a>(
        &self,
        clocktick: Clocktick,
        words: impl IntoIterator<Item = &'a CaloCtw>,
    ) -> Result<CaloTriggerRecord> {
        let mut record = CaloTriggerRecord { clocktick_25ns: clocktick, ..Default::default() };
        for ctw in words {
            match ctw.eid().crate_id() {
                crate_id if (crate_id as usize) < NSIDES => record.add_main_wall(crate_id as usize, ctw),
                AUX_CALO_CRATE_ID => record.add_aux_crate(ctw),
                other => return Err(TriggerError::range("calorimeter crate", other, AUX_CALO_CRATE_ID + 1)),
            }
        }
        self.decide(&mut record);
        Ok(record)
    }

    fn decide(&self, record: &mut CaloTriggerRecord) {
        let active_sides = record.zoning_word.iter().filter(|&&word| word != 0).count();
        record.single_side_coinc = active_sides == 1;
        let total: u8 = record.total_multiplicity.iter().sum();
        record.total_multiplicity_threshold = total >= self.config.total_multiplicity_threshold;
        let inhibited = (self.config.inhibit_single_side && active_sides == 1)
            || (self.config.inhibit_both_side && active_sides == NSIDES);
        record.decision = record.total_multiplicity_threshold && !inhibited;
    }

    /// One record per 25 ns tick between the first and last crate word.
    pub fn process(&self, ctws: &CaloCtwData) -> Result<Vec<CaloTriggerRecord>> {
        let (Some(min), Some(max)) = (ctws.clocktick_min(), ctws.clocktick_max()) else {
            return Ok(Vec::new());
        };
        let index = ctws.tick_index();
        let records = (min..=max)
            .map(|ct| self.build_record(ct, index.at(ct).iter().copied()))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "calorimeter trigger: {} ticks [{min}, {max}], {} positive",
            records.len(),
            records.iter().filter(|r| r.decision).count()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_model::{DetectorType, Eid};

    fn ctw(crate_id: u8, clocktick: Clocktick, htm: u8, zones: &[usize]) -> CaloCtw {
        let mut ctw = CaloCtw::new(Eid::crate_level(DetectorType::MainCalo, 5, crate_id), clocktick).unwrap();
        ctw.add_htm(htm).unwrap();
        for &zone in zones {
            ctw.set_zoning_bit(zone).unwrap();
        }
        ctw
    }

    fn data(words: Vec<CaloCtw>) -> CaloCtwData {
        let mut data = CaloCtwData::new();
        for w in words {
            data.push(w).unwrap();
        }
        data.finalize().unwrap();
        data
    }

    #[test]
    fn one_record_per_tick_in_the_span() {
        let algo = CaloTriggerAlgorithm::new(CaloTriggerConfig::default()).unwrap();
        let records = algo.process(&data(vec![ctw(1, 100, 1, &[3]), ctw(0, 103, 1, &[0])])).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].zoning_word, [0, 1 << 3]);
        assert_eq!(records[0].total_multiplicity, [0, 1]);
        assert!(records[0].single_side_coinc && records[0].decision);
        assert!(records[1].is_empty() && !records[1].decision);
        assert_eq!(records[3].zoning_word, [1, 0]);
    }

    #[test]
    fn threshold_and_inhibits() {
        let both = data(vec![ctw(0, 7, 2, &[1]), ctw(1, 7, 3, &[8])]);

        let algo = CaloTriggerAlgorithm::new(CaloTriggerConfig::default()).unwrap();
        let record = algo.record_at(&both, 7).unwrap();
        assert_eq!(record.total_multiplicity, [2, 3]);
        assert!(!record.single_side_coinc && record.decision);

        let config = CaloTriggerConfig { inhibit_both_side: true, ..Default::default() };
        let algo = CaloTriggerAlgorithm::new(config).unwrap();
        assert!(!algo.record_at(&both, 7).unwrap().decision);

        let config = CaloTriggerConfig { total_multiplicity_threshold: 6, ..Default::default() };
        let algo = CaloTriggerAlgorithm::new(config).unwrap();
        let record = algo.record_at(&both, 7).unwrap();
        assert!(!record.total_multiplicity_threshold && !record.decision);
    }

    #[test]
    fn auxiliary_crate_feeds_xwall_and_gveto_fields() {
        let algo = CaloTriggerAlgorithm::new(CaloTriggerConfig::default()).unwrap();
        let mut aux = ctw(AUX_CALO_CRATE_ID, 2, 1, &[2, 6]);
        aux.set_xt(true).unwrap();
        let record = algo.record_at(&data(vec![aux]), 2).unwrap();
        assert_eq!(record.xt_info, 0b110);
        assert_eq!(record.gveto_zoning_word, 0b0100);
        assert_eq!(record.total_multiplicity_gveto, 1);
        // main walls are silent
        assert!(!record.decision);
    }

    #[test]
    fn empty_collection_gives_no_records() {
        let algo = CaloTriggerAlgorithm::new(CaloTriggerConfig::default()).unwrap();
        assert!(algo.process(&data(Vec::new())).unwrap().is_empty());
    }
}
