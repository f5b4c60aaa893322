//! Calorimeter/tracker coincidence on the 1600 ns trigger clock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracker_trigger::zones::zone_of_row;
use tracker_trigger::{TrackerRecord, ZONES_PER_SIDE};
use trigger_model::{ct25_to_ct1600, Clocktick, Gid, Result, NSIDES};

use crate::calo_algorithm::CaloTriggerRecord;
use crate::config::CoincidenceConfig;

const ZONE_MASK: u16 = (1 << ZONES_PER_SIDE) - 1;

/// Calorimeter activity open at one 1600 ns tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaloGate {
    pub zoning_word: [u16; NSIDES],
    pub total_multiplicity: [u8; NSIDES],
    pub lto: [bool; NSIDES],
    pub xt_info: u8,
    pub single_side_coinc: bool,
}

impl CaloGate {
    fn merge(&mut self, record: &CaloTriggerRecord) {
        for side in 0..NSIDES {
            self.zoning_word[side] |= record.zoning_word[side];
            self.total_multiplicity[side] = self.total_multiplicity[side].max(record.total_multiplicity[side]);
            self.lto[side] |= record.lto[side];
        }
        self.xt_info |= record.xt_info;
        self.single_side_coinc |= record.single_side_coinc;
    }
}

/// Trigger decision of one 1600 ns tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub clocktick_1600ns: Clocktick,
    pub calo_decision: bool,
    pub tracker_decision: bool,
    /// Calorimeter zoning open at this tick, after next-zone activation
    pub calo_zoning_word: [u16; NSIDES],
    /// Tracker zones with a non-VOID class
    pub tracker_zoning_word: [u16; NSIDES],
    /// Zones where both agree
    pub coincidence_zones: [u16; NSIDES],
    /// Hit cells lying in coincident zones
    pub hit_cells: Vec<Gid>,
    pub decision: bool,
}

impl DecisionRecord {
    pub fn coincident_zones(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..NSIDES).flat_map(move |side| {
            (0..ZONES_PER_SIDE).filter(move |&z| self.coincidence_zones[side] >> z & 1 == 1).map(move |z| (side, z))
        })
    }
}

pub struct CoincidenceAlgorithm {
    config: CoincidenceConfig,
}

impl CoincidenceAlgorithm {
    pub fn new(config: CoincidenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CoincidenceConfig {
        &self.config
    }

    /// 1600 ns tick at which a calorimeter tick meets the tracker.
    pub fn aligned_clocktick(&self, clocktick_25ns: Clocktick) -> Clocktick {
        ct25_to_ct1600(clocktick_25ns).saturating_add(self.config.pipeline_shift_ticks)
    }

    fn widen(&self, word: u16) -> u16 {
        if self.config.active_next_zone {
            (word | word << 1) & ZONE_MASK
        } else {
            word
        }
    }

    /// Positive calorimeter records merged per aligned tick and held open over the gate.
    pub fn calo_gates(&self, records: &[CaloTriggerRecord]) -> BTreeMap<Clocktick, CaloGate> {
        let mut gates: BTreeMap<Clocktick, CaloGate> = BTreeMap::new();
        for record in records.iter().filter(|r| r.decision) {
            let first = self.aligned_clocktick(record.clocktick_25ns);
            let last = first.saturating_add(self.config.calorimeter_gate_size);
            for clocktick in first..=last {
                gates.entry(clocktick).or_default().merge(record);
            }
        }
        for gate in gates.values_mut() {
            for word in &mut gate.zoning_word {
                *word = self.widen(*word);
            }
        }
        gates
    }

    /// Decision for one tick from the open calorimeter gate and the tracker record.
    pub fn evaluate(
        &self,
        clocktick: Clocktick,
        gate: Option<&CaloGate>,
        tracker: Option<&TrackerRecord>,
    ) -> DecisionRecord {
        let calo_zoning_word = gate.map(|g| g.zoning_word).unwrap_or_default();
        let tracker_zoning_word = tracker.map(|t| t.zoning_pattern).unwrap_or_default();
        let mut coincidence_zones = [0u16; NSIDES];
        for side in 0..NSIDES {
            coincidence_zones[side] = calo_zoning_word[side] & tracker_zoning_word[side];
        }
        let hit_cells = tracker
            .map(|t| {
                t.hit_cells
                    .iter()
                    .filter(|gid| match **gid {
                        Gid::TrackerCell { side, row, .. } => zone_of_row(row as usize)
                            .is_some_and(|z| coincidence_zones[side as usize] >> z & 1 == 1),
                        _ => false,
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        DecisionRecord {
            clocktick_1600ns: clocktick,
            calo_decision: gate.is_some(),
            tracker_decision: tracker.is_some_and(TrackerRecord::decision),
            calo_zoning_word,
            tracker_zoning_word,
            coincidence_zones,
            hit_cells,
            decision: coincidence_zones.iter().any(|&z| z != 0),
        }
    }
}
