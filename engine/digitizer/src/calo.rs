//! Calorimeter trigger primitive and crate trigger word builders.

use std::collections::BTreeMap;

use channel_map::ChannelMap;
use tracing::{debug, trace};
use trigger_model::{
    CaloCtw, CaloCtwData, CaloTp, CaloTpBits, CaloTpData, ClockDomain, Clocktick, Depth, DetectorType, Eid,
    Result, TriggerRecord,
};

use crate::clock::EventClock;
use crate::config::CaloThresholds;
use crate::signals::CaloSignal;

/// Thresholds a signal amplitude into its TP contribution; `None` below the
/// low threshold.
pub fn discriminate(thresholds: &CaloThresholds, signal: &CaloSignal) -> Option<CaloTpBits> {
    let mut bits = if signal.amplitude >= thresholds.threshold_high {
        CaloTpBits::high_threshold()
    } else if signal.amplitude >= thresholds.threshold_low {
        CaloTpBits::low_threshold_only()
    } else {
        return None;
    };
    bits.xt = signal.external_trigger;
    Some(bits)
}

/// Calorimeter crates are addressed with the main-wall type tag: the
/// auxiliary crate hosts both X-wall and gamma-veto boards.
pub fn calo_crate_eid(board: &Eid) -> Eid {
    Eid::crate_level(DetectorType::MainCalo, board.rack(), board.crate_id())
}

/// Signals to calorimeter TPs, one per (board, 25 ns tick).
pub struct CaloTpBuilder<'a> {
    map: &'a ChannelMap,
    thresholds: CaloThresholds,
}

impl<'a> CaloTpBuilder<'a> {
    pub fn new(map: &'a ChannelMap, thresholds: CaloThresholds) -> Self {
        Self { map, thresholds }
    }

    /// Append the TPs of `signals` to `out`. Signals are taken in time order
    /// whatever their arrival order; a signal landing in an existing bucket
    /// is merged into it. Every signal is quantized and resolved before the
    /// threshold applies, so a bad time or id fails the event even when the
    /// amplitude is below threshold. Returns the number of signals above
    /// threshold.
    pub fn process(&self, clock: &EventClock, signals: &[CaloSignal], out: &mut CaloTpData) -> Result<usize> {
        let mut order: Vec<&CaloSignal> = signals.iter().collect();
        order.sort_by(|a, b| a.time_ns.total_cmp(&b.time_ns));

        let mut next_hit_id = out.len() as u32;
        let mut accepted = 0;
        for signal in order {
            let clocktick = clock.quantize(ClockDomain::Calo, signal.time_ns)?;
            let board = self.map.resolve_gid(&signal.gid)?.truncate(Depth::Board)?;
            let Some(contribution) = discriminate(&self.thresholds, signal) else {
                trace!("{} below low threshold ({})", signal.gid, signal.amplitude);
                continue;
            };

            match out.find_unlocked_mut(&board, clocktick) {
                Some(tp) => tp.update(&contribution)?,
                None => {
                    let tp = out.push(CaloTp::new(next_hit_id, board, clocktick)?)?;
                    tp.update(&contribution)?;
                    next_hit_id += 1;
                }
            }
            accepted += 1;
        }
        debug!("{} calo signals above threshold, {} TPs", accepted, out.len());
        Ok(accepted)
    }
}

/// Folds the TPs of each (crate, 25 ns tick) into one crate trigger word.
pub struct CaloCtwBuilder<'a> {
    map: &'a ChannelMap,
}

impl<'a> CaloCtwBuilder<'a> {
    pub fn new(map: &'a ChannelMap) -> Self {
        Self { map }
    }

    /// Build and lock the CTWs of an event. A (crate, tick) pair with no TP
    /// gets no word at all.
    pub fn process(&self, tps: &CaloTpData, out: &mut CaloCtwData) -> Result<()> {
        let mut buckets: BTreeMap<(Clocktick, Eid), Vec<&CaloTp>> = BTreeMap::new();
        for tp in tps {
            buckets.entry((tp.clocktick(), calo_crate_eid(&tp.eid()))).or_default().push(tp);
        }

        for ((clocktick, crate_eid), members) in buckets {
            let mut ctw = CaloCtw::new(crate_eid, clocktick)?;
            for tp in members {
                ctw.add_htm(tp.htm())?;
                if tp.bits().is_high_threshold() {
                    ctw.set_zoning_bit(self.map.zone_of(&tp.eid())?)?;
                }
                if tp.is_lto() {
                    ctw.set_lto(true)?;
                }
                if tp.is_xt() {
                    ctw.set_xt(true)?;
                }
            }
            trace!("{}", ctw);
            out.push(ctw)?;
        }
        out.finalize()
    }
}
