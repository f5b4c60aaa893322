//! Geiger trigger primitive and crate trigger word builders.

use std::collections::BTreeMap;

use channel_map::ChannelMap;
use tracing::{debug, trace};
use trigger_model::{
    ClockDomain, Clocktick, Depth, Eid, GeigerCtw, GeigerCtwData, GeigerTp, GeigerTpData, Result, TriggerRecord,
};

use crate::clock::EventClock;
use crate::signals::GeigerSignal;

/// Cell signals to Geiger TPs, one per (front-end board, 800 ns tick).
pub struct GeigerTpBuilder<'a> {
    map: &'a ChannelMap,
}

impl<'a> GeigerTpBuilder<'a> {
    pub fn new(map: &'a ChannelMap) -> Self {
        Self { map }
    }

    pub fn process(&self, clock: &EventClock, signals: &[GeigerSignal], out: &mut GeigerTpData) -> Result<()> {
        let mut order: Vec<&GeigerSignal> = signals.iter().collect();
        order.sort_by(|a, b| a.time_ns.total_cmp(&b.time_ns));

        for signal in order {
            let clocktick = clock.quantize(ClockDomain::Tracker, signal.time_ns)?;
            let eid = self.map.resolve_gid(&signal.gid)?;
            let board = eid.truncate(Depth::Board)?;
            match out.find_unlocked_mut(&board, clocktick) {
                Some(tp) => tp.set_wire(eid.channel())?,
                None => out.push(GeigerTp::new(board, clocktick)?)?.set_wire(eid.channel())?,
            }
        }
        debug!("{} geiger signals, {} TPs", signals.len(), out.len());
        Ok(())
    }
}

/// Groups the Geiger TPs of each (crate, 800 ns tick) into one crate word.
pub struct GeigerCtwBuilder;

impl GeigerCtwBuilder {
    pub fn process(tps: &GeigerTpData, out: &mut GeigerCtwData) -> Result<()> {
        let mut buckets: BTreeMap<(Clocktick, Eid), Vec<&GeigerTp>> = BTreeMap::new();
        for tp in tps {
            let crate_eid = tp.eid().truncate(Depth::Crate)?;
            buckets.entry((tp.clocktick(), crate_eid)).or_default().push(tp);
        }
        for ((clocktick, crate_eid), members) in buckets {
            let mut ctw = GeigerCtw::new(crate_eid, clocktick)?;
            for tp in members {
                ctw.set_block(&tp.block())?;
            }
            trace!("{}", ctw);
            out.push(ctw)?;
        }
        out.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClocktickWidths;
    use trigger_model::Gid;

    fn cell(side: u8, layer: u8, row: u8, time_ns: f64) -> GeigerSignal {
        GeigerSignal { gid: Gid::TrackerCell { side, layer, row }, time_ns }
    }

    #[test]
    fn cells_round_trip_through_crate_words() {
        let map = channel_map::standard_channel_map().unwrap();
        let clock = EventClock::new(&ClocktickWidths::default(), 0.0, 0.0).unwrap();
        let signals = [
            cell(0, 3, 0, 100.0),
            cell(1, 8, 1, 200.0),
            cell(0, 3, 0, 300.0),
            cell(0, 0, 60, 400.0),
            cell(0, 5, 2, 900.0),
        ];
        let mut tps = GeigerTpData::new();
        GeigerTpBuilder::new(&map).process(&clock, &signals, &mut tps).unwrap();
        tps.finalize().unwrap();
        // rows 0-1 share a board; row 60 sits on crate 1; the last cell is one tick later
        assert_eq!(tps.len(), 3);

        let mut ctws = GeigerCtwData::new();
        GeigerCtwBuilder::process(&tps, &mut ctws).unwrap();
        assert_eq!(ctws.len(), 3);
        assert_eq!(ctws.at_clocktick(0).count(), 2);

        let first = ctws.at_clocktick_and_crate(0, 0).next().unwrap();
        let mut cells = map.decode_geiger_ctw(first).unwrap();
        cells.sort();
        assert_eq!(
            cells,
            vec![Gid::TrackerCell { side: 0, layer: 3, row: 0 }, Gid::TrackerCell { side: 1, layer: 8, row: 1 }]
        );
        let late = ctws.at_clocktick(1).next().unwrap();
        assert_eq!(map.decode_geiger_ctw(late).unwrap(), vec![Gid::TrackerCell { side: 0, layer: 5, row: 2 }]);
    }
}
