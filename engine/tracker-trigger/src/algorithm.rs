//! Tracker trigger algorithm over the Geiger crate words of one event.

use std::sync::Arc;

use channel_map::ChannelMap;
use tracing::debug;
use trigger_model::{ct800_to_ct1600, Clocktick, GeigerCtw, GeigerCtwData, Gid, Result, TickIndex};

use crate::config::TrackerMemories;
use crate::frame::{TickFrame, TrackerRecord};
use crate::pool::MatrixPool;

/// Runs one tick frame per 1600 ns tick spanned by the Geiger crate words.
///
/// Shares the channel map and memories read-only; the matrix pool is the
/// caller's per-worker state.
#[derive(Debug, Clone)]
pub struct TrackerTriggerAlgorithm {
    map: Arc<ChannelMap>,
    memories: Arc<TrackerMemories>,
}

impl TrackerTriggerAlgorithm {
    pub fn new(map: Arc<ChannelMap>, memories: Arc<TrackerMemories>) -> Self {
        Self { map, memories }
    }

    pub fn memories(&self) -> &TrackerMemories {
        &self.memories
    }

    /// Cell GIDs hit during the 1600 ns tick `clocktick`, from both of its 800 ns ticks.
    pub fn hit_cells(&self, ctws: &TickIndex<'_, GeigerCtw>, clocktick: Clocktick) -> Result<Vec<Gid>> {
        let mut cells = Vec::new();
        let first = clocktick.saturating_mul(2);
        for ct800 in [first, first.saturating_add(1)] {
            for ctw in ctws.at(ct800) {
                cells.extend(self.map.decode_geiger_ctw(ctw)?);
            }
        }
        Ok(cells)
    }

    /// Process one 1600 ns tick through a frame taken from `pool`.
    pub fn process_tick(
        &self,
        ctws: &TickIndex<'_, GeigerCtw>,
        clocktick: Clocktick,
        pool: &mut MatrixPool,
    ) -> Result<TrackerRecord> {
        let cells = self.hit_cells(ctws, clocktick)?;
        let mut frame = TickFrame::new(clocktick, pool.acquire());
        frame.fill(&cells)?;
        frame.compute_zones(&self.memories)?;
        let record = frame.consume()?;
        frame.recycle(pool)?;
        Ok(record)
    }

    /// One record per 1600 ns tick between the first and last Geiger crate word.
    pub fn process(&self, ctws: &GeigerCtwData, pool: &mut MatrixPool) -> Result<Vec<TrackerRecord>> {
        let (Some(min), Some(max)) = (ctws.clocktick_min(), ctws.clocktick_max()) else {
            return Ok(Vec::new());
        };
        let (first, last) = (ct800_to_ct1600(min), ct800_to_ct1600(max));
        let index = ctws.tick_index();
        let mut records = Vec::with_capacity((last - first + 1) as usize);
        for clocktick in first..=last {
            records.push(self.process_tick(&index, clocktick, pool)?);
        }
        debug!(
            "tracker trigger: {} ticks [{first}, {last}], {} with a track",
            records.len(),
            records.iter().filter(|r| r.decision()).count()
        );
        Ok(records)
    }
}
