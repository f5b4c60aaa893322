//! Per-tick processing frame: one hit matrix walked through
//! Empty -> Filled -> Zoned -> Consumed.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;
use trigger_model::{Clocktick, Gid, Result, TriggerError, NSIDES};

use crate::config::TrackerMemories;
use crate::matrix::HitMatrix;
use crate::memory::TrackClass;
use crate::pool::MatrixPool;
use crate::sliding::{SlidingZoneOutput, SLIDING_ZONES_PER_SIDE};
use crate::zones::{ZoneOutput, ZONES_PER_SIDE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Empty,
    Filled,
    Zoned,
    Consumed,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameState::Empty => "empty",
            FrameState::Filled => "filled",
            FrameState::Zoned => "zoned",
            FrameState::Consumed => "consumed",
        };
        f.write_str(name)
    }
}

/// Tracker trigger output of one 1600 ns tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub clocktick_1600ns: Clocktick,
    /// Side 0 zones then side 1 zones
    pub zones: Vec<ZoneOutput>,
    /// Side 0 sliding zones then side 1 sliding zones
    pub sliding_zones: Vec<SlidingZoneOutput>,
    /// Per side, bit z set when zone z has a non-VOID class
    pub zoning_pattern: [u16; NSIDES],
    /// Per side, bit z set when zone z has a near-source bit
    pub zoning_near_source: [u16; NSIDES],
    pub hit_cells: Vec<Gid>,
    /// Best class over every zone
    pub best_class: TrackClass,
}

impl TrackerRecord {
    pub fn zone(&self, side: usize, zone: usize) -> Option<&ZoneOutput> {
        if side >= NSIDES || zone >= ZONES_PER_SIDE {
            return None;
        }
        self.zones.get(side * ZONES_PER_SIDE + zone)
    }

    pub fn sliding_zone(&self, side: usize, index: usize) -> Option<&SlidingZoneOutput> {
        if side >= NSIDES || index >= SLIDING_ZONES_PER_SIDE {
            return None;
        }
        self.sliding_zones.get(side * SLIDING_ZONES_PER_SIDE + index)
    }

    /// Tracker-only decision: some zone holds at least a pre-track.
    pub fn decision(&self) -> bool {
        !self.best_class.is_void()
    }
}

/// One tick's hit matrix and the state it has reached
#[derive(Debug)]
pub struct TickFrame {
    clocktick: Clocktick,
    state: FrameState,
    matrix: HitMatrix,
    zones: Vec<ZoneOutput>,
    sliding_zones: Vec<SlidingZoneOutput>,
}

impl TickFrame {
    /// Frame over a fresh buffer, normally taken from a [`MatrixPool`].
    pub fn new(clocktick: Clocktick, mut matrix: HitMatrix) -> Self {
        matrix.clear();
        Self { clocktick, state: FrameState::Empty, matrix, zones: Vec::new(), sliding_zones: Vec::new() }
    }

    pub fn clocktick(&self) -> Clocktick {
        self.clocktick
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn matrix(&self) -> &HitMatrix {
        &self.matrix
    }

    fn expect_state(&self, allowed: &[FrameState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TriggerError::invariant(format!(
                "cannot {operation} tick frame {} in state {}",
                self.clocktick, self.state
            )))
        }
    }

    /// Set the cells of `hits`. Several fills accumulate into the same tick.
    pub fn fill(&mut self, hits: &[Gid]) -> Result<()> {
        self.expect_state(&[FrameState::Empty, FrameState::Filled], "fill")?;
        for gid in hits {
            self.matrix.set_cell(gid)?;
        }
        self.state = FrameState::Filled;
        Ok(())
    }

    pub fn compute_zones(&mut self, memories: &TrackerMemories) -> Result<()> {
        self.expect_state(&[FrameState::Filled], "zone")?;
        let mut zones = Vec::with_capacity(NSIDES * ZONES_PER_SIDE);
        let mut sliding_zones = Vec::with_capacity(NSIDES * SLIDING_ZONES_PER_SIDE);
        for side in 0..NSIDES {
            for zone in 0..ZONES_PER_SIDE {
                zones.push(ZoneOutput::compute(&self.matrix, side, zone, memories)?);
            }
            for index in 0..SLIDING_ZONES_PER_SIDE {
                sliding_zones.push(SlidingZoneOutput::compute(&self.matrix, side, index, memories)?);
            }
        }
        self.zones = zones;
        self.sliding_zones = sliding_zones;
        self.state = FrameState::Zoned;
        Ok(())
    }

    pub fn consume(&mut self) -> Result<TrackerRecord> {
        self.expect_state(&[FrameState::Zoned], "consume")?;
        let mut zoning_pattern = [0u16; NSIDES];
        let mut zoning_near_source = [0u16; NSIDES];
        let mut best_class = TrackClass::Void;
        for zone in &self.zones {
            let side = zone.side as usize;
            if !zone.class.is_void() {
                zoning_pattern[side] |= 1 << zone.zone;
            }
            if zone.near_source != 0 {
                zoning_near_source[side] |= 1 << zone.zone;
            }
            best_class = best_class.max(zone.class);
        }
        let hit_cells = self
            .matrix
            .hits()
            .map(|(side, layer, row)| Gid::TrackerCell { side: side as u8, layer: layer as u8, row: row as u8 })
            .collect();

        self.state = FrameState::Consumed;
        trace!("tick {} consumed, best class {:?}", self.clocktick, best_class);
        Ok(TrackerRecord {
            clocktick_1600ns: self.clocktick,
            zones: std::mem::take(&mut self.zones),
            sliding_zones: std::mem::take(&mut self.sliding_zones),
            zoning_pattern,
            zoning_near_source,
            hit_cells,
            best_class,
        })
    }

    /// Hand the matrix back to the pool. Only a consumed frame may be recycled.
    pub fn recycle(self, pool: &mut MatrixPool) -> Result<()> {
        self.expect_state(&[FrameState::Consumed], "recycle")?;
        pool.release(self.matrix);
        Ok(())
    }
}
