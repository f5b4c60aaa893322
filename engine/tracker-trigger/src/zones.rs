//! Fixed tracker zones: ten row ranges per side, each reduced to a 7-bit
//! pattern word and a track class.
//!
//! Pattern word layout:
//!
//! | bit | meaning |
//! |-----|---------|
//! | 0 | inner layers |
//! | 1 | outer layers |
//! | 2 | right rows |
//! | 3 | middle rows |
//! | 4 | left rows |
//! | 5 | near source, right half |
//! | 6 | near source, left half |

use serde::{Deserialize, Serialize};
use trigger_model::error::check_range;
use trigger_model::Result;

use crate::config::TrackerMemories;
use crate::matrix::HitMatrix;
use crate::memory::TrackClass;

pub const ZONES_PER_SIDE: usize = 10;
pub const MAX_ZONE_WIDTH: usize = 12;

const ZONE_START_ROW: [usize; ZONES_PER_SIDE] = [0, 9, 21, 33, 45, 57, 68, 80, 92, 104];
const ZONE_STOP_ROW: [usize; ZONES_PER_SIDE] = [8, 20, 32, 44, 56, 67, 79, 91, 103, 112];

pub const DATA_INNER: u8 = 0;
pub const DATA_OUTER: u8 = 1;
pub const DATA_RIGHT: u8 = 2;
pub const DATA_MIDDLE: u8 = 3;
pub const DATA_LEFT: u8 = 4;
pub const DATA_NSZ_RIGHT: u8 = 5;
pub const DATA_NSZ_LEFT: u8 = 6;

/// Layers scanned for the near-source bits
const NEAR_SOURCE_LAYERS: usize = 4;
/// Quadrant layer ranges, as (first layer, count)
const QUADRANT_LAYERS: [(usize, usize); 2] = [(0, 5), (4, 5)];

pub fn zone_start_row(zone: usize) -> usize {
    ZONE_START_ROW[zone]
}

pub fn zone_stop_row(zone: usize) -> usize {
    ZONE_STOP_ROW[zone]
}

pub fn zone_width(zone: usize) -> usize {
    ZONE_STOP_ROW[zone] - ZONE_START_ROW[zone] + 1
}

/// Zone containing a tracker row
pub fn zone_of_row(row: usize) -> Option<usize> {
    ZONE_STOP_ROW.iter().position(|&stop| row <= stop)
}

/// Lower and upper row halves of a zone, inclusive bounds.
fn halves(zone: usize) -> [(usize, usize); 2] {
    let start = zone_start_row(zone);
    let stop = zone_stop_row(zone);
    let split = start + zone_width(zone) / 2;
    [(start, split - 1), (split, stop)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOutput {
    pub side: u8,
    pub zone: u8,
    /// One bit per layer over the zone rows
    pub layer_projection: u16,
    /// One bit per zone row, bit 0 is the first row
    pub row_projection: u16,
    /// Bit 0 inner, bit 1 outer
    pub io: u8,
    /// Bit 0 right, bit 1 middle, bit 2 left
    pub rml: u8,
    /// Bit 0 right, bit 1 left
    pub near_source: u8,
    /// Quadrants passing the multiplicity memory
    pub quadrants: u8,
    pub class: TrackClass,
    /// Packed pattern word
    pub data: u8,
}

impl ZoneOutput {
    pub fn compute(matrix: &HitMatrix, side: usize, zone: usize, memories: &TrackerMemories) -> Result<Self> {
        check_range("tracker zone", zone, ZONES_PER_SIDE)?;
        let start = zone_start_row(zone);
        let stop = zone_stop_row(zone);

        let layer_projection = matrix.layer_projection(side, start, stop)?;
        let row_projection = matrix.row_projection(side, start, stop)?;
        let io = memories.layer.fetch(layer_projection)? as u8;
        let rml = memories.zone_row.fetch(row_projection)? as u8;

        let [lower, upper] = halves(zone);
        let mut near_source = 0u8;
        for (bit, (first, last)) in [lower, upper].into_iter().enumerate() {
            if matrix.layer_projection_in(side, first, last, 0, NEAR_SOURCE_LAYERS)? != 0 {
                near_source |= 1 << bit;
            }
        }

        let mut quadrants = 0u8;
        let mut bit = 0;
        for (first, last) in [lower, upper] {
            for (first_layer, count) in QUADRANT_LAYERS {
                let presence = matrix.layer_projection_in(side, first, last, first_layer, count)?;
                if memories.quadrant.fetch(presence)? != 0 {
                    quadrants |= 1 << bit;
                }
                bit += 1;
            }
        }
        let class = TrackClass::from_code(memories.track_class.fetch(quadrants.into())?)?;

        let data = io | rml << DATA_RIGHT | near_source << DATA_NSZ_RIGHT;
        Ok(Self {
            side: side as u8,
            zone: zone as u8,
            layer_projection: layer_projection as u16,
            row_projection: row_projection as u16,
            io,
            rml,
            near_source,
            quadrants,
            class,
            data,
        })
    }

    #[inline]
    pub fn data_bit(&self, bit: u8) -> bool {
        self.data >> bit & 1 == 1
    }

    /// True when the zone pattern word has any bit set
    pub fn is_active(&self) -> bool {
        self.data != 0
    }
}
