//! Sliding zones: 30 overlapping row windows per side.
//!
//! Interior windows are 8 rows wide and advance by 4 rows. The windows at the
//! chamber ends shrink to 5 rows, then to the single edge row.

use serde::{Deserialize, Serialize};
use trigger_model::error::check_range;
use trigger_model::Result;

use crate::config::TrackerMemories;
use crate::matrix::{HitMatrix, NROWS};

pub const SLIDING_ZONES_PER_SIDE: usize = 30;
pub const SLIDING_ZONE_WIDTH: usize = 8;
pub const EDGE_SLIDING_ZONE_WIDTH: usize = 5;

pub fn sliding_zone_width(index: usize) -> usize {
    match index {
        0 => 1,
        1 => EDGE_SLIDING_ZONE_WIDTH,
        i if i == SLIDING_ZONES_PER_SIDE - 1 => 1,
        i if i == SLIDING_ZONES_PER_SIDE - 2 => EDGE_SLIDING_ZONE_WIDTH,
        _ => SLIDING_ZONE_WIDTH,
    }
}

pub fn sliding_zone_stop_row(index: usize) -> usize {
    let stop = match index {
        0 => 0,
        1 => 5,
        i if i <= 16 => 4 * i,
        i => 4 * i - 1,
    };
    stop.min(NROWS - 1)
}

pub fn sliding_zone_start_row(index: usize) -> usize {
    sliding_zone_stop_row(index) + 1 - sliding_zone_width(index)
}

/// Shift aligning a narrow window's row word on the left of the row memory address.
fn row_address_shift(index: usize) -> usize {
    match index {
        0 | 1 => SLIDING_ZONE_WIDTH - sliding_zone_width(index),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingZoneOutput {
    pub side: u8,
    pub index: u8,
    pub layer_projection: u16,
    /// One bit per window row, bit 0 is the start row
    pub row_projection: u16,
    /// Bit 0 inner, bit 1 outer
    pub io: u8,
    /// Bit 0 right, bit 1 left
    pub lr: u8,
}

impl SlidingZoneOutput {
    pub fn compute(matrix: &HitMatrix, side: usize, index: usize, memories: &TrackerMemories) -> Result<Self> {
        check_range("sliding zone", index, SLIDING_ZONES_PER_SIDE)?;
        let start = sliding_zone_start_row(index);
        let stop = sliding_zone_stop_row(index);
        let layer_projection = matrix.layer_projection(side, start, stop)?;
        let row_projection = matrix.row_projection(side, start, stop)?;
        let io = memories.layer.fetch(layer_projection)? as u8;
        let lr = memories.row.fetch(row_projection << row_address_shift(index))? as u8;
        Ok(Self {
            side: side as u8,
            index: index as u8,
            layer_projection: layer_projection as u16,
            row_projection: row_projection as u16,
            io,
            lr,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.layer_projection == 0 && self.row_projection == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_law() {
        let n = SLIDING_ZONES_PER_SIDE;
        assert_eq!(sliding_zone_width(0), 1);
        assert_eq!(sliding_zone_width(n - 1), 1);
        assert_eq!(sliding_zone_width(1), 5);
        assert_eq!(sliding_zone_width(n - 2), 5);
        for i in 2..n - 2 {
            assert_eq!(sliding_zone_width(i), 8, "sliding zone {i}");
        }
    }

    #[test]
    fn row_ranges() {
        assert_eq!((sliding_zone_start_row(0), sliding_zone_stop_row(0)), (0, 0));
        assert_eq!((sliding_zone_start_row(1), sliding_zone_stop_row(1)), (1, 5));
        assert_eq!((sliding_zone_start_row(2), sliding_zone_stop_row(2)), (1, 8));
        assert_eq!((sliding_zone_start_row(16), sliding_zone_stop_row(16)), (57, 64));
        assert_eq!((sliding_zone_start_row(17), sliding_zone_stop_row(17)), (60, 67));
        assert_eq!((sliding_zone_start_row(28), sliding_zone_stop_row(28)), (107, 111));
        assert_eq!((sliding_zone_start_row(29), sliding_zone_stop_row(29)), (112, 112));
    }

    #[test]
    fn every_row_is_covered() {
        for row in 0..NROWS {
            assert!(
                (0..SLIDING_ZONES_PER_SIDE)
                    .any(|i| (sliding_zone_start_row(i)..=sliding_zone_stop_row(i)).contains(&row)),
                "row {row}"
            );
        }
    }

    #[test]
    fn narrow_window_reads_the_left_part_of_the_row_memory() {
        let memories = TrackerMemories::defaults().unwrap();
        let mut m = HitMatrix::new();
        m.set(0, 2, 1).unwrap();
        let out = SlidingZoneOutput::compute(&m, 0, 1, &memories).unwrap();
        assert_eq!(out.row_projection, 0b1);
        // shifted by 3, the start row lands on address bit 3 (right half)
        assert_eq!(out.lr, 0b01);

        m.set(0, 2, 5).unwrap();
        let out = SlidingZoneOutput::compute(&m, 0, 1, &memories).unwrap();
        assert_eq!(out.row_projection, 0b1_0001);
        assert_eq!(out.lr, 0b11);
    }
}
