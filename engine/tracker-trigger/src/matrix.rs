//! Side x layer x row boolean matrix of hit tracker cells for one 1600 ns tick.

use core::fmt;

use channel_map::layout::{NSIDES, TRACKER_LAYERS, TRACKER_ROWS};
use trigger_model::error::check_range;
use trigger_model::{Bitset, Gid, Result, TriggerError};

pub const NLAYERS: usize = TRACKER_LAYERS as usize;
pub const NROWS: usize = TRACKER_ROWS as usize;
pub const NCELLS: usize = NSIDES as usize * NLAYERS * NROWS;

#[derive(Clone, PartialEq, Eq)]
pub struct HitMatrix {
    cells: Bitset,
}

impl Default for HitMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl HitMatrix {
    pub fn new() -> Self {
        Self { cells: Bitset::with_len(NCELLS) }
    }

    #[inline]
    fn index(side: usize, layer: usize, row: usize) -> usize {
        (side * NLAYERS + layer) * NROWS + row
    }

    fn check(side: usize, layer: usize, row: usize) -> Result<()> {
        check_range("tracker side", side, NSIDES as usize)?;
        check_range("tracker layer", layer, NLAYERS)?;
        check_range("tracker row", row, NROWS)
    }

    pub fn set(&mut self, side: usize, layer: usize, row: usize) -> Result<()> {
        Self::check(side, layer, row)?;
        self.cells.set(Self::index(side, layer, row))
    }

    /// Set the cell of a tracker GID.
    pub fn set_cell(&mut self, gid: &Gid) -> Result<()> {
        match *gid {
            Gid::TrackerCell { side, layer, row } => self.set(side as usize, layer as usize, row as usize),
            other => Err(TriggerError::resolution(other, "not a tracker cell")),
        }
    }

    pub fn get(&self, side: usize, layer: usize, row: usize) -> Result<bool> {
        Self::check(side, layer, row)?;
        self.cells.get(Self::index(side, layer, row))
    }

    #[inline]
    fn is_hit(&self, side: usize, layer: usize, row: usize) -> bool {
        self.cells.is_set(Self::index(side, layer, row))
    }

    pub fn clear(&mut self) {
        self.cells.clear_all();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count(&self) -> usize {
        self.cells.count_ones()
    }

    /// Hit cells as (side, layer, row), side then layer then row order
    pub fn hits(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.cells.ones().map(|i| (i / (NLAYERS * NROWS), i / NROWS % NLAYERS, i % NROWS))
    }

    fn check_window(side: usize, start: usize, stop: usize) -> Result<()> {
        check_range("tracker side", side, NSIDES as usize)?;
        check_range("tracker row", stop, NROWS)?;
        check_range("tracker row", start, stop + 1)
    }

    /// OR over rows `[start, stop]` of one side, one bit per layer.
    pub fn layer_projection(&self, side: usize, start: usize, stop: usize) -> Result<u32> {
        self.layer_projection_in(side, start, stop, 0, NLAYERS)
    }

    /// OR over rows `[start, stop]` restricted to layers `[first, first + count)`;
    /// bit 0 is layer `first`.
    pub fn layer_projection_in(
        &self,
        side: usize,
        start: usize,
        stop: usize,
        first: usize,
        count: usize,
    ) -> Result<u32> {
        Self::check_window(side, start, stop)?;
        check_range("tracker layer", first.saturating_add(count), NLAYERS + 1)?;
        let mut out = 0;
        for (bit, layer) in (first..first + count).enumerate() {
            if (start..=stop).any(|row| self.is_hit(side, layer, row)) {
                out |= 1 << bit;
            }
        }
        Ok(out)
    }

    /// OR over layers of rows `[start, stop]`; bit 0 is row `start`.
    pub fn row_projection(&self, side: usize, start: usize, stop: usize) -> Result<u32> {
        Self::check_window(side, start, stop)?;
        let mut out = 0;
        for (bit, row) in (start..=stop).enumerate() {
            if (0..NLAYERS).any(|layer| self.is_hit(side, layer, row)) {
                out |= 1 << bit;
            }
        }
        Ok(out)
    }
}

impl HitMatrix {
    fn draw_layer(&self, f: &mut fmt::Formatter<'_>, side: usize, layer: usize) -> fmt::Result {
        write!(f, "{layer} ")?;
        for row in 0..NROWS {
            let cell = if self.is_hit(side, layer, row) { 'o' } else { '.' };
            write!(f, "{cell}")?;
        }
        writeln!(f)
    }
}

/// Side 0 is drawn layers outermost first, side 1 below it innermost first,
/// so the source foil sits between them.
impl fmt::Display for HitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for layer in (0..NLAYERS).rev() {
            self.draw_layer(f, 0, layer)?;
        }
        writeln!(f, "  {}", "=".repeat(NROWS))?;
        for layer in 0..NLAYERS {
            self.draw_layer(f, 1, layer)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitMatrix").field("hits", &self.hits().collect::<Vec<_>>()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projections() {
        let mut m = HitMatrix::new();
        m.set(0, 3, 0).unwrap();
        m.set(0, 8, 5).unwrap();
        m.set(1, 0, 5).unwrap();
        assert_eq!(m.layer_projection(0, 0, 0).unwrap(), 1 << 3);
        assert_eq!(m.layer_projection(0, 0, 8).unwrap(), (1 << 3) | (1 << 8));
        assert_eq!(m.row_projection(0, 0, 7).unwrap(), 0b10_0001);
        assert_eq!(m.row_projection(0, 1, 5).unwrap(), 0b1_0000);
        assert_eq!(m.layer_projection_in(0, 0, 8, 4, 5).unwrap(), 0b1_0000);
        assert_eq!(m.hits().collect::<Vec<_>>(), vec![(0, 3, 0), (0, 8, 5), (1, 0, 5)]);
    }

    #[test]
    fn out_of_chamber_cells_are_range_errors() {
        let mut m = HitMatrix::new();
        assert!(matches!(m.set(0, 9, 0), Err(TriggerError::Range { .. })));
        assert!(m.set(2, 0, 0).is_err());
        assert!(m.set(0, 0, 113).is_err());
        assert!(m.set_cell(&Gid::MainCalo { side: 0, column: 0, row: 0 }).is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn out_of_chamber_reads_are_range_errors() {
        let mut m = HitMatrix::new();
        m.set(1, 8, 112).unwrap();
        assert!(m.get(1, 8, 112).unwrap());
        assert!(!m.get(0, 8, 112).unwrap());
        assert!(matches!(m.get(2, 0, 0), Err(TriggerError::Range { what: "tracker side", .. })));
        assert!(matches!(m.get(0, 0, 113), Err(TriggerError::Range { what: "tracker row", .. })));
        assert!(m.get(0, 9, 0).is_err());

        assert!(m.row_projection(1, 100, 113).is_err());
        assert!(m.row_projection(1, 5, 4).is_err());
        assert!(m.layer_projection(2, 0, 8).is_err());
        assert!(m.layer_projection_in(1, 100, 112, 6, 4).is_err());
        assert_eq!(m.layer_projection_in(1, 100, 112, 6, 3).unwrap(), 0b100);
    }

    #[test]
    fn display_draws_both_sides() {
        let mut m = HitMatrix::new();
        m.set_cell(&Gid::TrackerCell { side: 0, layer: 8, row: 2 }).unwrap();
        let text = m.to_string();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("8 ..o."));
        assert_eq!(text.lines().count(), 2 * NLAYERS + 1);
        m.clear();
        assert_eq!(m.count(), 0);
    }
}
