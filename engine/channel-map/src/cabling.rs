//! Geometry provider seam and the standard cabling rules

use trigger_model::error::check_range;
use trigger_model::{DetectorType, Eid, Gid, Result};

use crate::layout::*;

/// Supplies, once at initialize time, the detector elements of each type,
/// their cabling to channel-depth electronic identifiers, and the trigger
/// zone of every calorimeter element.
pub trait GeometryProvider: Send + Sync {
    /// Every element of one detector type. An empty list means the type is
    /// not provided.
    fn elements(&self, kind: DetectorType) -> Vec<Gid>;

    /// Channel-depth EID the element is wired to
    fn cable(&self, gid: &Gid) -> Result<Eid>;

    /// Calorimeter trigger zone of the element (`None` for tracker cells)
    fn zone(&self, gid: &Gid) -> Option<usize>;
}

/// Cabling of the two-sided demonstrator: main walls, X-walls, gamma vetoes
/// and the 2 x 9 x 113 drift-cell tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCabling;

impl StandardCabling {
    fn check_side(side: u8) -> Result<()> {
        check_range("detector side", side as usize, NSIDES as usize)
    }
}

impl GeometryProvider for StandardCabling {
    fn elements(&self, kind: DetectorType) -> Vec<Gid> {
        let mut out = Vec::new();
        for side in 0..NSIDES {
            match kind {
                DetectorType::MainCalo => {
                    for column in 0..MAIN_CALO_COLUMNS {
                        for row in 0..MAIN_CALO_ROWS {
                            out.push(Gid::MainCalo { side, column, row });
                        }
                    }
                }
                DetectorType::XCalo => {
                    for wall in 0..XCALO_WALLS {
                        for column in 0..XCALO_COLUMNS {
                            for row in 0..XCALO_ROWS {
                                out.push(Gid::XCalo { side, wall, column, row });
                            }
                        }
                    }
                }
                DetectorType::GammaVeto => {
                    for wall in 0..GVETO_WALLS {
                        for column in 0..GVETO_COLUMNS {
                            out.push(Gid::GammaVeto { side, wall, column });
                        }
                    }
                }
                DetectorType::Tracker => {
                    for layer in 0..TRACKER_LAYERS {
                        for row in 0..TRACKER_ROWS {
                            out.push(Gid::TrackerCell { side, layer, row });
                        }
                    }
                }
            }
        }
        out
    }

    fn cable(&self, gid: &Gid) -> Result<Eid> {
        match *gid {
            Gid::MainCalo { side, column, row } => {
                Self::check_side(side)?;
                check_range("main calo column", column as usize, MAIN_CALO_COLUMNS as usize)?;
                check_range("main calo row", row as usize, MAIN_CALO_ROWS as usize)?;
                Ok(Eid::new(DetectorType::MainCalo, CALO_RACK_ID, side, board_id_of_slot(column), row))
            }
            Gid::XCalo { side, wall, column, row } => {
                Self::check_side(side)?;
                check_range("xcalo wall", wall as usize, XCALO_WALLS as usize)?;
                check_range("xcalo column", column as usize, XCALO_COLUMNS as usize)?;
                check_range("xcalo row", row as usize, XCALO_ROWS as usize)?;
                let board = side * XCALO_WALLS * XCALO_COLUMNS + wall * XCALO_COLUMNS + column;
                Ok(Eid::new(DetectorType::XCalo, CALO_RACK_ID, AUX_CALO_CRATE_ID, board, row))
            }
            Gid::GammaVeto { side, wall, column } => {
                Self::check_side(side)?;
                check_range("gveto wall", wall as usize, GVETO_WALLS as usize)?;
                check_range("gveto column", column as usize, GVETO_COLUMNS as usize)?;
                let board = GVETO_FIRST_BOARD + side * GVETO_WALLS + wall;
                Ok(Eid::new(DetectorType::GammaVeto, CALO_RACK_ID, AUX_CALO_CRATE_ID, board, column))
            }
            Gid::TrackerCell { side, layer, row } => {
                Self::check_side(side)?;
                check_range("tracker layer", layer as usize, TRACKER_LAYERS as usize)?;
                check_range("tracker row", row as usize, TRACKER_ROWS as usize)?;
                let pair = row / TRACKER_ROWS_PER_BOARD;
                let crate_id = pair / TRACKER_BOARDS_PER_CRATE;
                let board = board_id_of_slot(pair % TRACKER_BOARDS_PER_CRATE);
                let channel = side * TRACKER_ROWS_PER_BOARD * TRACKER_LAYERS
                    + (row % TRACKER_ROWS_PER_BOARD) * TRACKER_LAYERS
                    + layer;
                Ok(Eid::new(DetectorType::Tracker, TRACKER_RACK_ID, crate_id, board, channel))
            }
        }
    }

    fn zone(&self, gid: &Gid) -> Option<usize> {
        match *gid {
            Gid::MainCalo { column, .. } => Some(column as usize / 2),
            Gid::XCalo { side, wall, .. } => Some((side * XCALO_WALLS + wall) as usize),
            Gid::GammaVeto { side, wall, .. } => Some(4 + (side * GVETO_WALLS + wall) as usize),
            Gid::TrackerCell { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_model::TriggerError;

    #[test]
    fn element_counts() {
        let c = StandardCabling;
        assert_eq!(c.elements(DetectorType::MainCalo).len(), 2 * 20 * 13);
        assert_eq!(c.elements(DetectorType::XCalo).len(), 2 * 2 * 2 * 16);
        assert_eq!(c.elements(DetectorType::GammaVeto).len(), 2 * 2 * 16);
        assert_eq!(c.elements(DetectorType::Tracker).len(), 2 * 9 * 113);
    }

    #[test]
    fn main_calo_skips_control_board() {
        let c = StandardCabling;
        let eid = c.cable(&Gid::MainCalo { side: 1, column: 9, row: 12 }).unwrap();
        assert_eq!((eid.crate_id(), eid.board_id(), eid.channel()), (1, 9, 12));
        let eid = c.cable(&Gid::MainCalo { side: 0, column: 10, row: 0 }).unwrap();
        assert_eq!(eid.board_id(), 11);
        let eid = c.cable(&Gid::MainCalo { side: 0, column: 19, row: 0 }).unwrap();
        assert_eq!(eid.board_id(), 20);
    }

    #[test]
    fn tracker_boards_hold_two_rows_of_both_sides() {
        let c = StandardCabling;
        let a = c.cable(&Gid::TrackerCell { side: 0, layer: 0, row: 0 }).unwrap();
        let b = c.cable(&Gid::TrackerCell { side: 1, layer: 8, row: 1 }).unwrap();
        assert_eq!(a.truncate(trigger_model::Depth::Board).unwrap(), b.truncate(trigger_model::Depth::Board).unwrap());
        assert_eq!(a.channel(), 0);
        assert_eq!(b.channel(), 35);
        let last = c.cable(&Gid::TrackerCell { side: 0, layer: 4, row: 112 }).unwrap();
        assert_eq!((last.crate_id(), last.board_id()), (2, 19));
        let tenth = c.cable(&Gid::TrackerCell { side: 0, layer: 0, row: 20 }).unwrap();
        assert_eq!((tenth.crate_id(), tenth.board_id()), (0, 11));
    }

    #[test]
    fn out_of_geometry_is_range_error() {
        let c = StandardCabling;
        let err = c.cable(&Gid::TrackerCell { side: 0, layer: 9, row: 0 }).unwrap_err();
        assert!(matches!(err, TriggerError::Range { .. }));
        assert!(c.cable(&Gid::MainCalo { side: 2, column: 0, row: 0 }).is_err());
    }

    #[test]
    fn zones() {
        let c = StandardCabling;
        assert_eq!(c.zone(&Gid::MainCalo { side: 0, column: 19, row: 3 }), Some(9));
        assert_eq!(c.zone(&Gid::XCalo { side: 1, wall: 1, column: 0, row: 0 }), Some(3));
        assert_eq!(c.zone(&Gid::GammaVeto { side: 1, wall: 0, column: 5 }), Some(6));
        assert_eq!(c.zone(&Gid::TrackerCell { side: 0, layer: 0, row: 0 }), None);
    }
}
