//! Electronic (EID) and geometric (GID) identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerError};

/// Closed set of detector sub-systems, each with its own channel-mapping table.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorType {
    MainCalo = 0,
    XCalo = 1,
    GammaVeto = 2,
    Tracker = 3,
}

impl DetectorType {
    pub const ALL: [DetectorType; 4] =
        [DetectorType::MainCalo, DetectorType::XCalo, DetectorType::GammaVeto, DetectorType::Tracker];

    #[inline]
    pub fn is_calorimeter(&self) -> bool {
        !matches!(self, DetectorType::Tracker)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectorType::MainCalo => "mcalo",
            DetectorType::XCalo => "xcalo",
            DetectorType::GammaVeto => "gveto",
            DetectorType::Tracker => "tracker",
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many address levels of an [`Eid`] are meaningful.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Rack = 1,
    Crate = 2,
    Board = 3,
    Channel = 4,
}

/// Electronic identifier {type, rack, crate, board, channel}.
///
/// Levels below `depth` are always zero, so two EIDs built at the same depth
/// compare equal iff their meaningful levels match.
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Eid {
    kind: DetectorType,
    depth: Depth,
    rack: u8,
    crate_id: u8,
    board: u8,
    channel: u8,
}

impl Eid {
    /// Full channel-depth identifier
    pub fn new(kind: DetectorType, rack: u8, crate_id: u8, board: u8, channel: u8) -> Self {
        Self { kind, depth: Depth::Channel, rack, crate_id, board, channel }
    }

    pub fn board(kind: DetectorType, rack: u8, crate_id: u8, board: u8) -> Self {
        Self { kind, depth: Depth::Board, rack, crate_id, board, channel: 0 }
    }

    pub fn crate_level(kind: DetectorType, rack: u8, crate_id: u8) -> Self {
        Self { kind, depth: Depth::Crate, rack, crate_id, board: 0, channel: 0 }
    }

    #[inline]
    pub fn kind(&self) -> DetectorType {
        self.kind
    }
    #[inline]
    pub fn depth(&self) -> Depth {
        self.depth
    }
    #[inline]
    pub fn rack(&self) -> u8 {
        self.rack
    }
    #[inline]
    pub fn crate_id(&self) -> u8 {
        self.crate_id
    }

    /// Board number; only meaningful at board depth or deeper
    #[inline]
    pub fn board_id(&self) -> u8 {
        self.board
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Shallower view of this identifier. Asking for a deeper level than the
    /// identifier carries is a depth mismatch.
    pub fn truncate(&self, depth: Depth) -> Result<Eid> {
        if depth > self.depth {
            return Err(TriggerError::resolution(
                self,
                format!("depth mismatch: {:?} requested from a {:?}-depth identifier", depth, self.depth),
            ));
        }
        let mut out = *self;
        out.depth = depth;
        if depth < Depth::Channel {
            out.channel = 0;
        }
        if depth < Depth::Board {
            out.board = 0;
        }
        if depth < Depth::Crate {
            out.crate_id = 0;
        }
        Ok(out)
    }

    /// Fails with a resolution error unless the identifier sits exactly at `depth`.
    pub fn expect_depth(&self, depth: Depth) -> Result<()> {
        if self.depth == depth {
            Ok(())
        } else {
            Err(TriggerError::resolution(
                self,
                format!("depth mismatch: expected {:?}, got {:?}", depth, self.depth),
            ))
        }
    }
}

impl fmt::Debug for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EID[{} {}", self.kind, self.rack)?;
        if self.depth >= Depth::Crate {
            write!(f, ".{}", self.crate_id)?;
        }
        if self.depth >= Depth::Board {
            write!(f, ".{}", self.board)?;
        }
        if self.depth >= Depth::Channel {
            write!(f, ".{}", self.channel)?;
        }
        f.write_str("]")
    }
}

/// Geometric identifier of one physical detector element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gid {
    MainCalo { side: u8, column: u8, row: u8 },
    XCalo { side: u8, wall: u8, column: u8, row: u8 },
    GammaVeto { side: u8, wall: u8, column: u8 },
    TrackerCell { side: u8, layer: u8, row: u8 },
}

impl Gid {
    pub fn detector_type(&self) -> DetectorType {
        match self {
            Gid::MainCalo { .. } => DetectorType::MainCalo,
            Gid::XCalo { .. } => DetectorType::XCalo,
            Gid::GammaVeto { .. } => DetectorType::GammaVeto,
            Gid::TrackerCell { .. } => DetectorType::Tracker,
        }
    }

    /// Detector side of the element
    pub fn side(&self) -> u8 {
        match *self {
            Gid::MainCalo { side, .. }
            | Gid::XCalo { side, .. }
            | Gid::GammaVeto { side, .. }
            | Gid::TrackerCell { side, .. } => side,
        }
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Gid::MainCalo { side, column, row } => write!(f, "GID[mcalo {side}.{column}.{row}]"),
            Gid::XCalo { side, wall, column, row } => {
                write!(f, "GID[xcalo {side}.{wall}.{column}.{row}]")
            }
            Gid::GammaVeto { side, wall, column } => write!(f, "GID[gveto {side}.{wall}.{column}]"),
            Gid::TrackerCell { side, layer, row } => write!(f, "GID[tracker {side}.{layer}.{row}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_zeroes_lower_levels() {
        let eid = Eid::new(DetectorType::MainCalo, 5, 1, 12, 7);
        let board = eid.truncate(Depth::Board).unwrap();
        assert_eq!(board, Eid::board(DetectorType::MainCalo, 5, 1, 12));
        let krate = eid.truncate(Depth::Crate).unwrap();
        assert_eq!(krate, Eid::crate_level(DetectorType::MainCalo, 5, 1));
        assert_eq!(board.truncate(Depth::Crate).unwrap(), krate);
    }

    #[test]
    fn deeper_truncation_is_a_depth_mismatch() {
        let board = Eid::board(DetectorType::Tracker, 3, 0, 4);
        let err = board.truncate(Depth::Channel).unwrap_err();
        assert!(matches!(err, TriggerError::Resolution { .. }));
        assert!(board.expect_depth(Depth::Board).is_ok());
        assert!(board.expect_depth(Depth::Channel).is_err());
    }

    #[test]
    fn display_is_depth_limited() {
        assert_eq!(Eid::new(DetectorType::Tracker, 3, 2, 11, 35).to_string(), "EID[tracker 3.2.11.35]");
        assert_eq!(Eid::crate_level(DetectorType::MainCalo, 5, 1).to_string(), "EID[mcalo 5.1]");
        let gid = Gid::TrackerCell { side: 0, layer: 3, row: 0 };
        assert_eq!(gid.to_string(), "GID[tracker 0.3.0]");
        assert_eq!(gid.detector_type(), DetectorType::Tracker);
    }

    #[test]
    fn gid_serde_tagged() {
        let gid = Gid::MainCalo { side: 1, column: 4, row: 9 };
        let json = serde_json::to_string(&gid).unwrap();
        assert_eq!(json, r#"{"type":"main_calo","side":1,"column":4,"row":9}"#);
        let back: Gid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gid);
    }
}
