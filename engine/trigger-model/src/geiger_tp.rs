//! Geiger trigger primitive: the wire hit mask of one tracker front-end board
//! at one 800 ns clocktick, packed into a 100-bit block.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerError, check_range};
use crate::ids::{DetectorType, Depth, Eid};
use crate::record::{RecordKind, TriggerRecord, bits_msb_first};
use crate::types::Clocktick;

pub const GEIGER_TP_SIZE: usize = 100;
pub const WIRES_PER_BOARD: usize = 36;

pub const TP_WIRES_BEGIN: usize = 0;
pub const TP_BOARD_ID_BEGIN: usize = 36;
pub const TP_BOARD_ID_BITS: usize = 5;
pub const TP_CRATE_ID_BEGIN: usize = 41;
pub const TP_CRATE_ID_BITS: usize = 2;
pub const TP_HW_STATUS_BEGIN: usize = 43;
pub const TP_HW_STATUS_BITS: usize = 2;

const WIRES_MASK: u64 = (1 << WIRES_PER_BOARD) - 1;

/// Fields carried by one 100-bit board block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeigerBlock {
    pub board_id: u8,
    pub crate_id: u8,
    pub hw_status: u8,
    pub wires: u64,
}

impl GeigerBlock {
    pub fn pack(&self) -> u128 {
        (self.wires & WIRES_MASK) as u128
            | ((self.board_id as u128) & 0x1F) << TP_BOARD_ID_BEGIN
            | ((self.crate_id as u128) & 0b11) << TP_CRATE_ID_BEGIN
            | ((self.hw_status as u128) & 0b11) << TP_HW_STATUS_BEGIN
    }

    pub fn unpack(raw: u128) -> Result<Self> {
        if raw >> GEIGER_TP_SIZE != 0 {
            return Err(TriggerError::range("geiger block bit", raw.ilog2(), GEIGER_TP_SIZE as u64));
        }
        Ok(Self {
            wires: (raw as u64) & WIRES_MASK,
            board_id: ((raw >> TP_BOARD_ID_BEGIN) & 0x1F) as u8,
            crate_id: ((raw >> TP_CRATE_ID_BEGIN) & 0b11) as u8,
            hw_status: ((raw >> TP_HW_STATUS_BEGIN) & 0b11) as u8,
        })
    }

    /// Hit wire indices, ascending
    pub fn hit_wires(&self) -> impl Iterator<Item = u8> + '_ {
        (0..WIRES_PER_BOARD as u8).filter(move |w| self.wires >> w & 1 == 1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeigerTp {
    eid: Eid,
    clocktick_800ns: Clocktick,
    wires: u64,
    hw_status: u8,
    locked: bool,
}

impl GeigerTp {
    /// `eid` must be a board-depth tracker identifier.
    pub fn new(eid: Eid, clocktick_800ns: Clocktick) -> Result<Self> {
        eid.expect_depth(Depth::Board)?;
        if eid.kind() != DetectorType::Tracker {
            return Err(TriggerError::resolution(eid, "not a tracker board"));
        }
        Ok(Self { eid, clocktick_800ns, wires: 0, hw_status: 0, locked: false })
    }

    #[inline]
    pub fn wires(&self) -> u64 {
        self.wires
    }
    #[inline]
    pub fn hw_status(&self) -> u8 {
        self.hw_status
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(TriggerError::locked(self))
        } else {
            Ok(())
        }
    }

    /// Mark one wire as hit; repeated hits on the same wire are idempotent.
    pub fn set_wire(&mut self, channel: u8) -> Result<()> {
        self.ensure_unlocked()?;
        check_range("geiger wire", channel as usize, WIRES_PER_BOARD)?;
        self.wires |= 1 << channel;
        Ok(())
    }

    pub fn set_hw_status(&mut self, status: u8) -> Result<()> {
        self.ensure_unlocked()?;
        check_range("geiger hardware status", status as usize, 1 << TP_HW_STATUS_BITS)?;
        self.hw_status = status;
        Ok(())
    }

    pub fn block(&self) -> GeigerBlock {
        GeigerBlock {
            board_id: self.eid.board_id(),
            crate_id: self.eid.crate_id(),
            hw_status: self.hw_status,
            wires: self.wires,
        }
    }
}

impl TriggerRecord for GeigerTp {
    const KIND: RecordKind = RecordKind::GeigerTp;

    fn clocktick(&self) -> Clocktick {
        self.clocktick_800ns
    }
    fn eid(&self) -> Eid {
        self.eid
    }
    fn is_locked(&self) -> bool {
        self.locked
    }
    fn lock(&mut self) {
        self.locked = true;
    }
    fn payload_bits(&self) -> String {
        bits_msb_first(self.block().pack(), GEIGER_TP_SIZE)
    }
}

impl fmt::Display for GeigerTp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeigerTP {} @ct800={} wires={:#011x}{}",
            self.eid,
            self.clocktick_800ns,
            self.wires,
            if self.locked { " locked" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_layout() {
        let block = GeigerBlock { board_id: 19, crate_id: 2, hw_status: 1, wires: 0b101 };
        let raw = block.pack();
        assert_eq!(raw & 0xF_FFFF_FFFF, 0b101);
        assert_eq!((raw >> 36) & 0x1F, 19);
        assert_eq!((raw >> 41) & 0b11, 2);
        assert_eq!((raw >> 43) & 0b11, 1);
        assert_eq!(GeigerBlock::unpack(raw).unwrap(), block);
        assert_eq!(block.hit_wires().collect::<Vec<_>>(), vec![0, 2]);
        assert!(GeigerBlock::unpack(1u128 << 100).is_err());
    }

    #[test]
    fn wires_or_together_until_locked() {
        let mut tp = GeigerTp::new(Eid::board(DetectorType::Tracker, 3, 1, 11), 7).unwrap();
        tp.set_wire(35).unwrap();
        tp.set_wire(35).unwrap();
        tp.set_wire(0).unwrap();
        assert_eq!(tp.wires(), (1 << 35) | 1);
        assert!(matches!(tp.set_wire(36), Err(TriggerError::Range { .. })));
        tp.lock();
        assert!(tp.set_wire(1).is_err());
        assert_eq!(tp.block().board_id, 11);
        assert_eq!(tp.block().crate_id, 1);
    }
}
