//! Geiger crate trigger word: one 100-bit block per front-end board slot of a
//! tracker crate, at one 800 ns clocktick.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bitset::Bitset;
use crate::error::{Result, TriggerError, check_range};
use crate::geiger_tp::{GEIGER_TP_SIZE, GeigerBlock};
use crate::ids::{DetectorType, Depth, Eid};
use crate::record::{RecordKind, TriggerRecord};
use crate::types::Clocktick;

pub const FEBS_PER_CRATE: usize = 20;
pub const CONTROL_BOARD_ID: u8 = 10;
pub const MAX_BOARD_ID: u8 = 20;
pub const GEIGER_CTW_SIZE: usize = FEBS_PER_CRATE * GEIGER_TP_SIZE;

/// Block slot of a front-end board; the control board has no slot.
pub fn slot_of_board(board_id: u8) -> Result<usize> {
    check_range("tracker board id", board_id as usize, MAX_BOARD_ID as usize + 1)?;
    match board_id {
        CONTROL_BOARD_ID => Err(TriggerError::invariant("control board 10 carries no trigger block")),
        b if b < CONTROL_BOARD_ID => Ok(b as usize),
        b => Ok(b as usize - 1),
    }
}

pub fn board_of_slot(slot: usize) -> Result<u8> {
    check_range("geiger CTW slot", slot, FEBS_PER_CRATE)?;
    Ok(if slot < CONTROL_BOARD_ID as usize {
        slot as u8
    } else {
        slot as u8 + 1
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeigerCtw {
    eid: Eid,
    clocktick_800ns: Clocktick,
    #[serde(serialize_with = "ser_payload", deserialize_with = "de_payload")]
    payload: Bitset,
    locked: bool,
}

impl GeigerCtw {
    /// `eid` must be a crate-depth tracker identifier.
    pub fn new(eid: Eid, clocktick_800ns: Clocktick) -> Result<Self> {
        eid.expect_depth(Depth::Crate)?;
        if eid.kind() != DetectorType::Tracker {
            return Err(TriggerError::resolution(eid, "not a tracker crate"));
        }
        Ok(Self { eid, clocktick_800ns, payload: Bitset::with_len(GEIGER_CTW_SIZE), locked: false })
    }

    /// Store a board block in its slot. The block must belong to this crate.
    pub fn set_block(&mut self, block: &GeigerBlock) -> Result<()> {
        if self.locked {
            return Err(TriggerError::locked(&*self));
        }
        if block.crate_id != self.eid.crate_id() {
            return Err(TriggerError::invariant(format!(
                "block of crate {} written into {}",
                block.crate_id, self
            )));
        }
        let slot = slot_of_board(block.board_id)?;
        self.payload.write_field(slot * GEIGER_TP_SIZE, GEIGER_TP_SIZE, block.pack())
    }

    pub fn raw_block(&self, slot: usize) -> Result<u128> {
        check_range("geiger CTW slot", slot, FEBS_PER_CRATE)?;
        self.payload.read_field(slot * GEIGER_TP_SIZE, GEIGER_TP_SIZE)
    }

    /// Decoded block of a slot; `None` when the slot carries no wire hit.
    pub fn block(&self, slot: usize) -> Result<Option<GeigerBlock>> {
        let raw = self.raw_block(slot)?;
        let block = GeigerBlock::unpack(raw)?;
        Ok((block.wires != 0).then_some(block))
    }

    /// Every (board id, wire) pair hit in this crate, slot order.
    pub fn hit_channels(&self) -> Result<Vec<(u8, u8)>> {
        let mut out = Vec::new();
        for slot in 0..FEBS_PER_CRATE {
            if let Some(block) = self.block(slot)? {
                out.extend(block.hit_wires().map(|w| (block.board_id, w)));
            }
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl TriggerRecord for GeigerCtw {
    const KIND: RecordKind = RecordKind::GeigerCtw;

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
        self.payload.to_bit_string()
    }
}

impl fmt::Display for GeigerCtw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeigerCTW {} @ct800={} ({} wires){}",
            self.eid,
            self.clocktick_800ns,
            self.payload.count_ones(),
            if self.locked { " locked" } else { "" }
        )
    }
}

fn ser_payload<S: Serializer>(payload: &Bitset, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&payload.to_bit_string())
}

fn de_payload<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Bitset, D::Error> {
    let text = String::deserialize(d)?;
    if text.len() != GEIGER_CTW_SIZE {
        return Err(serde::de::Error::custom(format!(
            "geiger CTW payload must be {GEIGER_CTW_SIZE} bits, got {}",
            text.len()
        )));
    }
    let mut bits = Bitset::with_len(GEIGER_CTW_SIZE);
    for (i, c) in text.bytes().rev().enumerate() {
        match c {
            b'1' => bits.set(i).map_err(serde::de::Error::custom)?,
            b'0' => {}
            other => {
                return Err(serde::de::Error::custom(format!("invalid payload digit {:?}", other as char)));
            }
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_eid(c: u8) -> Eid {
        Eid::crate_level(DetectorType::Tracker, 3, c)
    }

    #[test]
    fn slots_skip_control_board() {
        assert_eq!(slot_of_board(0).unwrap(), 0);
        assert_eq!(slot_of_board(9).unwrap(), 9);
        assert_eq!(slot_of_board(11).unwrap(), 10);
        assert_eq!(slot_of_board(20).unwrap(), 19);
        assert!(slot_of_board(10).is_err());
        assert!(matches!(slot_of_board(21), Err(TriggerError::Range { .. })));
        for slot in 0..FEBS_PER_CRATE {
            assert_eq!(slot_of_board(board_of_slot(slot).unwrap()).unwrap(), slot);
        }
    }

    #[test]
    fn blocks_decode_to_board_and_wires() {
        let mut ctw = GeigerCtw::new(crate_eid(1), 12).unwrap();
        ctw.set_block(&GeigerBlock { board_id: 14, crate_id: 1, hw_status: 0, wires: 0b11 << 20 }).unwrap();
        ctw.set_block(&GeigerBlock { board_id: 2, crate_id: 1, hw_status: 0, wires: 1 }).unwrap();
        assert_eq!(ctw.hit_channels().unwrap(), vec![(2, 0), (14, 20), (14, 21)]);
        assert!(ctw.block(0).unwrap().is_none());
    }

    #[test]
    fn foreign_crate_block_rejected() {
        let mut ctw = GeigerCtw::new(crate_eid(0), 12).unwrap();
        let err = ctw.set_block(&GeigerBlock { board_id: 1, crate_id: 2, hw_status: 0, wires: 1 });
        assert!(matches!(err, Err(TriggerError::Invariant(_))));
    }

    #[test]
    fn locked_ctw_is_read_only() {
        let mut ctw = GeigerCtw::new(crate_eid(0), 12).unwrap();
        ctw.lock();
        assert!(ctw.set_block(&GeigerBlock { board_id: 1, crate_id: 0, hw_status: 0, wires: 1 }).is_err());
        assert!(ctw.is_empty());
    }

    #[test]
    fn serde_keeps_payload() {
        let mut ctw = GeigerCtw::new(crate_eid(2), 3).unwrap();
        ctw.set_block(&GeigerBlock { board_id: 20, crate_id: 2, hw_status: 3, wires: 1 << 35 }).unwrap();
        let json = serde_json::to_string(&ctw).unwrap();
        let back: GeigerCtw = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctw);
    }
}
