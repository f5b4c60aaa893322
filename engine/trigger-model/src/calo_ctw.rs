//! Calorimeter crate trigger word: all TPs of one crate at one 25 ns clocktick.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::calo_tp::HTM_MAX;
use crate::error::{Result, TriggerError};
use crate::ids::{Depth, Eid};
use crate::record::{RecordKind, TriggerRecord, bits_msb_first};
use crate::types::Clocktick;

pub const CALO_CTW_SIZE: usize = 18;
pub const ZONING_BITS: usize = 10;
pub const CONTROL_BITS: usize = 4;

pub const CTW_HTM_BEGIN: usize = 0;
pub const CTW_ZONING_BEGIN: usize = 2;
pub const CTW_LTO_BIT: usize = 12;
pub const CTW_XT_BIT: usize = 13;
pub const CTW_CONTROL_BEGIN: usize = 14;

const ZONING_MASK: u16 = (1 << ZONING_BITS) - 1;
const CONTROL_MASK: u8 = (1 << CONTROL_BITS) - 1;

/// 18-bit CTW payload: HTM_PC (0-1), zoning (2-11), LTO_PC (12), XT_PC (13), control (14-17).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaloCtwBits {
    pub htm_pc: u8,
    pub zoning: u16,
    pub lto_pc: bool,
    pub xt_pc: bool,
    pub control: u8,
}

impl CaloCtwBits {
    pub fn pack(&self) -> u32 {
        (self.htm_pc as u32 & 0b11)
            | ((self.zoning & ZONING_MASK) as u32) << CTW_ZONING_BEGIN
            | (self.lto_pc as u32) << CTW_LTO_BIT
            | (self.xt_pc as u32) << CTW_XT_BIT
            | ((self.control & CONTROL_MASK) as u32) << CTW_CONTROL_BEGIN
    }

    pub fn unpack(raw: u32) -> Result<Self> {
        if raw >> CALO_CTW_SIZE != 0 {
            return Err(TriggerError::range("calo CTW payload bit", raw.ilog2(), CALO_CTW_SIZE as u64));
        }
        Ok(Self {
            htm_pc: (raw & 0b11) as u8,
            zoning: ((raw >> CTW_ZONING_BEGIN) as u16) & ZONING_MASK,
            lto_pc: raw >> CTW_LTO_BIT & 1 == 1,
            xt_pc: raw >> CTW_XT_BIT & 1 == 1,
            control: ((raw >> CTW_CONTROL_BEGIN) as u8) & CONTROL_MASK,
        })
    }

    /// Zones with their bit set, ascending
    pub fn active_zones(&self) -> Vec<usize> {
        (0..ZONING_BITS).filter(|z| self.zoning >> z & 1 == 1).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaloCtw {
    eid: Eid,
    clocktick_25ns: Clocktick,
    bits: CaloCtwBits,
    locked: bool,
}

impl CaloCtw {
    /// `eid` must be a crate-depth calorimeter identifier.
    pub fn new(eid: Eid, clocktick_25ns: Clocktick) -> Result<Self> {
        eid.expect_depth(Depth::Crate)?;
        if !eid.kind().is_calorimeter() {
            return Err(TriggerError::resolution(eid, "not a calorimeter crate"));
        }
        Ok(Self { eid, clocktick_25ns, bits: CaloCtwBits::default(), locked: false })
    }

    #[inline]
    pub fn bits(&self) -> CaloCtwBits {
        self.bits
    }
    #[inline]
    pub fn htm(&self) -> u8 {
        self.bits.htm_pc
    }
    #[inline]
    pub fn zoning_word(&self) -> u16 {
        self.bits.zoning
    }
    #[inline]
    pub fn is_lto(&self) -> bool {
        self.bits.lto_pc
    }
    #[inline]
    pub fn is_xt(&self) -> bool {
        self.bits.xt_pc
    }

    pub fn zoning_bit(&self, zone: usize) -> Result<bool> {
        crate::error::check_range("zoning bit", zone, ZONING_BITS)?;
        Ok(self.bits.zoning >> zone & 1 == 1)
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(TriggerError::locked(self))
        } else {
            Ok(())
        }
    }

    /// Add a multiplicity contribution, saturating at 3.
    pub fn add_htm(&mut self, htm: u8) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.htm_pc = (self.bits.htm_pc + htm.min(HTM_MAX)).min(HTM_MAX);
        Ok(())
    }

    pub fn set_zoning_bit(&mut self, zone: usize) -> Result<()> {
        self.ensure_unlocked()?;
        crate::error::check_range("zoning bit", zone, ZONING_BITS)?;
        self.bits.zoning |= 1 << zone;
        Ok(())
    }

    pub fn set_lto(&mut self, lto: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.lto_pc = lto;
        Ok(())
    }

    pub fn set_xt(&mut self, xt: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.xt_pc = xt;
        Ok(())
    }

    pub fn set_control(&mut self, control: u8) -> Result<()> {
        self.ensure_unlocked()?;
        if control > CONTROL_MASK {
            return Err(TriggerError::range("calo CTW control value", control, CONTROL_MASK + 1));
        }
        self.bits.control = control;
        Ok(())
    }
}

impl TriggerRecord for CaloCtw {
    const KIND: RecordKind = RecordKind::CaloCtw;

    fn clocktick(&self) -> Clocktick {
        self.clocktick_25ns
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
        bits_msb_first(self.bits.pack() as u128, CALO_CTW_SIZE)
    }
}

impl fmt::Display for CaloCtw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaloCTW {} @ct25={} [{}]{}",
            self.eid,
            self.clocktick_25ns,
            self.payload_bits(),
            if self.locked { " locked" } else { "" }
        )
    }
}
