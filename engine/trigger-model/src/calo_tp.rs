//! Calorimeter trigger primitive: one front-end board at one 25 ns clocktick.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerError};
use crate::ids::{Depth, Eid};
use crate::record::{RecordKind, TriggerRecord, bits_msb_first};
use crate::types::Clocktick;

/// Total payload width
pub const CALO_TP_SIZE: usize = 5;
pub const HTM_MAX: u8 = 3;

// bit positions
pub const TP_HTM_BEGIN: usize = 0;
pub const TP_LTO_BIT: usize = 2;
pub const TP_XT_BIT: usize = 3;
pub const TP_SPARE_BIT: usize = 4;

/// 5-bit TP payload.
///
/// | bits | field |
/// |------|-------|
/// | 0-1  | high-threshold multiplicity (saturates at 3) |
/// | 2    | low-threshold-only |
/// | 3    | external trigger |
/// | 4    | spare |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaloTpBits {
    pub htm: u8,
    pub lto: bool,
    pub xt: bool,
    pub spare: bool,
}

impl CaloTpBits {
    pub fn high_threshold() -> Self {
        Self { htm: 1, ..Default::default() }
    }

    pub fn low_threshold_only() -> Self {
        Self { lto: true, ..Default::default() }
    }

    pub fn pack(&self) -> u8 {
        (self.htm & 0b11)
            | (self.lto as u8) << TP_LTO_BIT
            | (self.xt as u8) << TP_XT_BIT
            | (self.spare as u8) << TP_SPARE_BIT
    }

    pub fn unpack(raw: u8) -> Result<Self> {
        if raw >> CALO_TP_SIZE != 0 {
            return Err(TriggerError::range("calo TP payload bit", (raw.ilog2()) as u64, CALO_TP_SIZE as u64));
        }
        Ok(Self {
            htm: raw & 0b11,
            lto: raw >> TP_LTO_BIT & 1 == 1,
            xt: raw >> TP_XT_BIT & 1 == 1,
            spare: raw >> TP_SPARE_BIT & 1 == 1,
        })
    }

    /// Fold another contribution in: multiplicities add and saturate, flags OR.
    /// Commutative and associative, so arrival order never matters.
    pub fn merge(&mut self, other: &CaloTpBits) {
        self.htm = (self.htm + other.htm).min(HTM_MAX);
        self.lto |= other.lto;
        self.xt |= other.xt;
        self.spare |= other.spare;
    }

    #[inline]
    pub fn is_high_threshold(&self) -> bool {
        self.htm > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaloTp {
    hit_id: u32,
    eid: Eid,
    clocktick_25ns: Clocktick,
    bits: CaloTpBits,
    locked: bool,
}

impl CaloTp {
    /// `eid` must be a board-depth calorimeter identifier.
    pub fn new(hit_id: u32, eid: Eid, clocktick_25ns: Clocktick) -> Result<Self> {
        eid.expect_depth(Depth::Board)?;
        if !eid.kind().is_calorimeter() {
            return Err(TriggerError::resolution(eid, "not a calorimeter board"));
        }
        Ok(Self { hit_id, eid, clocktick_25ns, bits: CaloTpBits::default(), locked: false })
    }

    #[inline]
    pub fn hit_id(&self) -> u32 {
        self.hit_id
    }
    #[inline]
    pub fn bits(&self) -> CaloTpBits {
        self.bits
    }
    #[inline]
    pub fn htm(&self) -> u8 {
        self.bits.htm
    }
    #[inline]
    pub fn is_lto(&self) -> bool {
        self.bits.lto
    }
    #[inline]
    pub fn is_xt(&self) -> bool {
        self.bits.xt
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(TriggerError::locked(self))
        } else {
            Ok(())
        }
    }

    /// Merge a new contribution landing in the same (board, clocktick) bucket.
    pub fn update(&mut self, contribution: &CaloTpBits) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.merge(contribution);
        Ok(())
    }

    pub fn set_htm(&mut self, htm: u8) -> Result<()> {
        self.ensure_unlocked()?;
        if htm > HTM_MAX {
            return Err(TriggerError::range("calo TP multiplicity", htm, HTM_MAX + 1));
        }
        self.bits.htm = htm;
        Ok(())
    }

    pub fn set_lto(&mut self, lto: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.lto = lto;
        Ok(())
    }

    pub fn set_xt(&mut self, xt: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.bits.xt = xt;
        Ok(())
    }
}

impl TriggerRecord for CaloTp {
    const KIND: RecordKind = RecordKind::CaloTp;

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
        bits_msb_first(self.bits.pack() as u128, CALO_TP_SIZE)
    }
}

impl fmt::Display for CaloTp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaloTP#{} {} @ct25={} [{}]{}",
            self.hit_id,
            self.eid,
            self.clocktick_25ns,
            self.payload_bits(),
            if self.locked { " locked" } else { "" }
        )
    }
}
