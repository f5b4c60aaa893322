use serde::{Deserialize, Serialize};

use crate::ids::Eid;
use crate::types::Clocktick;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    CaloTp = 0,
    CaloCtw = 1,
    GeigerTp = 2,
    GeigerCtw = 3,
}

/// Common surface of every clocktick-keyed trigger record.
pub trait TriggerRecord {
    const KIND: RecordKind;

    fn clocktick(&self) -> Clocktick;
    fn eid(&self) -> Eid;
    fn is_locked(&self) -> bool;

    /// Forward-only: a locked record never unlocks.
    fn lock(&mut self);

    /// Fixed-width payload rendered most significant bit first
    fn payload_bits(&self) -> String;

    fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            kind: Self::KIND,
            clocktick: self.clocktick(),
            eid: self.eid(),
            payload: self.payload_bits(),
            locked: self.is_locked(),
        }
    }
}

/// Inspection form of a record: {kind, clocktick, EID, payload bits, lock flag}.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub kind: RecordKind,
    pub clocktick: Clocktick,
    pub eid: Eid,
    pub payload: String,
    pub locked: bool,
}

pub(crate) fn bits_msb_first(value: u128, width: usize) -> String {
    (0..width).rev().map(|i| if (value >> i) & 1 == 1 { '1' } else { '0' }).collect()
}
