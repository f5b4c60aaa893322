//! # trigger-model
//!
//! Data model of the trigger emulator: clock domains and clockticks, electronic
//! and geometric identifiers, the fixed-width calorimeter and Geiger trigger
//! records, and the lockable collections that hold them for one event.
//!
//! Records are created empty by a builder, populated during the event's single
//! pass over its hits, then locked. A locked record never becomes mutable again.

pub mod bitset;
pub mod calo_ctw;
pub mod calo_tp;
pub mod collection;
pub mod error;
pub mod geiger_ctw;
pub mod geiger_tp;
pub mod ids;
pub mod record;
pub mod types;

#[cfg(test)]
mod tests;

pub use bitset::Bitset;
pub use calo_ctw::{CaloCtw, CaloCtwBits};
pub use calo_tp::{CaloTp, CaloTpBits, HTM_MAX};
pub use collection::{
    CaloCtwData, CaloTpData, CollectionSnapshot, GeigerCtwData, GeigerTpData, RecordCollection, TickIndex,
};
pub use error::{ErrorKind, Result, TriggerError};
pub use geiger_ctw::GeigerCtw;
pub use geiger_tp::{GeigerBlock, GeigerTp};
pub use ids::{DetectorType, Depth, Eid, Gid};
pub use record::{RecordKind, RecordSnapshot, TriggerRecord};
pub use types::{
    ClockDomain, Clocktick, INVALID_CLOCKTICK, NSIDES, Side, ct25_to_ct1600, ct800_to_ct1600,
};
