//! Insertion-ordered, lockable record collections.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::calo_ctw::CaloCtw;
use crate::calo_tp::CaloTp;
use crate::error::{Result, TriggerError};
use crate::geiger_ctw::GeigerCtw;
use crate::geiger_tp::GeigerTp;
use crate::ids::Eid;
use crate::record::{RecordSnapshot, TriggerRecord};
use crate::types::Clocktick;

pub type CaloTpData = RecordCollection<CaloTp>;
pub type CaloCtwData = RecordCollection<CaloCtw>;
pub type GeigerTpData = RecordCollection<GeigerTp>;
pub type GeigerCtwData = RecordCollection<GeigerCtw>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordCollection<R> {
    records: Vec<R>,
    locked: bool,
}

impl<R> Default for RecordCollection<R> {
    fn default() -> Self {
        Self { records: Vec::new(), locked: false }
    }
}

impl<R: TriggerRecord + Display> RecordCollection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity), locked: false }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
    #[inline]
    pub fn records(&self) -> &[R] {
        &self.records
    }
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Append a record; refused once the collection is finalized.
    pub fn push(&mut self, record: R) -> Result<&mut R> {
        if self.locked {
            return Err(TriggerError::invariant(format!("collection is locked, cannot add {record}")));
        }
        self.records.push(record);
        let last = self.records.len() - 1;
        Ok(&mut self.records[last])
    }

    /// The still-mutable record for `(eid, clocktick)`, if any.
    pub fn find_unlocked_mut(&mut self, eid: &Eid, clocktick: Clocktick) -> Option<&mut R> {
        self.records
            .iter_mut()
            .find(|r| !r.is_locked() && r.clocktick() == clocktick && r.eid() == *eid)
    }

    pub fn clocktick_min(&self) -> Option<Clocktick> {
        self.records.iter().map(|r| r.clocktick()).min()
    }

    pub fn clocktick_max(&self) -> Option<Clocktick> {
        self.records.iter().map(|r| r.clocktick()).max()
    }

    pub fn at_clocktick(&self, clocktick: Clocktick) -> impl Iterator<Item = &R> + '_ {
        self.records.iter().filter(move |r| r.clocktick() == clocktick)
    }

    pub fn at_clocktick_and_crate(&self, clocktick: Clocktick, crate_id: u8) -> impl Iterator<Item = &R> + '_ {
        self.at_clocktick(clocktick).filter(move |r| r.eid().crate_id() == crate_id)
    }

    /// Records grouped by clocktick, built in one pass.
    pub fn tick_index(&self) -> TickIndex<'_, R> {
        let mut by_tick: BTreeMap<Clocktick, Vec<&R>> = BTreeMap::new();
        for r in &self.records {
            by_tick.entry(r.clocktick()).or_default().push(r);
        }
        TickIndex { by_tick }
    }

    /// No two records may share a (clocktick, EID) pair.
    pub fn check_uniqueness(&self) -> Result<()> {
        let mut seen: HashMap<(Clocktick, Eid), usize> = HashMap::with_capacity(self.records.len());
        for (i, r) in self.records.iter().enumerate() {
            if let Some(&first) = seen.get(&(r.clocktick(), r.eid())) {
                return Err(TriggerError::invariant(format!(
                    "duplicate (clocktick, EID): {} collides with {}",
                    self.records[first], r
                )));
            }
            seen.insert((r.clocktick(), r.eid()), i);
        }
        Ok(())
    }

    /// Validate uniqueness, then lock every record and the collection itself.
    pub fn finalize(&mut self) -> Result<()> {
        if self.locked {
            return Ok(());
        }
        self.check_uniqueness()?;
        for r in &mut self.records {
            r.lock();
        }
        self.locked = true;
        tracing::trace!("finalized {} {:?} records", self.records.len(), R::KIND);
        Ok(())
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            records: self.records.iter().map(|r| r.snapshot()).collect(),
            clocktick_min: self.clocktick_min(),
            clocktick_max: self.clocktick_max(),
            locked: self.locked,
        }
    }
}

impl<'a, R> IntoIterator for &'a RecordCollection<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Borrowed per-clocktick view of a collection.
#[derive(Debug, Clone)]
pub struct TickIndex<'a, R> {
    by_tick: BTreeMap<Clocktick, Vec<&'a R>>,
}

impl<'a, R> TickIndex<'a, R> {
    /// Records at `clocktick`, empty when there are none.
    pub fn at(&self, clocktick: Clocktick) -> &[&'a R] {
        self.by_tick.get(&clocktick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Populated clockticks, ascending.
    pub fn clockticks(&self) -> impl Iterator<Item = Clocktick> + '_ {
        self.by_tick.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tick.is_empty()
    }
}

/// Serialized inspection form of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub records: Vec<RecordSnapshot>,
    pub clocktick_min: Option<Clocktick>,
    pub clocktick_max: Option<Clocktick>,
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calo_tp::CaloTpBits;
    use crate::ids::DetectorType;

    fn board(b: u8) -> Eid {
        Eid::board(DetectorType::MainCalo, 5, 0, b)
    }

    #[test]
    fn clocktick_queries() {
        let mut data = CaloTpData::new();
        assert_eq!(data.clocktick_min(), None);
        data.push(CaloTp::new(0, board(1), 12).unwrap()).unwrap();
        data.push(CaloTp::new(1, board(2), 7).unwrap()).unwrap();
        data.push(CaloTp::new(2, board(1), 9).unwrap()).unwrap();
        assert_eq!(data.clocktick_min(), Some(7));
        assert_eq!(data.clocktick_max(), Some(12));
        assert_eq!(data.at_clocktick(9).count(), 1);
        assert_eq!(data.at_clocktick_and_crate(12, 0).count(), 1);
        assert_eq!(data.at_clocktick_and_crate(12, 1).count(), 0);

        let index = data.tick_index();
        assert_eq!(index.clockticks().collect::<Vec<_>>(), vec![7, 9, 12]);
        assert_eq!(index.at(12).len(), 1);
        assert!(index.at(8).is_empty());
    }

    #[test]
    fn duplicates_fail_finalize_with_both_records() {
        let mut data = CaloTpData::new();
        data.push(CaloTp::new(0, board(1), 12).unwrap()).unwrap();
        data.push(CaloTp::new(1, board(1), 12).unwrap()).unwrap();
        let err = data.finalize().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CaloTP#0") && msg.contains("CaloTP#1"), "{msg}");
        assert!(!data.is_locked());
    }

    #[test]
    fn finalize_locks_everything() {
        let mut data = CaloTpData::new();
        data.push(CaloTp::new(0, board(1), 12).unwrap()).unwrap();
        data.finalize().unwrap();
        assert!(data.is_locked());
        assert!(data.iter().all(|tp| tp.is_locked()));
        assert!(data.find_unlocked_mut(&board(1), 12).is_none());
        assert!(data.push(CaloTp::new(1, board(2), 12).unwrap()).is_err());
        let snap = data.snapshot();
        assert!(snap.locked && snap.records[0].locked);
        assert_eq!(snap.clocktick_min, Some(12));
    }

    #[test]
    fn find_unlocked_merges_in_place() {
        let mut data = CaloTpData::new();
        data.push(CaloTp::new(0, board(1), 12).unwrap()).unwrap();
        let tp = data.find_unlocked_mut(&board(1), 12).unwrap();
        tp.update(&CaloTpBits::high_threshold()).unwrap();
        assert_eq!(data.records()[0].htm(), 1);
        assert!(data.find_unlocked_mut(&board(1), 13).is_none());
    }
}
