use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use trigger_model::{Depth, DetectorType, Eid, GeigerCtw, Gid, Result, TriggerError, TriggerRecord};

use crate::cabling::GeometryProvider;

/// One bijection table for a detector type
#[derive(Debug, Default)]
struct TypeTable {
    gid_to_eid: HashMap<Gid, Eid>,
    eid_to_gid: HashMap<Eid, Gid>,
    /// Calorimeter zone per board-depth EID
    board_zones: HashMap<Eid, usize>,
}

/// Collects the detector types to register; `build` freezes the result.
pub struct ChannelMapBuilder {
    provider: Arc<dyn GeometryProvider>,
    tables: HashMap<DetectorType, TypeTable>,
}

impl ChannelMapBuilder {
    pub fn new(provider: Arc<dyn GeometryProvider>) -> Self {
        Self { provider, tables: HashMap::new() }
    }

    /// Pre-build the bijection table for `kind` from the geometry provider.
    pub fn register(&mut self, kind: DetectorType) -> Result<&mut Self> {
        if self.tables.contains_key(&kind) {
            return Err(TriggerError::config(format!("detector type {kind} registered twice")));
        }
        let elements = self.provider.elements(kind);
        if elements.is_empty() {
            return Err(TriggerError::config(format!(
                "geometry provider supplies no element of type {kind}"
            )));
        }

        let mut table = TypeTable::default();
        for gid in elements {
            if gid.detector_type() != kind {
                return Err(TriggerError::config(format!("{gid} listed under detector type {kind}")));
            }
            let eid = self.provider.cable(&gid)?;
            if eid.kind() != kind || eid.depth() != Depth::Channel {
                return Err(TriggerError::config(format!("{gid} cabled to {eid}, expected a {kind} channel")));
            }
            if let Some(other) = table.eid_to_gid.insert(eid, gid) {
                return Err(TriggerError::config(format!("{eid} cabled to both {other} and {gid}")));
            }
            if table.gid_to_eid.insert(gid, eid).is_some() {
                return Err(TriggerError::config(format!("{gid} listed twice")));
            }
            if kind.is_calorimeter() {
                let zone = self
                    .provider
                    .zone(&gid)
                    .ok_or_else(|| TriggerError::config(format!("calorimeter element {gid} has no zone")))?;
                let board = eid.truncate(Depth::Board)?;
                match table.board_zones.insert(board, zone) {
                    Some(previous) if previous != zone => {
                        return Err(TriggerError::config(format!(
                            "{board} spans zones {previous} and {zone}"
                        )));
                    }
                    _ => {}
                }
            }
        }
        debug!("Registered {} channels for detector type {}", table.gid_to_eid.len(), kind);
        self.tables.insert(kind, table);
        Ok(self)
    }

    pub fn register_all(&mut self, kinds: &[DetectorType]) -> Result<&mut Self> {
        for &kind in kinds {
            self.register(kind)?;
        }
        Ok(self)
    }

    /// Freeze the tables. The resulting map is read-only and safe to share
    /// across worker threads.
    pub fn build(self) -> ChannelMap {
        let mut kinds: Vec<_> = self.tables.keys().copied().collect();
        kinds.sort();
        info!("Channel map frozen with detector types {:?}", kinds);
        ChannelMap { tables: self.tables }
    }
}

/// Immutable GID <-> EID translation, one bijection per registered detector type.
#[derive(Debug)]
pub struct ChannelMap {
    tables: HashMap<DetectorType, TypeTable>,
}

impl ChannelMap {
    pub fn builder(provider: Arc<dyn GeometryProvider>) -> ChannelMapBuilder {
        ChannelMapBuilder::new(provider)
    }

    pub fn is_registered(&self, kind: DetectorType) -> bool {
        self.tables.contains_key(&kind)
    }

    pub fn registered_types(&self) -> Vec<DetectorType> {
        let mut kinds: Vec<_> = self.tables.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Number of channels registered for `kind` (0 when not registered)
    pub fn channel_count(&self, kind: DetectorType) -> usize {
        self.tables.get(&kind).map_or(0, |t| t.gid_to_eid.len())
    }

    fn table(&self, kind: DetectorType, id: impl std::fmt::Display) -> Result<&TypeTable> {
        self.tables
            .get(&kind)
            .ok_or_else(|| TriggerError::resolution(id, format!("detector type {kind} is not registered")))
    }

    /// Channel-depth EID of a geometric element.
    pub fn resolve_gid(&self, gid: &Gid) -> Result<Eid> {
        let table = self.table(gid.detector_type(), gid)?;
        table
            .gid_to_eid
            .get(gid)
            .copied()
            .ok_or_else(|| TriggerError::resolution(gid, "unknown element"))
    }

    /// Geometric element of a channel-depth EID.
    pub fn resolve_eid(&self, eid: &Eid) -> Result<Gid> {
        let table = self.table(eid.kind(), eid)?;
        eid.expect_depth(Depth::Channel)?;
        table
            .eid_to_gid
            .get(eid)
            .copied()
            .ok_or_else(|| TriggerError::resolution(eid, "unknown channel"))
    }

    /// Calorimeter trigger zone of a board- or channel-depth EID.
    pub fn zone_of(&self, eid: &Eid) -> Result<usize> {
        let table = self.table(eid.kind(), eid)?;
        if !eid.kind().is_calorimeter() {
            return Err(TriggerError::resolution(eid, "zones are defined for calorimeter boards only"));
        }
        let board = eid.truncate(Depth::Board)?;
        table
            .board_zones
            .get(&board)
            .copied()
            .ok_or_else(|| TriggerError::resolution(eid, "board has no zone"))
    }

    /// Cell GIDs of every wire hit in a Geiger crate word, slot order.
    pub fn decode_geiger_ctw(&self, ctw: &GeigerCtw) -> Result<Vec<Gid>> {
        let crate_eid = ctw.eid();
        ctw.hit_channels()?
            .into_iter()
            .map(|(board, wire)| {
                self.resolve_eid(&Eid::new(crate_eid.kind(), crate_eid.rack(), crate_eid.crate_id(), board, wire))
            })
            .collect()
    }

    /// All channel-depth EIDs of a registered type, in no particular order
    pub fn eids(&self, kind: DetectorType) -> impl Iterator<Item = &Eid> + '_ {
        self.tables.get(&kind).into_iter().flat_map(|t| t.eid_to_gid.keys())
    }

    /// All GIDs of a registered type, in no particular order
    pub fn gids(&self, kind: DetectorType) -> impl Iterator<Item = &Gid> + '_ {
        self.tables.get(&kind).into_iter().flat_map(|t| t.gid_to_eid.keys())
    }
}
