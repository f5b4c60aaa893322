//! One event through the digitization chain.

use std::sync::Arc;

use channel_map::ChannelMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trigger_model::{CaloCtwData, CaloTpData, GeigerCtwData, GeigerTpData, Result};

use crate::calo::{CaloCtwBuilder, CaloTpBuilder};
use crate::clock::EventClock;
use crate::config::DigitizerConfig;
use crate::geiger::{GeigerCtwBuilder, GeigerTpBuilder};
use crate::signals::EventSignals;

/// Locked trigger collections of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitizedEvent {
    pub event_id: u64,
    pub calo_tps: CaloTpData,
    pub calo_ctws: CaloCtwData,
    pub geiger_tps: GeigerTpData,
    pub geiger_ctws: GeigerCtwData,
}

/// Runs the TP then CTW builders of both sub-detectors for one event.
///
/// Holds only read-only state, so one instance serves every worker thread.
pub struct Digitizer {
    map: Arc<ChannelMap>,
    config: DigitizerConfig,
}

impl Digitizer {
    pub fn new(map: Arc<ChannelMap>, config: DigitizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { map, config })
    }

    pub fn config(&self) -> &DigitizerConfig {
        &self.config
    }

    pub fn channel_map(&self) -> &Arc<ChannelMap> {
        &self.map
    }

    pub fn event_clock(&self, event: &EventSignals) -> Result<EventClock> {
        EventClock::for_event(&self.config.clock, event.event_id, event.earliest_time_ns().unwrap_or(0.0))
    }

    /// Digitize with the event's own clock.
    pub fn digitize(&self, event: &EventSignals) -> Result<DigitizedEvent> {
        let clock = self.event_clock(event)?;
        self.digitize_with_clock(event, &clock)
    }

    /// Any error leaves nothing behind: partial collections are dropped with
    /// the error.
    pub fn digitize_with_clock(&self, event: &EventSignals, clock: &EventClock) -> Result<DigitizedEvent> {
        let mut calo_tps = CaloTpData::with_capacity(event.calo_signals.len());
        CaloTpBuilder::new(&self.map, self.config.calorimeter).process(clock, &event.calo_signals, &mut calo_tps)?;
        calo_tps.finalize()?;

        let mut calo_ctws = CaloCtwData::new();
        CaloCtwBuilder::new(&self.map).process(&calo_tps, &mut calo_ctws)?;

        let mut geiger_tps = GeigerTpData::new();
        GeigerTpBuilder::new(&self.map).process(clock, &event.tracker_signals, &mut geiger_tps)?;
        geiger_tps.finalize()?;

        let mut geiger_ctws = GeigerCtwData::new();
        GeigerCtwBuilder::process(&geiger_tps, &mut geiger_ctws)?;

        debug!(
            "Event {} digitized: {} calo TPs, {} calo CTWs, {} geiger TPs, {} geiger CTWs",
            event.event_id,
            calo_tps.len(),
            calo_ctws.len(),
            geiger_tps.len(),
            geiger_ctws.len()
        );
        Ok(DigitizedEvent { event_id: event.event_id, calo_tps, calo_ctws, geiger_tps, geiger_ctws })
    }
}
