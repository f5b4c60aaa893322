//! Full trigger evaluation of one event's crate words.

use std::sync::Arc;

use channel_map::ChannelMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracker_trigger::{MatrixPool, TrackerMemories, TrackerRecord, TrackerTriggerAlgorithm};
use trigger_model::error::check_range;
use trigger_model::{ct800_to_ct1600, CaloCtwData, GeigerCtwData, Result};

use crate::calo_algorithm::{CaloTriggerAlgorithm, CaloTriggerRecord};
use crate::coincidence::{CoincidenceAlgorithm, DecisionRecord};
use crate::config::{CaloTriggerConfig, CoincidenceConfig};
use crate::span::{merge_spans, TickSpan};

/// Everything the trigger computed for one event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerOutput {
    /// Per 25 ns tick over the calorimeter crate word span
    pub calo_records: Vec<CaloTriggerRecord>,
    /// Per 1600 ns tick over the decision span
    pub tracker_records: Vec<TrackerRecord>,
    /// Per 1600 ns tick over the decision span
    pub decisions: Vec<DecisionRecord>,
}

impl TriggerOutput {
    pub fn span(&self) -> Option<TickSpan> {
        TickSpan::covering(self.decisions.iter().map(|d| d.clocktick_1600ns))
    }

    pub fn positive_decisions(&self) -> impl Iterator<Item = &DecisionRecord> + '_ {
        self.decisions.iter().filter(|d| d.decision)
    }

    /// First tick with a positive decision
    pub fn first_trigger(&self) -> Option<&DecisionRecord> {
        self.positive_decisions().next()
    }
}

/// Calorimeter, tracker and coincidence stages over shared read-only state.
pub struct TriggerEngine {
    calo: CaloTriggerAlgorithm,
    tracker: TrackerTriggerAlgorithm,
    coincidence: CoincidenceAlgorithm,
}

impl TriggerEngine {
    pub fn new(
        map: Arc<ChannelMap>,
        memories: Arc<TrackerMemories>,
        calo: CaloTriggerConfig,
        coincidence: CoincidenceConfig,
    ) -> Result<Self> {
        Ok(Self {
            calo: CaloTriggerAlgorithm::new(calo)?,
            tracker: TrackerTriggerAlgorithm::new(map, memories),
            coincidence: CoincidenceAlgorithm::new(coincidence)?,
        })
    }

    pub fn coincidence(&self) -> &CoincidenceAlgorithm {
        &self.coincidence
    }

    /// 1600 ns ticks touched by the inputs: aligned calorimeter ticks and
    /// their gates, and the trigger ticks of the Geiger crate words.
    pub fn decision_span(&self, calo_ctws: &CaloCtwData, geiger_ctws: &GeigerCtwData) -> Option<TickSpan> {
        let gate = self.coincidence.config().calorimeter_gate_size;
        let calo = match (calo_ctws.clocktick_min(), calo_ctws.clocktick_max()) {
            (Some(min), Some(max)) => Some(TickSpan::new(
                self.coincidence.aligned_clocktick(min),
                self.coincidence.aligned_clocktick(max).saturating_add(gate),
            )),
            _ => None,
        };
        let tracker = match (geiger_ctws.clocktick_min(), geiger_ctws.clocktick_max()) {
            (Some(min), Some(max)) => Some(TickSpan::new(ct800_to_ct1600(min), ct800_to_ct1600(max))),
            _ => None,
        };
        merge_spans([calo, tracker])
    }

    /// Evaluate every tick of the span; positive ticks do not stop the scan.
    /// A span longer than `max_event_span_ticks` is a range error.
    pub fn evaluate(
        &self,
        calo_ctws: &CaloCtwData,
        geiger_ctws: &GeigerCtwData,
        pool: &mut MatrixPool,
    ) -> Result<TriggerOutput> {
        let span = self.decision_span(calo_ctws, geiger_ctws);
        if let Some(span) = span {
            let max = self.coincidence.config().max_event_span_ticks as usize;
            check_range("event span length", span.len(), max + 1)?;
        }
        let calo_records = self.calo.process(calo_ctws)?;
        let Some(span) = span else {
            return Ok(TriggerOutput { calo_records, ..Default::default() });
        };
        let gates = self.coincidence.calo_gates(&calo_records);
        let geiger_index = geiger_ctws.tick_index();

        let mut tracker_records = Vec::with_capacity(span.len());
        let mut decisions = Vec::with_capacity(span.len());
        for clocktick in span.iter() {
            let tracker = self.tracker.process_tick(&geiger_index, clocktick, pool)?;
            decisions.push(self.coincidence.evaluate(clocktick, gates.get(&clocktick), Some(&tracker)));
            tracker_records.push(tracker);
        }
        debug!(
            "trigger span [{}, {}]: {} calorimeter gates, {} positive decisions",
            span.first,
            span.last,
            gates.len(),
            decisions.iter().filter(|d| d.decision).count()
        );
        Ok(TriggerOutput { calo_records, tracker_records, decisions })
    }
}
