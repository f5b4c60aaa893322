//! Per-event trigger chain and the parallel run over a batch of events.

use anyhow::{Context, Result};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use channel_map::{ChannelMap, StandardCabling};
use digitizer::{DigitizedEvent, Digitizer, EventSignals};
use tracker_trigger::{MatrixPool, TrackerMemories};
use trigger_decision::{TriggerEngine, TriggerOutput};
use trigger_model::{Clocktick, ErrorKind, TriggerError};

use crate::config::EmulatorConfig;
use crate::metrics::MetricsCollector;

/// What happened to one event, kept in the run ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Triggered { first_clocktick_1600ns: Clocktick, positive_decisions: usize },
    NoTrigger { decisions: usize },
    Aborted { kind: String, reason: String },
}

impl EventOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, EventOutcome::Aborted { .. })
    }
}

/// Output of one successfully processed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    pub event_id: u64,
    pub trigger: TriggerOutput,
    /// Locked collections, kept only when a dump was requested
    #[serde(skip)]
    pub collections: Option<DigitizedEvent>,
}

/// The whole chain with its shared read-only state.
///
/// Digitizer and engine only hold `Arc`ed tables and copied settings, so a
/// single instance is shared by every rayon worker; each worker brings its
/// own [`MatrixPool`].
pub struct Emulator {
    digitizer: Digitizer,
    engine: TriggerEngine,
    matrix_pool_size: usize,
    metrics: MetricsCollector,
    ledger: DashMap<u64, EventOutcome>,
}

impl Emulator {
    /// Build the channel map, lookup memories and stages once for the run.
    pub fn new(config: &EmulatorConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = ChannelMap::builder(Arc::new(StandardCabling));
        builder.register_all(&config.run.detectors).context("Failed to register detector types")?;
        let map = Arc::new(builder.build());

        let memories = Arc::new(TrackerMemories::from_config(&config.tracker).context("Failed to load tracker memories")?);
        let digitizer = Digitizer::new(map.clone(), config.digitizer())?;
        let engine = TriggerEngine::new(map, memories, config.calorimeter.trigger(), config.coincidence)?;

        info!(
            "Emulator ready: detectors {:?}, pipeline shift {} ticks, gate {} ticks",
            config.run.detectors, config.coincidence.pipeline_shift_ticks, config.coincidence.calorimeter_gate_size
        );
        Ok(Self {
            digitizer,
            engine,
            matrix_pool_size: config.tracker.matrix_pool_size,
            metrics: MetricsCollector::new(),
            ledger: DashMap::new(),
        })
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn engine(&self) -> &TriggerEngine {
        &self.engine
    }

    /// Digitize and evaluate one event. Any error drops everything built so far.
    pub fn process_event(
        &self,
        event: &EventSignals,
        pool: &mut MatrixPool,
    ) -> trigger_model::Result<(DigitizedEvent, TriggerOutput)> {
        let digitized = self.digitizer.digitize(event)?;
        let output = self.engine.evaluate(&digitized.calo_ctws, &digitized.geiger_ctws, pool)?;
        Ok((digitized, output))
    }

    /// Run one event and book its outcome. Returns `None` for an aborted event.
    pub fn run_event(&self, event: &EventSignals, pool: &mut MatrixPool, keep_collections: bool) -> Option<EventResult> {
        match self.process_event(event, pool) {
            Ok((digitized, trigger)) => {
                self.metrics.record_event(&digitized, &trigger);
                let outcome = match trigger.first_trigger() {
                    Some(first) => EventOutcome::Triggered {
                        first_clocktick_1600ns: first.clocktick_1600ns,
                        positive_decisions: trigger.positive_decisions().count(),
                    },
                    None => EventOutcome::NoTrigger { decisions: trigger.decisions.len() },
                };
                debug!("Event {}: {:?}", event.event_id, outcome);
                self.book(event.event_id, outcome);
                Some(EventResult {
                    event_id: event.event_id,
                    trigger,
                    collections: keep_collections.then_some(digitized),
                })
            }
            Err(err) => {
                self.abort(event.event_id, &err);
                None
            }
        }
    }

    fn abort(&self, event_id: u64, err: &TriggerError) {
        let kind = err.kind();
        warn!("Event {} aborted ({}): {}", event_id, kind.as_str(), err);
        self.metrics.record_abort(kind);
        self.book(event_id, EventOutcome::Aborted { kind: kind.as_str().to_string(), reason: err.to_string() });
    }

    fn book(&self, event_id: u64, outcome: EventOutcome) {
        if let Some(previous) = self.ledger.insert(event_id, outcome) {
            warn!("Event id {} appears more than once; earlier outcome {:?} replaced", event_id, previous);
        }
    }

    /// Process every event in parallel; results keep the input order and
    /// leave out aborted events.
    pub fn run(&self, events: &[EventSignals], keep_collections: bool, progress_every: u64) -> Vec<EventResult> {
        events
            .par_iter()
            .map_init(
                || MatrixPool::new(self.matrix_pool_size),
                |pool, event| {
                    let result = self.run_event(event, pool, keep_collections);
                    let seen = self.metrics.events_seen();
                    if progress_every > 0 && seen % progress_every == 0 {
                        info!("{} / {} events processed", seen, events.len());
                    }
                    result
                },
            )
            .flatten()
            .collect()
    }

    /// Outcome of every event seen so far, ordered by event id
    pub fn outcomes(&self) -> Vec<(u64, EventOutcome)> {
        let mut outcomes: Vec<_> = self.ledger.iter().map(|e| (*e.key(), e.value().clone())).collect();
        outcomes.sort_by_key(|(id, _)| *id);
        outcomes
    }

    pub fn outcome(&self, event_id: u64) -> Option<EventOutcome> {
        self.ledger.get(&event_id).map(|e| e.value().clone())
    }

    pub fn aborted_count(&self, kind: ErrorKind) -> usize {
        self.ledger
            .iter()
            .filter(|e| matches!(e.value(), EventOutcome::Aborted { kind: k, .. } if k == kind.as_str()))
            .count()
    }
}

/// Run `events` on a dedicated pool of `threads` workers.
pub fn run_parallel(
    emulator: &Emulator,
    events: &[EventSignals],
    threads: usize,
    keep_collections: bool,
    progress_every: u64,
) -> Result<Vec<EventResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("trigger-worker-{i}"))
        .build()
        .context("Failed to build worker pool")?;
    info!("Processing {} events on {} threads", events.len(), threads);
    Ok(pool.install(|| emulator.run(events, keep_collections, progress_every)))
}
