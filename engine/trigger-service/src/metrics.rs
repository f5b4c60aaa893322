//! Run metrics for the emulator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use digitizer::DigitizedEvent;
use trigger_decision::TriggerOutput;
use trigger_model::ErrorKind;

const ERROR_KINDS: [ErrorKind; 5] =
    [ErrorKind::Configuration, ErrorKind::Resolution, ErrorKind::Invariant, ErrorKind::Range, ErrorKind::Io];

fn kind_index(kind: ErrorKind) -> usize {
    match kind {
        ErrorKind::Configuration => 0,
        ErrorKind::Resolution => 1,
        ErrorKind::Invariant => 2,
        ErrorKind::Range => 3,
        ErrorKind::Io => 4,
    }
}

/// Metrics of one run, as exported in the run report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Events that went through the whole chain
    pub events_processed: u64,

    /// Events dropped on a construction or evaluation error
    pub events_aborted: u64,

    /// Aborted events per error kind
    pub aborted_by_kind: BTreeMap<String, u64>,

    /// Processed events with at least one positive decision
    pub events_triggered: u64,

    pub calo_tps: u64,
    pub calo_ctws: u64,
    pub geiger_tps: u64,
    pub geiger_ctws: u64,

    /// 1600 ns ticks evaluated by the tracker trigger
    pub tracker_ticks: u64,

    pub positive_decisions: u64,

    /// Wall time of the run in milliseconds
    pub wall_time_ms: u64,

    /// Processed events per second of wall time
    pub event_rate_hz: f64,
}

/// Lock-free collector shared by every worker
pub struct MetricsCollector {
    events_processed: AtomicU64,
    events_aborted: AtomicU64,
    aborted_by_kind: [AtomicU64; ERROR_KINDS.len()],
    events_triggered: AtomicU64,
    calo_tps: AtomicU64,
    calo_ctws: AtomicU64,
    geiger_tps: AtomicU64,
    geiger_ctws: AtomicU64,
    tracker_ticks: AtomicU64,
    positive_decisions: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            events_aborted: AtomicU64::new(0),
            aborted_by_kind: Default::default(),
            events_triggered: AtomicU64::new(0),
            calo_tps: AtomicU64::new(0),
            calo_ctws: AtomicU64::new(0),
            geiger_tps: AtomicU64::new(0),
            geiger_ctws: AtomicU64::new(0),
            tracker_ticks: AtomicU64::new(0),
            positive_decisions: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a fully processed event
    pub fn record_event(&self, digitized: &DigitizedEvent, output: &TriggerOutput) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        self.calo_tps.fetch_add(digitized.calo_tps.len() as u64, Ordering::Relaxed);
        self.calo_ctws.fetch_add(digitized.calo_ctws.len() as u64, Ordering::Relaxed);
        self.geiger_tps.fetch_add(digitized.geiger_tps.len() as u64, Ordering::Relaxed);
        self.geiger_ctws.fetch_add(digitized.geiger_ctws.len() as u64, Ordering::Relaxed);
        self.tracker_ticks.fetch_add(output.tracker_records.len() as u64, Ordering::Relaxed);

        let positive = output.positive_decisions().count() as u64;
        self.positive_decisions.fetch_add(positive, Ordering::Relaxed);
        if positive > 0 {
            self.events_triggered.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an aborted event
    pub fn record_abort(&self, kind: ErrorKind) {
        self.events_aborted.fetch_add(1, Ordering::Relaxed);
        self.aborted_by_kind[kind_index(kind)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_seen(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed) + self.events_aborted.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current metrics
    pub fn snapshot(&self) -> RunMetrics {
        let elapsed = self.elapsed();
        let events_processed = self.events_processed.load(Ordering::Relaxed);
        let event_rate_hz = if elapsed.as_secs_f64() > 0.0 {
            events_processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let aborted_by_kind = ERROR_KINDS
            .iter()
            .map(|&kind| (kind.as_str().to_string(), self.aborted_by_kind[kind_index(kind)].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        RunMetrics {
            events_processed,
            events_aborted: self.events_aborted.load(Ordering::Relaxed),
            aborted_by_kind,
            events_triggered: self.events_triggered.load(Ordering::Relaxed),
            calo_tps: self.calo_tps.load(Ordering::Relaxed),
            calo_ctws: self.calo_ctws.load(Ordering::Relaxed),
            geiger_tps: self.geiger_tps.load(Ordering::Relaxed),
            geiger_ctws: self.geiger_ctws.load(Ordering::Relaxed),
            tracker_ticks: self.tracker_ticks.load(Ordering::Relaxed),
            positive_decisions: self.positive_decisions.load(Ordering::Relaxed),
            wall_time_ms: elapsed.as_millis() as u64,
            event_rate_hz,
        }
    }
}
