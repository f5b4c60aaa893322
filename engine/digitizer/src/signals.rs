//! Per-channel signal records delivered by the signal source.

use serde::{Deserialize, Serialize};
use trigger_model::Gid;

/// Calorimeter signal: block, time of the leading edge, deposited amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaloSignal {
    pub gid: Gid,
    pub time_ns: f64,
    pub amplitude: f64,
    /// Set by the external trigger input of the front-end board
    #[serde(default)]
    pub external_trigger: bool,
}

/// Geiger cell signal: cell and anode avalanche time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeigerSignal {
    pub gid: Gid,
    pub time_ns: f64,
}

/// Every signal of one event, in arrival order (no ordering is assumed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSignals {
    pub event_id: u64,
    #[serde(default)]
    pub calo_signals: Vec<CaloSignal>,
    #[serde(default)]
    pub tracker_signals: Vec<GeigerSignal>,
}

impl EventSignals {
    pub fn new(event_id: u64) -> Self {
        Self { event_id, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.calo_signals.is_empty() && self.tracker_signals.is_empty()
    }

    /// Earliest signal time over both sub-detectors
    pub fn earliest_time_ns(&self) -> Option<f64> {
        self.calo_signals
            .iter()
            .map(|s| s.time_ns)
            .chain(self.tracker_signals.iter().map(|s| s.time_ns))
            .filter(|t| t.is_finite())
            .reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_time_spans_both_detectors() {
        let mut event = EventSignals::new(7);
        assert_eq!(event.earliest_time_ns(), None);
        event.calo_signals.push(CaloSignal {
            gid: Gid::MainCalo { side: 0, column: 0, row: 0 },
            time_ns: 40.0,
            amplitude: 1.0,
            external_trigger: false,
        });
        event.tracker_signals.push(GeigerSignal { gid: Gid::TrackerCell { side: 0, layer: 0, row: 0 }, time_ns: 12.5 });
        assert_eq!(event.earliest_time_ns(), Some(12.5));
        assert!(!event.is_empty());
    }
}
