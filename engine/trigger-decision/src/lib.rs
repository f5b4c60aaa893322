//! # trigger-decision
//!
//! Final trigger stages. Calorimeter crate words become one
//! [`CaloTriggerRecord`] per 25 ns tick; positive records are aligned on the
//! 1600 ns clock with a fixed pipeline shift, held open over a gate, and
//! matched zone by zone against the tracker records. The [`TriggerEngine`]
//! emits one [`DecisionRecord`] for every tick of the event's span.

pub mod calo_algorithm;
pub mod coincidence;
pub mod config;
pub mod engine;
pub mod span;


pub use calo_algorithm::{CaloTriggerAlgorithm, CaloTriggerRecord};
pub use coincidence::{CaloGate, CoincidenceAlgorithm, DecisionRecord};
pub use config::{CaloTriggerConfig, CoincidenceConfig};
pub use engine::{TriggerEngine, TriggerOutput};
pub use span::TickSpan;
