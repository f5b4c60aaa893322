//! # digitizer
//!
//! Turns the per-channel signals of one event into locked trigger collections:
//! calorimeter TPs at 25 ns, calorimeter crate words, Geiger TPs at 800 ns and
//! Geiger crate words. Continuous times are quantized through a per-event
//! [`EventClock`].

pub mod calo;
pub mod clock;
pub mod config;
pub mod event;
pub mod geiger;
pub mod signals;


pub use calo::{CaloCtwBuilder, CaloTpBuilder, calo_crate_eid, discriminate};
pub use clock::{ClockConfig, ClocktickWidths, EventClock};
pub use config::{CaloThresholds, DigitizerConfig};
pub use event::{DigitizedEvent, Digitizer};
pub use geiger::{GeigerCtwBuilder, GeigerTpBuilder};
pub use signals::{CaloSignal, EventSignals, GeigerSignal};
