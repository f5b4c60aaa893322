//! Trigger emulation service library
//!
//! Wires the digitizer and the trigger decision engine into a batch runner:
//! configuration loading, logging, the parallel per-event pipeline, run
//! metrics and the command line front end of the `trigger-emu` binary.

pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod pipeline;


pub use cli::{Cli, CliHandler, Commands};
pub use config::{load_config, save_config, EmulatorConfig};
pub use logging::{initialize_logging, initialize_logging_with_config};
pub use metrics::{MetricsCollector, RunMetrics};
pub use pipeline::{Emulator, EventOutcome, EventResult};
