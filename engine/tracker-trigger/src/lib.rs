//! # tracker-trigger
//!
//! Tracker half of the trigger: Geiger crate words are decoded back to hit
//! cells, accumulated into a side x layer x row [`HitMatrix`] per 1600 ns tick,
//! then reduced zone by zone through [`LookupMemory`] tables into pattern
//! words and track classes.
//!
//! Each tick runs on its own [`TickFrame`]; matrices are recycled through a
//! [`MatrixPool`] only after the frame has been consumed.

pub mod algorithm;
pub mod config;
pub mod frame;
pub mod matrix;
pub mod memory;
pub mod pool;
pub mod sliding;
pub mod zones;


pub use algorithm::TrackerTriggerAlgorithm;
pub use config::{TrackerConfig, TrackerMemories};
pub use frame::{FrameState, TickFrame, TrackerRecord};
pub use matrix::{HitMatrix, NLAYERS, NROWS};
pub use memory::{LookupMemory, TrackClass};
pub use pool::{MatrixPool, PoolStats};
pub use sliding::{SlidingZoneOutput, SLIDING_ZONES_PER_SIDE};
pub use zones::{ZoneOutput, ZONES_PER_SIDE};

/// Zone and sliding zone row ranges, one line each.
pub fn layout_report() -> String {
    let mut out = String::from("Zone layout:\n#zone rows #width\n");
    for zone in 0..ZONES_PER_SIDE {
        out.push_str(&format!(
            "{zone} {}-{} #{}\n",
            zones::zone_start_row(zone),
            zones::zone_stop_row(zone),
            zones::zone_width(zone)
        ));
    }
    out.push_str("\nSliding zone layout:\n#szone rows #width\n");
    for index in 0..SLIDING_ZONES_PER_SIDE {
        out.push_str(&format!(
            "{index} {}-{} #{}\n",
            sliding::sliding_zone_start_row(index),
            sliding::sliding_zone_stop_row(index),
            sliding::sliding_zone_width(index)
        ));
    }
    out
}
