//! # channel-map
//!
//! Translates geometric identifiers of detector elements into electronic
//! identifiers of readout channels and back. One bijection table is built per
//! detector type at initialize time; the frozen [`ChannelMap`] is then shared
//! read-only (behind an `Arc`) by every event worker.

pub mod cabling;
pub mod layout;
pub mod registry;


pub use cabling::{GeometryProvider, StandardCabling};
pub use registry::{ChannelMap, ChannelMapBuilder};

use std::sync::Arc;

use trigger_model::{DetectorType, Result};

/// Channel map of the standard cabling with every detector type registered.
pub fn standard_channel_map() -> Result<ChannelMap> {
    let mut builder = ChannelMap::builder(Arc::new(StandardCabling));
    builder.register_all(&DetectorType::ALL)?;
    Ok(builder.build())
}
