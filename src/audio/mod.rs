//! Audio level metering
//!
//! Maintains one [`AudioLevelSource`] per metered audio stream, fed
//! asynchronously by the transport's listener callbacks and read
//! synchronously by whoever needs level metrics.

pub mod meter;
pub mod registry;

pub use meter::AudioMeter;
pub use registry::{AudioLevelSource, AudioRegistry, LevelFilter, NO_MATCH_LEVEL};
