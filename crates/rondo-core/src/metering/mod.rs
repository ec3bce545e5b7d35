//! Per-channel level metering.
//!
//! - [`LevelMeter`]: peak follower with slow decay, one per device channel
//! - [`LevelMeterBank`]: input and output meters, grown to the device layout

mod bank;
mod level;

pub use bank::LevelMeterBank;
pub use level::LevelMeter;
