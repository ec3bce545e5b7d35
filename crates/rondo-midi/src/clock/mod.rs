//! MIDI beat clock (24 pulses per quarter note).
//!
//! - [`MidiClockMaster`]: renders Timing Clock pulses into a block buffer
//! - [`MidiClockSlave`]: estimates tempo from incoming pulse timestamps

mod master;
mod slave;

pub use master::{MidiClockMaster, TransportEdge};
pub use slave::{ClockSlaveEvent, MidiClockSlave};

/// Timing Clock pulses per quarter note.
pub const PULSES_PER_QUARTER: u32 = 24;
