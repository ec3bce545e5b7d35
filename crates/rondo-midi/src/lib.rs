//! MIDI subsystem for the rondo engine.
//!
//! Everything in here is shaped for the audio callback: fixed-capacity
//! buffers, no allocation once constructed, and lock-free queues between the
//! device threads and the render thread.
//!
//! # Contents
//!
//! - **Events**: [`MidiEvent`] with a sample offset inside the current block
//! - **Block buffers**: [`MidiBuffer`], sorted by offset, bounded capacity
//! - **Panic**: [`MidiPanic`] and [`write_kill_burst`] to silence hanging notes
//! - **Clock**: [`MidiClockMaster`] (24 ppqn generator) and [`MidiClockSlave`]
//!   (tempo follower)
//! - **Queues**: device input into the callback, callback output to the driver
//!
//! # Example
//!
//! ```ignore
//! use rondo_midi::{MidiBuffer, MidiClockMaster, TransportEdge};
//!
//! let mut clock = MidiClockMaster::new(48000.0);
//! clock.set_tempo(120.0);
//!
//! let mut midi = MidiBuffer::new();
//! clock.render(&mut midi, 512, Some(TransportEdge::Start));
//! ```

pub mod error;
pub use error::{Error, Result};

pub use buffer::MidiBuffer;
pub use clock::{
    ClockSlaveEvent, MidiClockMaster, MidiClockSlave, TransportEdge, PULSES_PER_QUARTER,
};
pub use event::{MidiEvent, MidiMessage};
pub use panic::{write_kill_burst, MidiPanic, PanicTrigger, KILL_BURST_LEN};
pub use queue::{
    default_midi_input_queue, default_midi_output_queue, midi_input_queue, midi_output_queue,
    MidiInputConsumer, MidiInputProducer, MidiOutputConsumer, MidiOutputProducer, OutgoingMidi,
};

// Re-export essential upstream types (users shouldn't need to import midi-msg directly)
pub use midi_msg::{
    Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg, SystemRealTimeMsg,
};

pub(crate) mod buffer;
pub(crate) mod clock;
pub(crate) mod event;
pub(crate) mod panic;

pub mod queue;
