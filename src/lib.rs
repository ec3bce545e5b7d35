//! # Rondo - graph-switching audio host engine
//!
//! A real-time engine that hosts several independent processing graphs and
//! switches between them without clicks, driven from a control thread or by
//! MIDI Program Change.
//!
//! ## Architecture
//!
//! Rondo is an umbrella crate over:
//! - **rondo-core** - engine, graph multiplexer, transport, metering
//! - **rondo-midi** - event buffers, panic filter, MIDI clock master/slave, queues
//!
//! ## Quick Start
//!
//! ```ignore
//! use rondo::prelude::*;
//!
//! let engine = AudioEngine::builder()
//!     .settings(EngineSettings {
//!         generate_midi_clock: true,
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! engine.add_graph(GraphHandle::new("intro", intro).with_midi_program(Some(0)))?;
//! engine.add_graph(GraphHandle::new("outro", outro).with_midi_program(Some(1)))?;
//! engine.prepare(48000.0, 256, 2, 2)?;
//!
//! // device callback
//! engine.process_block(&inputs, &mut outputs, 256);
//!
//! // control thread
//! engine.request_current_graph(1);
//! engine.transport().request_play_state(true);
//! ```

/// Re-export of rondo-core for direct access
pub use rondo_core as core;

/// Re-export of rondo-midi for direct access
pub use rondo_midi as midi;

pub use rondo_core::{
    // Lock-free primitives
    AtomicDouble,
    AtomicFlag,
    AtomicFloat,
    AtomicIndex,

    // Engine
    AudioBuffer,
    AudioEngine,
    AudioEngineBuilder,
    ClockRouting,
    ClockSource,
    EngineSettings,
    RunMode,

    // Graphs
    GraphHandle,
    GraphMultiplexer,
    RenderContext,
    RenderMode,
    RootGraph,

    // Metering
    LevelMeter,
    MidiActivityMonitor,

    // Transport
    HostPlayhead,
    TransportHandle,
    TransportMonitor,
    TransportSnapshot,
};

pub use rondo_midi::{
    MidiBuffer, MidiClockMaster, MidiClockSlave, MidiEvent, MidiMessage, MidiOutputConsumer,
    OutgoingMidi, PanicTrigger,
};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        AudioBuffer, AudioEngine, AudioEngineBuilder, ClockRouting, ClockSource, EngineSettings,
        GraphHandle, HostPlayhead, MidiBuffer, MidiEvent, PanicTrigger, RenderContext,
        RenderMode, RootGraph, RunMode, TransportHandle, TransportSnapshot,
    };
    pub use crate::{Error, Result};
}
