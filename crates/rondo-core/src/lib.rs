//! Real-time core of the rondo host engine.
//!
//! # Primary API
//!
//! - [`AudioEngine`] / [`AudioEngineBuilder`]: device callback and control surface
//! - [`GraphHandle`] / [`RootGraph`]: the processing graphs the engine switches between
//! - [`GraphMultiplexer`]: active-graph selection, crossfades and program changes
//! - [`TransportHandle`]: deferred play/record/tempo/meter/locate requests
//! - [`LevelMeter`]: per-channel peak meters
//! - [`MidiActivityMonitor`]: MIDI in/out activity for UI indicators
//!
//! # Example
//!
//! ```ignore
//! use rondo_core::{AudioEngine, GraphHandle};
//!
//! let engine = AudioEngine::builder().tempo(98.0).build()?;
//! engine.add_graph(GraphHandle::new("verse", verse_graph))?;
//! engine.add_graph(GraphHandle::new("chorus", chorus_graph))?;
//! engine.prepare(48000.0, 256, 2, 2)?;
//!
//! // device callback
//! engine.process_block(&inputs, &mut outputs, 256);
//!
//! // control thread
//! engine.request_current_graph(1);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod buffer;
pub use buffer::AudioBuffer;

pub mod config;
pub use config::{ClockRouting, ClockSource, EngineSettings, RunMode};

mod context;
pub use context::RenderContext;

mod engine;
pub use engine::{AudioEngine, AudioEngineBuilder};

pub mod graph;
pub use graph::{GraphHandle, RenderMode, RootGraph};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat, AtomicIndex};

pub mod metering;
pub use metering::{LevelMeter, LevelMeterBank};

pub mod multiplexer;
pub use multiplexer::{GraphMultiplexer, ProgramRequest, GRAPH_CAPACITY};

mod notify;
pub use notify::{ActiveGraphNotifier, LatencyNotifier, MidiActivityMonitor};

pub mod transport;
pub use transport::{
    HostPlayhead, Transport, TransportHandle, TransportMonitor, TransportSnapshot,
    DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO,
};

/// Re-export of the MIDI subsystem.
pub use rondo_midi as midi;
