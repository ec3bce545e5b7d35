//! Engine configuration.

use rondo_midi::PanicTrigger;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MIN_SAMPLE_RATE: f64 = 8000.0;
pub const MAX_SAMPLE_RATE: f64 = 384000.0;

/// Largest MIDI output offset either way, in milliseconds.
pub const MAX_MIDI_OUT_LATENCY_MS: f64 = 1000.0;

/// Whether the engine drives its own device or runs inside a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Standalone,
    /// Hosted as a plugin; the host owns timing, so no clock is generated.
    Plugin,
}

/// Where tempo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockSource {
    #[default]
    Internal,
    /// Follow incoming MIDI Timing Clock.
    MidiClock,
}

/// Where generated MIDI clock is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockRouting {
    /// Into the graphs' MIDI input, before rendering.
    ToInput,
    /// Into the engine's MIDI output, after rendering.
    #[default]
    ToOutput,
}

/// Immutable settings snapshot, swapped atomically as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub run_mode: RunMode,
    pub clock_source: ClockSource,
    pub generate_midi_clock: bool,
    pub clock_routing: ClockRouting,
    pub panic: Option<PanicTrigger>,
    pub respond_to_start_stop_continue: bool,
    pub midi_out_latency_ms: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Standalone,
            clock_source: ClockSource::Internal,
            generate_midi_clock: false,
            clock_routing: ClockRouting::ToOutput,
            panic: None,
            respond_to_start_stop_continue: false,
            midi_out_latency_ms: 0.0,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        if !(-MAX_MIDI_OUT_LATENCY_MS..=MAX_MIDI_OUT_LATENCY_MS).contains(&self.midi_out_latency_ms)
        {
            return Err(Error::InvalidConfig(format!(
                "midi_out_latency_ms {} out of range (-1000-1000 ms)",
                self.midi_out_latency_ms
            )));
        }
        if let Some(trigger) = &self.panic {
            trigger
                .validate()
                .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        }
        Ok(())
    }

    /// Clock generation as actually applied (never in plugin mode).
    #[inline]
    pub fn generates_midi_clock(&self) -> bool {
        self.generate_midi_clock && self.run_mode == RunMode::Standalone
    }

    /// Clock-to-input routing as actually applied (never in plugin mode).
    #[inline]
    pub fn clock_to_input(&self) -> bool {
        self.generates_midi_clock() && self.clock_routing == ClockRouting::ToInput
    }

    #[inline]
    pub fn follows_midi_clock(&self) -> bool {
        self.clock_source == ClockSource::MidiClock
    }
}

pub(crate) fn validate_device(sample_rate: f64, block_size: usize) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(Error::InvalidConfig(format!(
            "sample_rate {sample_rate} out of range (8000-384000 Hz)"
        )));
    }
    if block_size == 0 {
        return Err(Error::InvalidConfig("block_size must be non-zero".into()));
    }
    Ok(())
}
