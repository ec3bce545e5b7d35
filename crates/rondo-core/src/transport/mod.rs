//! Shared musical transport.
//!
//! - [`Transport`]: owned by the engine state, mutated only inside the callback
//! - [`TransportHandle`]: cloneable control-thread handle (deferred requests)
//! - [`TransportMonitor`]: lock-free published state for observers

pub(crate) mod handle;
pub(crate) mod manager;

pub use handle::{TransportHandle, TransportMonitor};
pub use manager::Transport;

use crate::{Error, Result};

pub const MIN_TEMPO: f32 = 20.0;
pub const MAX_TEMPO: f32 = 999.0;
pub const DEFAULT_TEMPO: f32 = 120.0;

/// Immutable view of the transport for one render block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub playing: bool,
    pub recording: bool,
    pub position_frames: i64,
    pub tempo: f32,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
    pub sample_rate: f64,
}

impl Default for TransportSnapshot {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            position_frames: 0,
            tempo: DEFAULT_TEMPO,
            beats_per_bar: 4,
            beat_unit: 4,
            sample_rate: 44100.0,
        }
    }
}

impl TransportSnapshot {
    /// Position in quarter-note beats.
    pub fn position_beats(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.position_frames as f64 / self.sample_rate * self.tempo as f64 / 60.0
    }
}

/// What a plugin host reports about its own playhead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostPlayhead {
    pub tempo: Option<f32>,
    pub time_signature: Option<(u32, u32)>,
    pub playing: bool,
    pub recording: bool,
    pub position_frames: Option<i64>,
}

pub(crate) fn validate_tempo(bpm: f32) -> Result<()> {
    if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
        return Err(Error::InvalidTempo(bpm));
    }
    Ok(())
}

pub(crate) fn validate_meter(numerator: u32, denominator: u32) -> Result<()> {
    let numerator_ok = (1..=64).contains(&numerator);
    let denominator_ok = (1..=32).contains(&denominator) && denominator.is_power_of_two();
    if !numerator_ok || !denominator_ok {
        return Err(Error::InvalidTimeSignature {
            numerator,
            denominator,
        });
    }
    Ok(())
}
