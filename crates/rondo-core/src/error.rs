//! Error types for rondo-core.

use thiserror::Error;

/// Error type for rondo-core operations.
///
/// Only control-thread operations are fallible. The render path never
/// returns an error; it falls back to silence.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid tempo: {0}. Must be between 20.0 and 999.0 BPM")]
    InvalidTempo(f32),

    #[error("Invalid time signature: {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u32, denominator: u32 },

    #[error("Graph '{0}' is already registered")]
    GraphAlreadyAdded(String),

    #[error("Graph '{0}' is not registered")]
    GraphNotFound(String),

    #[error("MIDI: {0}")]
    Midi(#[from] rondo_midi::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
