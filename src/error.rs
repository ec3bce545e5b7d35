//! Umbrella error type.
//!
//! Wraps the subsystem errors so `?` works across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] rondo_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] rondo_midi::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
