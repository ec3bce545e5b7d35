//! Error types for the MIDI subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    Parse(String),

    #[error("Unsupported MIDI message: {0}")]
    Unsupported(&'static str),

    #[error("Invalid panic trigger: {0}")]
    InvalidPanicTrigger(String),
}

impl From<midi_msg::ParseError> for Error {
    fn from(e: midi_msg::ParseError) -> Self {
        Error::Parse(format!("{e:?}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
