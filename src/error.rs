//! Crate-wide typed error for the chord-recognition pipeline.
//!
//! The core pipeline (`catalog`, `features`, `scorer`, `decoder`) never produces stringly-typed
//! errors: callers that need to branch on *kind* (a user fat-fingered `precision`, vs. an
//! adapter handed back a meter we can't classify) can match on [`Error`] directly instead of
//! parsing message text.

use thiserror::Error;

/// Errors produced by the chord-recognition pipeline.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// `1 / precision` was not an integer.
    #[error("precision {precision} does not divide 1.0 into a whole number of frames per beat")]
    InvalidPrecision {
        /// The offending precision value.
        precision: f32,
    },

    /// A time signature's numerator was neither a multiple of 3 nor a power of 2.
    #[error("time signature with {beats} beats per measure is neither a triple nor a duple meter")]
    InvalidMeter {
        /// The unsupported numerator.
        beats: u8,
    },

    /// The MIDI loader (feature `midi`) failed to read or parse a file.
    #[error("failed to read MIDI file: {0}")]
    Midi(String),

    /// An I/O error surfaced while loading a score from disk.
    #[error(transparent)]
    Io(#[from] IoErrorWrapper),
}

/// `std::io::Error` does not implement `PartialEq`, so it is wrapped to keep `Error: PartialEq`
/// for tests that compare recognition errors by value.
#[derive(Debug)]
pub struct IoErrorWrapper(pub std::io::Error);

impl std::fmt::Display for IoErrorWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoErrorWrapper {}

impl PartialEq for IoErrorWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(IoErrorWrapper(value))
    }
}

/// Result type used throughout the core pipeline.
pub type Result<T> = std::result::Result<T, Error>;
