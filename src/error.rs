//! Error types for window buffering and rendering

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Window/buffer error type
#[derive(Error, Debug)]
pub enum Error {
    /// Appending would exceed the buffer capacity and auto-flush is off
    /// (or a single unit is larger than a strict buffer can ever hold)
    #[error("buffer overflow: {requested} chars would exceed capacity {capacity}")]
    BufferOverflow { capacity: usize, requested: usize },

    /// Escape sequence matched the denylist
    #[error("denied escape sequence: {sequence:?}")]
    DeniedCommand { sequence: String },

    /// Escape introducer not followed by any whitelisted sequence
    #[error("unsupported escape sequence: {sequence:?}")]
    UnsupportedSequence { sequence: String },

    /// Text recorded with a width other than the store's
    #[error("scrollback width mismatch: store is {expected} columns, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A forced wrap could not fit a single character
    #[error("zone of width {width} cannot fit a single character")]
    ZoneOverflow { width: usize },

    /// Flush policy flags cannot be changed on this buffer
    #[error("buffer flags are locked")]
    FlagsLocked,

    /// The window stopped emitting after an earlier fatal error
    #[error("window halted after a fatal zone error")]
    WindowHalted,

    /// Zone geometry is unusable
    #[error("invalid zone: {0}")]
    InvalidZone(String),

    /// I/O error while writing to the terminal
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error leaves the owning window unable to continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ZoneOverflow { .. } | Error::WidthMismatch { .. })
    }
}

/// Result type for window operations
pub type Result<T> = std::result::Result<T, Error>;
