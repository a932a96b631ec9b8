//! Error types for the command link.

use std::time::Duration;

use mesamate_route::DirectionCommand;

use crate::state::Phase;

/// Result type alias
pub type Result<T> = std::result::Result<T, LinkError>;

/// Command-link and execution errors.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error while reading or writing the channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener reported a read failure
    #[error("read failed: {0}")]
    Read(String),

    /// The transport accepted fewer bytes than the command line
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// No acknowledgment arrived within the configured wait
    #[error("no acknowledgment for `{command}` after {waited:?}")]
    AckTimeout {
        command: DirectionCommand,
        waited: Duration,
    },

    /// A run is already in progress
    #[error("a delivery run is already in progress ({0:?})")]
    Busy(Phase),

    /// The operation needs an idle controller
    #[error("operation requires an idle controller, currently {0:?}")]
    NotIdle(Phase),

    /// No serial port could be opened
    #[error("no usable serial port among {0:?}")]
    NoPort(Vec<String>),
}
