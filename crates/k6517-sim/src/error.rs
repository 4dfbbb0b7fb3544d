//! Error types for the simulated device

use thiserror::Error;

/// Device error codes as reported through the error queue
pub mod codes {
    /// Queue empty
    pub const NO_ERROR: i32 = 0;
    /// A consumed reading exceeded the configured range
    pub const PARAMETER_OUT_OF_RANGE: i32 = -222;
    /// Unknown channel argument
    pub const PROGRAM_SYNTAX_ERROR: i32 = -285;
    /// Errors were dropped because the queue is full
    pub const QUEUE_OVERFLOW: i32 = -350;
}

/// Errors returned by device operations that take a channel name
///
/// These are also recorded in the device error queue; the `Result` only tells
/// the caller the operation had no effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Channel name is neither VOLT nor CURR
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

impl DeviceError {
    /// Error queue code for this error
    pub fn code(&self) -> i32 {
        match self {
            DeviceError::UnknownChannel(_) => codes::PROGRAM_SYNTAX_ERROR,
        }
    }
}

/// Errors that can occur while serving a simulated device
#[derive(Debug, Error)]
pub enum SimError {
    /// I/O error on a session stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device actor has stopped
    #[error("device actor is not running")]
    ActorClosed,
}
