//! Error types for SCPI parsing

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Channel name is neither VOLT nor CURR
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Argument is not a floating-point literal
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Request line is not valid UTF-8
    #[error("request is not valid UTF-8")]
    InvalidUtf8,
}
