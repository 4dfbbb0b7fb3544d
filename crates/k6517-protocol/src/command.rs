//! Typed command representation
//!
//! This module provides the `ScpiCommand` enum which every request line is
//! parsed into, and `ChannelName` which identifies a measurement function.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Measurement functions supported by the emulated electrometer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelName {
    /// DC voltage
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "VOLT", alias = "volt"))]
    Volt,
    /// DC current
    #[cfg_attr(feature = "serde", serde(rename = "CURR", alias = "curr"))]
    Curr,
}

impl ChannelName {
    /// Every channel, in construction order
    pub const ALL: [ChannelName; 2] = [ChannelName::Volt, ChannelName::Curr];

    /// Uppercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volt => "VOLT",
            Self::Curr => "CURR",
        }
    }

    /// Position of this channel in [`ChannelName::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Self::Volt => 0,
            Self::Curr => 1,
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelName {
    type Err = ParseError;

    /// Channel names are matched case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownChannel(s.to_string()))
    }
}

/// A parsed request line
///
/// Mode arguments are kept as the text that appeared on the wire so the
/// device can report an unknown mode through its error queue instead of the
/// parser rejecting it.
#[derive(Debug, Clone, PartialEq)]
pub enum ScpiCommand {
    /// Query selected function: `FUNC?`
    GetFunction,
    /// Trigger and return one reading: `READ?`
    Read,
    /// Query range: `VOLT:DC:RANGE?`
    GetRange { mode: String },
    /// Clear the error queue: `*CLS`
    ClearStatus,
    /// Select function: `FUNC 'CURR:DC'`
    SetFunction { mode: String },
    /// Set range: `CURR:DC:RANG 0.02`
    SetRange { mode: String, value: f64 },
    /// Pop the oldest error: `:SYST:ERR?`
    SystemError,
    /// Pop the oldest error: `:STAT:QUE?`
    StatusQueue,
    /// Unrecognized line
    Unknown(String),
}
