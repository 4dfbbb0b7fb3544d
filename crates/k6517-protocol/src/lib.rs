//! Keithley 6517 Protocol Library
//!
//! This crate provides parsing and encoding for the subset of the Keithley
//! 6517 SCPI command set understood by the emulator:
//!
//! - **Grammar**: an ordered list of pure matchers, first match wins
//! - **Framing**: line-terminated text in both directions (`\r\n` by default)
//! - **Formatting**: decimal replies where integral floats keep a `.0`
//!
//! # Architecture
//!
//! - [`grammar`] turns one request line into a typed [`ScpiCommand`]
//! - [`codec::LineCodec`] splits a byte stream into lines and parses them
//! - [`format`] renders reply values the way consumers expect them
//!
//! Unrecognized lines become [`ScpiCommand::Unknown`] so callers can drop
//! them without treating them as errors.
//!
//! # Example
//!
//! ```rust
//! use k6517_protocol::{ChannelName, LineCodec, ProtocolCodec, ScpiCommand};
//!
//! let mut codec = LineCodec::new("\r\n");
//! codec.push_bytes(b"VOLT:DC:RANG 10\r\nREAD?\r\n");
//!
//! assert_eq!(
//!     codec.next_command(),
//!     Some(ScpiCommand::SetRange { mode: "VOLT".into(), value: 10.0 })
//! );
//! assert_eq!(codec.next_command(), Some(ScpiCommand::Read));
//! assert_eq!("volt".parse::<ChannelName>(), Ok(ChannelName::Volt));
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod format;
pub mod grammar;

pub use codec::{Framing, LineCodec, DEFAULT_TERMINATOR};
pub use command::{ChannelName, ScpiCommand};
pub use error::ParseError;
pub use format::{format_code, format_value};
pub use grammar::{matching_rule, parse_line};

/// Trait for protocol codecs that can parse incoming data streams
pub trait ProtocolCodec {
    /// The command type produced by this codec
    type Command;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete command from the buffer
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Try to extract the next complete command along with its raw bytes
    ///
    /// The raw bytes exclude the terminator. Useful for traffic logging where
    /// the exact request text matters.
    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)>;

    /// Clear the internal buffer
    fn clear(&mut self);
}
