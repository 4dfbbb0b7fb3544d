//! Line framing
//!
//! Requests and replies are text lines terminated by a fixed sequence,
//! `\r\n` unless the session is configured otherwise. The request and reply
//! terminators are configured separately.

use tracing::warn;

use crate::command::ScpiCommand;
use crate::error::ParseError;
use crate::grammar::parse_line;
use crate::ProtocolCodec;

/// Terminator used for both directions unless configured otherwise
pub const DEFAULT_TERMINATOR: &str = "\r\n";

/// Maximum request length (reasonable limit to prevent unbounded buffering)
const MAX_LINE_LEN: usize = 256;

/// Terminator configuration for one session
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Framing {
    /// Sequence ending each request
    pub input: String,
    /// Sequence appended to each reply
    pub output: String,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            input: DEFAULT_TERMINATOR.to_string(),
            output: DEFAULT_TERMINATOR.to_string(),
        }
    }
}

impl Framing {
    /// Create a request codec using the input terminator
    pub fn codec(&self) -> LineCodec {
        LineCodec::new(&self.input)
    }

    /// Encode a reply line with the output terminator appended
    pub fn encode_reply(&self, reply: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(reply.len() + self.output.len());
        bytes.extend_from_slice(reply.as_bytes());
        bytes.extend_from_slice(self.output.as_bytes());
        bytes
    }
}

/// Streaming request codec
#[derive(Debug)]
pub struct LineCodec {
    buffer: Vec<u8>,
    terminator: Vec<u8>,
}

impl LineCodec {
    /// Create a codec splitting on `terminator`
    ///
    /// An empty terminator cannot delimit anything, so it falls back to
    /// [`DEFAULT_TERMINATOR`].
    pub fn new(terminator: &str) -> Self {
        let terminator = if terminator.is_empty() {
            warn!("Empty request terminator, using default");
            DEFAULT_TERMINATOR
        } else {
            terminator
        };

        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
            terminator: terminator.as_bytes().to_vec(),
        }
    }

    /// Terminator this codec splits on
    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// Number of buffered bytes not yet forming a complete line
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn terminator_position(&self) -> Option<usize> {
        self.buffer
            .windows(self.terminator.len())
            .position(|window| window == self.terminator.as_slice())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATOR)
    }
}

impl ProtocolCodec for LineCodec {
    type Command = ScpiCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent buffer overflow from a peer that never terminates a line
        if self.buffer.len() > MAX_LINE_LEN * 4 && self.terminator_position().is_none() {
            let start = self.buffer.len() - MAX_LINE_LEN;
            self.buffer.drain(..start);
        }
    }

    fn next_command(&mut self) -> Option<Self::Command> {
        self.next_command_with_bytes().map(|(cmd, _)| cmd)
    }

    fn next_command_with_bytes(&mut self) -> Option<(Self::Command, Vec<u8>)> {
        let term_pos = self.terminator_position()?;

        let mut line_bytes: Vec<u8> = self.buffer.drain(..term_pos + self.terminator.len()).collect();
        line_bytes.truncate(term_pos);

        let cmd = match decode_line(&line_bytes) {
            Ok(line) => parse_line(line),
            Err(e) => {
                warn!("Dropping request: {}", e);
                ScpiCommand::Unknown(String::from_utf8_lossy(&line_bytes).into_owned())
            }
        };

        Some((cmd, line_bytes))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn decode_line(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)
}
