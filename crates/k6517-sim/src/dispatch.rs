//! Request dispatch
//!
//! Routes a parsed [`ScpiCommand`] to the device and formats the reply.
//! Queries return `Some(reply)`; actions and unrecognized lines return
//! `None` and produce nothing on the wire.

use k6517_protocol::{format_code, format_value, parse_line, ScpiCommand};
use tracing::debug;

use crate::device::Device;

/// Execute one command against the device
pub fn dispatch(device: &mut Device, command: &ScpiCommand) -> Option<String> {
    match command {
        ScpiCommand::GetFunction => Some(device.selected_channel_name().to_string()),
        ScpiCommand::Read => {
            device.abort();
            device.initiate();
            Some(format_value(device.fetch()))
        }
        ScpiCommand::GetRange { mode } => {
            // Unknown modes are already in the error queue
            let range = device.get_range(mode).unwrap_or(0.0);
            Some(format_value(range))
        }
        ScpiCommand::ClearStatus => {
            device.clear_errors();
            None
        }
        ScpiCommand::SetFunction { mode } => {
            let _ = device.select_channel(mode);
            None
        }
        ScpiCommand::SetRange { mode, value } => {
            let _ = device.set_range(mode, *value);
            None
        }
        // Both pop the same queue; the instrument documents them as equivalent
        ScpiCommand::SystemError | ScpiCommand::StatusQueue => {
            Some(format_code(device.pop_error()))
        }
        ScpiCommand::Unknown(line) => {
            debug!("Dropping unrecognized request: {:?}", line);
            None
        }
    }
}

/// Parse and execute one request line (terminator already stripped)
pub fn dispatch_line(device: &mut Device, line: &str) -> Option<String> {
    dispatch(device, &parse_line(line))
}
