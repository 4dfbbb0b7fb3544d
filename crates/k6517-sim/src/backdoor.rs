//! Test backdoor
//!
//! Out-of-band control of a simulated device for deterministic test
//! scenarios. Commands here are never reachable through the wire protocol;
//! they arrive on a separate channel (see the emulator's backdoor listener).
//!
//! Commands and responses serialize as internally tagged JSON:
//!
//! ```json
//! {"command": "insert_mock_readings", "channel": "volt", "values": [0.1, 1.1]}
//! {"status": "ok"}
//! ```

use k6517_protocol::ChannelName;
use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceSnapshot};

/// Commands accepted on the backdoor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BackdoorCommand {
    /// Read the full device state
    GetState,
    /// Enable or disable random readings
    SetRandomMode { enabled: bool },
    /// Select the measurement function
    SelectChannel { channel: ChannelName },
    /// Set a channel range
    SetRange { channel: ChannelName, value: f64 },
    /// Record an arbitrary error code
    AddError { code: i32 },
    /// Record the codes 2, 5 and 10
    AddMockErrors,
    /// Clear the error queue
    ClearErrors,
    /// Queue readings on a channel
    InsertMockReadings {
        values: Vec<f64>,
        channel: ChannelName,
    },
    /// Leave idle and take a measurement
    Initiate,
    /// Return to idle
    Abort,
}

/// Backdoor replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackdoorResponse {
    /// Command applied
    Ok,
    /// Current device state
    State { state: DeviceSnapshot },
    /// Command could not be decoded or applied
    Error { message: String },
}

/// Apply a backdoor command to the device
pub fn apply(device: &mut Device, command: BackdoorCommand) -> BackdoorResponse {
    match command {
        BackdoorCommand::GetState => {
            return BackdoorResponse::State {
                state: device.snapshot(),
            }
        }
        BackdoorCommand::SetRandomMode { enabled } => device.set_random_mode(enabled),
        BackdoorCommand::SelectChannel { channel } => device.set_selected_channel(channel),
        BackdoorCommand::SetRange { channel, value } => device.channel_mut(channel).set_range(value),
        BackdoorCommand::AddError { code } => {
            device.add_error(code);
        }
        BackdoorCommand::AddMockErrors => device.add_mock_errors(),
        BackdoorCommand::ClearErrors => device.clear_errors(),
        BackdoorCommand::InsertMockReadings { values, channel } => {
            device.insert_mock_readings(&values, channel)
        }
        BackdoorCommand::Initiate => device.initiate(),
        BackdoorCommand::Abort => device.abort(),
    }

    BackdoorResponse::Ok
}
