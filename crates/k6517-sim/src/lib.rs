//! Keithley 6517 Simulation Library
//!
//! This crate provides a simulated electrometer for testing control systems
//! without physical hardware. It includes:
//!
//! - **Device**: the measurement model (channels, ranges, pending readings,
//!   error queue, trigger state)
//! - **dispatch**: routes parsed SCPI requests to the device and formats replies
//! - **backdoor**: out-of-band commands for deterministic test setup
//! - **actor / session**: async tasks serving one device to many connections
//!
//! # Example
//!
//! ```rust
//! use k6517_protocol::ChannelName;
//! use k6517_sim::{dispatch_line, Device, DeviceConfig};
//!
//! let mut device = Device::from_config(DeviceConfig {
//!     random_mode: false,
//!     ..Default::default()
//! });
//! device.insert_mock_readings(&[0.1, 2.5], ChannelName::Volt);
//!
//! dispatch_line(&mut device, "VOLT:DC:RANG 2");
//! assert_eq!(dispatch_line(&mut device, "READ?").as_deref(), Some("0.1"));
//! assert_eq!(dispatch_line(&mut device, "READ?").as_deref(), Some("2.0"));
//! assert_eq!(dispatch_line(&mut device, ":SYST:ERR?").as_deref(), Some("-222"));
//! ```

pub mod actor;
pub mod backdoor;
pub mod channel;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod error_queue;
pub mod session;

pub use actor::{run_device_actor, spawn_device_actor, DeviceActorCommand, DeviceEvent, DeviceHandle};
pub use backdoor::{BackdoorCommand, BackdoorResponse};
pub use channel::Channel;
pub use device::{ChannelSnapshot, Device, DeviceConfig, DeviceSnapshot};
pub use dispatch::{dispatch, dispatch_line};
pub use error::{codes, DeviceError, SimError};
pub use error_queue::{ErrorQueue, PushOutcome, ERROR_QUEUE_DEPTH};
pub use session::{run_session_task, SessionCommand};
