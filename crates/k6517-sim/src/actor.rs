//! Device actor
//!
//! A task that exclusively owns one [`Device`]. Sessions and the backdoor
//! talk to it through a [`DeviceHandle`], so every request is applied to the
//! model one at a time no matter how many connections are open.
//!
//! # Example
//!
//! ```rust,ignore
//! use k6517_sim::{spawn_device_actor, Device};
//!
//! let (handle, events) = spawn_device_actor(Device::new());
//! let reply = handle.execute_line("FUNC?").await?;
//! assert_eq!(reply.as_deref(), Some("VOLT"));
//! ```

use k6517_protocol::{matching_rule, parse_line, ScpiCommand};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;

use crate::backdoor::{self, BackdoorCommand, BackdoorResponse};
use crate::device::Device;
use crate::dispatch::dispatch;
use crate::error::SimError;

/// Capacity of the actor command channel
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_SIZE: usize = 256;

/// Commands that can be sent to a device actor
#[derive(Debug)]
pub enum DeviceActorCommand {
    /// Execute a wire-protocol request
    Execute {
        command: ScpiCommand,
        /// Request text as received, for traffic events
        request: String,
        response: oneshot::Sender<Option<String>>,
    },
    /// Apply a backdoor command
    Backdoor {
        command: BackdoorCommand,
        response: oneshot::Sender<BackdoorResponse>,
    },
    /// Stop the actor
    Shutdown,
}

/// Events emitted by a device actor
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A wire-protocol request was processed
    Traffic {
        request: String,
        /// Grammar rule that accepted the request, if any
        rule: Option<&'static str>,
        reply: Option<String>,
    },
    /// A backdoor command was applied
    Backdoor { command: BackdoorCommand },
}

/// Run the device actor until shutdown or until every handle is dropped
pub async fn run_device_actor(
    mut device: Device,
    mut cmd_rx: mpsc::Receiver<DeviceActorCommand>,
    event_tx: broadcast::Sender<DeviceEvent>,
) {
    info!("Device actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            DeviceActorCommand::Execute {
                command,
                request,
                response,
            } => {
                let reply = dispatch(&mut device, &command);
                let rule = matching_rule(&request);

                // No subscribers is fine
                let _ = event_tx.send(DeviceEvent::Traffic {
                    request,
                    rule,
                    reply: reply.clone(),
                });
                let _ = response.send(reply);
            }
            DeviceActorCommand::Backdoor { command, response } => {
                let _ = event_tx.send(DeviceEvent::Backdoor {
                    command: command.clone(),
                });
                let _ = response.send(backdoor::apply(&mut device, command));
            }
            DeviceActorCommand::Shutdown => {
                info!("Shutdown requested for device actor");
                break;
            }
        }
    }

    info!("Device actor ended");
}

/// Spawn a device actor on the current runtime
///
/// Returns the handle and the event sender; call `subscribe()` on the sender
/// to observe traffic.
pub fn spawn_device_actor(device: Device) -> (DeviceHandle, broadcast::Sender<DeviceEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

    tokio::spawn(run_device_actor(device, cmd_rx, event_tx.clone()));

    (DeviceHandle::new(cmd_tx), event_tx)
}

/// Cloneable client for a device actor
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    tx: mpsc::Sender<DeviceActorCommand>,
}

impl DeviceHandle {
    /// Wrap an actor command sender
    pub fn new(tx: mpsc::Sender<DeviceActorCommand>) -> Self {
        Self { tx }
    }

    /// Execute a parsed request
    pub async fn execute(
        &self,
        command: ScpiCommand,
        request: String,
    ) -> Result<Option<String>, SimError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(DeviceActorCommand::Execute {
                command,
                request,
                response: resp_tx,
            })
            .await
            .map_err(|_| SimError::ActorClosed)?;
        resp_rx.await.map_err(|_| SimError::ActorClosed)
    }

    /// Parse and execute a request line (terminator already stripped)
    pub async fn execute_line(&self, line: &str) -> Result<Option<String>, SimError> {
        self.execute(parse_line(line), line.to_string()).await
    }

    /// Apply a backdoor command
    pub async fn backdoor(&self, command: BackdoorCommand) -> Result<BackdoorResponse, SimError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(DeviceActorCommand::Backdoor {
                command,
                response: resp_tx,
            })
            .await
            .map_err(|_| SimError::ActorClosed)?;
        resp_rx.await.map_err(|_| SimError::ActorClosed)
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), SimError> {
        self.tx
            .send(DeviceActorCommand::Shutdown)
            .await
            .map_err(|_| SimError::ActorClosed)
    }
}
