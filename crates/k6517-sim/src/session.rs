//! Wire-protocol session task
//!
//! This module provides an async task that serves one connection. The task
//! uses a select! loop to:
//! - Read request bytes from the stream and frame them into lines
//! - Forward each request to the device actor and write back any reply
//! - Handle shutdown commands from a channel
//!
//! The task is generic over the stream, so tests drive it with
//! `tokio::io::duplex()` and the emulator with a `TcpStream`.

use k6517_protocol::{Framing, ProtocolCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::actor::DeviceHandle;
use crate::error::SimError;

/// Commands that can be sent to a session task
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Close the session
    Shutdown,
}

/// Run a session task until the peer disconnects or shutdown is requested
pub async fn run_session_task<S>(
    mut stream: S,
    peer: String,
    framing: Framing,
    device: DeviceHandle,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
) -> Result<(), SimError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = framing.codec();
    let mut buf = [0u8; 1024];

    info!("Session opened for {}", peer);

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Session stream closed for {}", peer);
                        break;
                    }
                    Ok(n) => {
                        codec.push_bytes(&buf[..n]);

                        while let Some((command, raw)) = codec.next_command_with_bytes() {
                            let request = String::from_utf8_lossy(&raw).into_owned();
                            let reply = device.execute(command, request).await.map_err(|e| {
                                warn!("Session {} lost its device: {}", peer, e);
                                e
                            })?;

                            if let Some(reply) = reply {
                                stream.write_all(&framing.encode_reply(&reply)).await?;
                                stream.flush().await?;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Session {} stream error: {}", peer, e);
                        return Err(e.into());
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) => {
                        info!("Shutdown requested for session {}", peer);
                        break;
                    }
                    None => {
                        debug!("Command channel closed for session {}", peer);
                        break;
                    }
                }
            }
        }
    }

    info!("Session ended for {}", peer);
    Ok(())
}
