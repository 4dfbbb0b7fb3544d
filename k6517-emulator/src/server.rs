//! Wire-protocol TCP listener
//!
//! Every accepted connection gets its own session task; all sessions share
//! the one device actor.

use k6517_protocol::Framing;
use k6517_sim::{run_session_task, DeviceHandle, SessionCommand};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Accept connections until `shutdown` flips to true
pub async fn run_wire_server(
    listener: TcpListener,
    device: DeviceHandle,
    framing: Framing,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sessions: Vec<mpsc::Sender<SessionCommand>> = Vec::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Wire accept failed: {}", e);
                        continue;
                    }
                };

                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
                }

                let (cmd_tx, cmd_rx) = mpsc::channel(1);
                sessions.retain(|tx| !tx.is_closed());
                sessions.push(cmd_tx);

                let device = device.clone();
                let framing = framing.clone();
                tokio::spawn(async move {
                    let peer = addr.to_string();
                    if let Err(e) = run_session_task(stream, peer.clone(), framing, device, cmd_rx).await {
                        warn!("Session {} failed: {}", peer, e);
                    }
                });
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Wire server stopping, closing {} session(s)", sessions.len());
    for tx in sessions {
        let _ = tx.send(SessionCommand::Shutdown).await;
    }
}
