//! Backdoor TCP listener
//!
//! Accepts newline-delimited JSON [`BackdoorCommand`]s and answers each with
//! one JSON [`BackdoorResponse`] line. Undecodable lines get an `error`
//! response and the connection stays open.

use k6517_sim::{BackdoorCommand, BackdoorResponse, DeviceHandle, SimError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Accept backdoor connections until `shutdown` flips to true
pub async fn run_backdoor_server(
    listener: TcpListener,
    device: DeviceHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Backdoor accept failed: {}", e);
                        continue;
                    }
                };

                let device = device.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let peer = addr.to_string();
                    if let Err(e) = handle_backdoor_connection(stream, &peer, device, shutdown).await {
                        warn!("Backdoor connection {} failed: {}", peer, e);
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

    info!("Backdoor server stopped");
}

/// Serve one backdoor connection
pub async fn handle_backdoor_connection<S>(
    stream: S,
    peer: &str,
    device: DeviceHandle,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SimError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    info!("Backdoor client connected: {}", peer);

    loop {
        // Partial reads stay in `buf` if the shutdown branch wins
        let n = tokio::select! {
            n = reader.read_until(b'\n', &mut buf) => n?,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        if n == 0 {
            break;
        }

        let raw = std::mem::take(&mut buf);
        let response = match std::str::from_utf8(&raw) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                decode_and_apply(line, peer, &device).await?
            }
            Err(e) => {
                debug!("Rejecting non-UTF-8 backdoor line from {}", peer);
                BackdoorResponse::Error {
                    message: format!("request is not valid UTF-8: {}", e),
                }
            }
        };

        let mut reply = encode_response(&response);
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }

    info!("Backdoor client disconnected: {}", peer);
    Ok(())
}

async fn decode_and_apply(
    line: &str,
    peer: &str,
    device: &DeviceHandle,
) -> Result<BackdoorResponse, SimError> {
    match serde_json::from_str::<BackdoorCommand>(line) {
        Ok(command) => device.backdoor(command).await,
        Err(e) => {
            debug!("Rejecting backdoor line from {}: {:?}", peer, line);
            Ok(BackdoorResponse::Error {
                message: e.to_string(),
            })
        }
    }
}

fn encode_response(response: &BackdoorResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        format!(r#"{{"status":"error","message":"encode failed: {}"}}"#, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k6517_sim::{spawn_device_actor, Device, DeviceConfig};
    use std::time::Duration;
    use tokio::io::{DuplexStream, Lines, ReadHalf, WriteHalf};

    struct Client {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Client {
        async fn send(&mut self, line: &str) -> serde_json::Value {
            self.send_bytes(format!("{}\n", line).as_bytes()).await
        }

        async fn send_bytes(&mut self, bytes: &[u8]) -> serde_json::Value {
            self.writer.write_all(bytes).await.unwrap();
            let reply = tokio::time::timeout(Duration::from_millis(200), self.lines.next_line())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            serde_json::from_str(&reply).unwrap()
        }
    }

    fn connect() -> (Client, DeviceHandle, watch::Sender<bool>) {
        let (device, _events) = spawn_device_actor(Device::from_config(DeviceConfig {
            random_mode: false,
            ..Default::default()
        }));
        let (client, server) = tokio::io::duplex(4096);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = device.clone();
        tokio::spawn(async move {
            handle_backdoor_connection(server, "test", handle, shutdown_rx).await
        });

        let (reader, writer) = tokio::io::split(client);
        let client = Client {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        (client, device, shutdown_tx)
    }

    #[tokio::test]
    async fn test_commands_reach_device() {
        let (mut client, device, _shutdown) = connect();

        let reply = client
            .send(r#"{"command": "insert_mock_readings", "channel": "CURR", "values": [0.01]}"#)
            .await;
        assert_eq!(reply["status"], "ok");
        client.send(r#"{"command": "select_channel", "channel": "curr"}"#).await;
        client.send(r#"{"command": "set_range", "channel": "CURR", "value": 1.0}"#).await;

        assert_eq!(device.execute_line("READ?").await.unwrap().as_deref(), Some("0.01"));
    }

    #[tokio::test]
    async fn test_get_state() {
        let (mut client, _device, _shutdown) = connect();

        client.send(r#"{"command": "add_mock_errors"}"#).await;
        let reply = client.send(r#"{"command": "get_state"}"#).await;

        assert_eq!(reply["status"], "state");
        assert_eq!(reply["state"]["errors"], serde_json::json!([2, 5, 10]));
        assert_eq!(reply["state"]["selected_channel"], "VOLT");
        assert_eq!(reply["state"]["idle"], true);
    }

    #[tokio::test]
    async fn test_bad_lines_get_error_reply() {
        let (mut client, device, _shutdown) = connect();

        let reply = client.send("not json").await;
        assert_eq!(reply["status"], "error");

        let reply = client
            .send(r#"{"command": "select_channel", "channel": "RES"}"#)
            .await;
        assert_eq!(reply["status"], "error");

        // Rejected lines never touch the device error queue
        assert_eq!(device.execute_line(":SYST:ERR?").await.unwrap().as_deref(), Some("0"));

        let reply = client.send(r#"{"command": "abort"}"#).await;
        assert_eq!(reply["status"], "ok");
    }

    #[tokio::test]
    async fn test_non_utf8_line_keeps_connection() {
        let (mut client, _device, _shutdown) = connect();

        let reply = client.send_bytes(&[0xFF, 0xFE, b'\n']).await;
        assert_eq!(reply["status"], "error");

        let reply = client.send(r#"{"command": "abort"}"#).await;
        assert_eq!(reply["status"], "ok");
    }

    #[tokio::test]
    async fn test_shutdown_ends_connection() {
        let (mut client, _device, shutdown) = connect();

        shutdown.send(true).unwrap();

        let next = tokio::time::timeout(Duration::from_millis(200), client.lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next, None);
    }
}
