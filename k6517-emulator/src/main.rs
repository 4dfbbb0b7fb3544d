//! Keithley 6517 Electrometer Emulator
//!
//! Serves a simulated 6517 over TCP so control software can be exercised
//! without hardware, plus a JSON backdoor for scripting test scenarios.

mod backdoor;
mod server;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use k6517_sim::{spawn_device_actor, Device, DeviceEvent};
use settings::EmulatorSettings;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Keithley 6517 electrometer emulator
#[derive(Parser, Debug)]
#[command(name = "k6517-emulator")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the XDG config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wire-protocol TCP port
    #[arg(long)]
    port: Option<u16>,

    /// Backdoor TCP port
    #[arg(long)]
    backdoor_port: Option<u16>,

    /// Address to bind both listeners to
    #[arg(long)]
    bind: Option<String>,

    /// Seed for random readings
    #[arg(long)]
    seed: Option<u64>,

    /// Only return readings inserted through the backdoor
    #[arg(long)]
    no_random: bool,

    /// Write the effective settings to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings
    fn apply(&self, settings: &mut EmulatorSettings) {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(port) = self.backdoor_port {
            settings.backdoor_port = port;
        }
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(seed) = self.seed {
            settings.device.seed = Some(seed);
        }
        if self.no_random {
            settings.device.random_mode = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "k6517_emulator=info,k6517_protocol=info,k6517_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings =
        EmulatorSettings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply(&mut settings);

    if cli.write_default_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => EmulatorSettings::default_path()
                .context("Could not determine settings path")?,
        };
        settings
            .save_to(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    info!("Starting Keithley 6517 emulator");

    let wire_listener = TcpListener::bind(settings.wire_addr())
        .await
        .with_context(|| format!("Failed to bind wire listener on {}", settings.wire_addr()))?;
    let backdoor_listener = TcpListener::bind(settings.backdoor_addr())
        .await
        .with_context(|| {
            format!(
                "Failed to bind backdoor listener on {}",
                settings.backdoor_addr()
            )
        })?;

    info!("Wire protocol listening on {}", settings.wire_addr());
    info!("Backdoor listening on {}", settings.backdoor_addr());

    let (device, event_tx) = spawn_device_actor(Device::from_config(settings.device.clone()));
    tokio::spawn(log_events(event_tx.subscribe()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let wire = tokio::spawn(server::run_wire_server(
        wire_listener,
        device.clone(),
        settings.framing(),
        shutdown_rx.clone(),
    ));
    let backdoor = tokio::spawn(backdoor::run_backdoor_server(
        backdoor_listener,
        device.clone(),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");

    let _ = shutdown_tx.send(true);
    let _ = wire.await;
    let _ = backdoor.await;

    if let Err(e) = device.shutdown().await {
        warn!("Device actor already stopped: {}", e);
    }

    Ok(())
}

/// Log device activity until the actor goes away
async fn log_events(mut events: broadcast::Receiver<DeviceEvent>) {
    loop {
        match events.recv().await {
            Ok(DeviceEvent::Traffic {
                request,
                rule,
                reply,
            }) => {
                debug!("<< {:?} [{}] >> {:?}", request, rule.unwrap_or("unmatched"), reply);
            }
            Ok(DeviceEvent::Backdoor { command }) => {
                debug!("Backdoor applied: {:?}", command);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Event log skipped {} event(s)", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
