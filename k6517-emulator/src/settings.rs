//! Emulator settings

use std::path::{Path, PathBuf};

use k6517_protocol::{Framing, DEFAULT_TERMINATOR};
use k6517_sim::DeviceConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Emulator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmulatorSettings {
    /// Address both listeners bind to
    pub bind_address: String,
    /// Wire-protocol TCP port
    pub port: u16,
    /// Backdoor TCP port
    pub backdoor_port: u16,
    /// Request line terminator
    pub in_terminator: String,
    /// Reply line terminator
    pub out_terminator: String,
    /// Simulated device
    pub device: DeviceConfig,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 57677,
            backdoor_port: 57678,
            in_terminator: DEFAULT_TERMINATOR.to_string(),
            out_terminator: DEFAULT_TERMINATOR.to_string(),
            device: DeviceConfig::default(),
        }
    }
}

impl EmulatorSettings {
    /// Get the XDG config directory for the emulator
    /// Uses $XDG_CONFIG_HOME/k6517-emulator, falls back to ~/.config/k6517-emulator
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("k6517-emulator"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("k6517-emulator"))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from a file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from an explicit path, or the default path if it exists
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save settings to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        std::fs::write(path, json).map_err(io_err)
    }

    /// Line framing for wire sessions
    pub fn framing(&self) -> Framing {
        Framing {
            input: self.in_terminator.clone(),
            output: self.out_terminator.clone(),
        }
    }

    /// Wire listener address
    pub fn wire_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Backdoor listener address
    pub fn backdoor_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.backdoor_port)
    }
}
