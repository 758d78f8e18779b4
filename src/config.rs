//! Application configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/screenlink/config.json`.  Every key is optional; a
//! minimal `{}` file is valid and all sections fall back to their
//! compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "canvas": {
//!     "pad": 5.0,
//!     "screen_size": { "x": 160.0, "y": 100.0 },
//!     "names": ["Main Laptop", "Desktop"],
//!     "insert_modifier": "ctrl",
//!     "stale_focus_ms": 10000
//!   },
//!   "network": {
//!     "input_socket": "/run/user/1000/screenlink.sock",
//!     "cluster_socket": "/run/user/1000/screenlink-cluster.sock"
//!   }
//! }
//! ```

use crate::command::Modifier;
use crate::graph::DEFAULT_PAD;
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Layout and interaction settings.
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Socket locations.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Layout and interaction settings of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Spacing between adjacent screens.
    pub pad: f64,
    /// Size of every screen box.
    pub screen_size: Vector2,
    /// Names handed to inserted screens, cycling.
    pub names: Vec<String>,
    /// Holding this modifier on pointer-down inserts a screen instead of
    /// starting a drag.
    pub insert_modifier: Modifier,
    /// Drags idle this long are released.  `null` disables the sweep.
    pub stale_focus_ms: Option<u64>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            pad: DEFAULT_PAD,
            screen_size: Vector2::new(160.0, 100.0),
            names: [
                "Main Laptop",
                "Desktop",
                "Secondary Laptop",
                "Gallifrey",
                "Kronos",
                "Atlantis",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            insert_modifier: Modifier::Ctrl,
            stale_focus_ms: Some(10_000),
        }
    }
}

impl CanvasConfig {
    pub fn stale_focus_timeout(&self) -> Option<Duration> {
        self.stale_focus_ms.map(Duration::from_millis)
    }
}

/// Socket locations.  Unset paths live in `$XDG_RUNTIME_DIR`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where the UI sends input commands.
    pub input_socket: Option<PathBuf>,
    /// The cluster daemon's socket.
    pub cluster_socket: Option<PathBuf>,
}

impl NetworkConfig {
    pub fn input_socket_path(&self) -> PathBuf {
        self.input_socket
            .clone()
            .unwrap_or_else(|| runtime_dir().join("screenlink.sock"))
    }

    pub fn cluster_socket_path(&self) -> PathBuf {
        self.cluster_socket
            .clone()
            .unwrap_or_else(|| runtime_dir().join("screenlink-cluster.sock"))
    }
}

fn runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

/// `$XDG_CONFIG_HOME/screenlink`, or `$HOME/.config/screenlink`.
pub fn config_dir() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"));
            home.join(".config")
        });
    base.join("screenlink")
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
