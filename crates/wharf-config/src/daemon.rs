//! Local daemon configuration probe.
//!
//! `wharf configure` writes the daemon's configuration to
//! `~/.wharf/daemon.json` when it first sets the daemon up. A missing file
//! therefore means the daemon was never configured on this machine, and
//! clients must not attempt to dial its socket.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Daemon configuration, as written by `wharf configure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on.
    #[serde(default = "paths::daemon_socket_path")]
    pub socket_path: PathBuf,
    /// Default log level for the daemon process.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: paths::daemon_socket_path(),
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Probe the default location.
    ///
    /// `Ok(None)` means the daemon was never configured. Read or parse
    /// failures are errors, not "not configured".
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = paths::daemon_config_path().ok_or(ConfigError::NoHomeDir)?;
        Self::load_from(&path)
    }

    /// Probe an explicit path.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = paths::daemon_config_path().ok_or(ConfigError::NoHomeDir)?;
        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
