//! CLI configuration management.
//!
//! Persists connection profiles and the active-profile selection to
//! `~/.wharf/config.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// A named connection target: this machine's daemon, or a remote host
/// reached over SSH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier. [`Profile::LOCAL_ID`] is reserved for the local
    /// daemon.
    pub id: String,
    /// Human-readable name, also used to derive tunnel socket file names.
    pub name: String,
    /// Remote access parameters. `None` for the local profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteParams>,
}

/// SSH access parameters for a remote profile.
///
/// Opaque to the connection broker; only the forwarder interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParams {
    /// Remote host name or address.
    pub host: String,
    /// SSH port.
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Remote user.
    pub user: String,
    /// Private key used for authentication. `None` falls back to the
    /// user's default SSH identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
}

const fn default_ssh_port() -> u16 {
    22
}

impl Profile {
    /// Reserved identifier meaning "this machine's daemon".
    pub const LOCAL_ID: &'static str = "local";

    /// The profile describing the local daemon.
    pub fn local() -> Self {
        Self {
            id: Self::LOCAL_ID.into(),
            name: Self::LOCAL_ID.into(),
            remote: None,
        }
    }

    /// Whether this profile targets the local daemon.
    pub fn is_local(&self) -> bool {
        self.id == Self::LOCAL_ID
    }
}

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Known connection profiles.
    #[serde(default)]
    pub profiles: Vec<Profile>,
    /// Id of the currently active profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile_id: Option<String>,
}

impl CliConfig {
    /// Path to the config directory: `~/.wharf/`.
    pub fn config_dir() -> Option<PathBuf> {
        paths::config_dir()
    }

    /// Path to the config file: `~/.wharf/config.json`.
    pub fn config_path() -> Option<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default location.
    ///
    /// A missing file yields the default (empty) config; an unreadable or
    /// invalid file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoHomeDir)?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoHomeDir)?;
        self.save_to(&path)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the active profile against the profile list.
    ///
    /// The local sentinel always resolves, whether or not it is listed.
    /// Returns `None` when no active profile is set or the id dangles.
    pub fn active_profile(&self) -> Option<Profile> {
        let id = self.active_profile_id.as_deref()?;
        if id == Profile::LOCAL_ID {
            return Some(Profile::local());
        }
        self.profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Add a profile, replacing any existing profile with the same id.
    pub fn upsert_profile(&mut self, profile: Profile) {
        if let Some(existing) = self.profiles.iter_mut().find(|p| p.id == profile.id) {
            *existing = profile;
        } else {
            self.profiles.push(profile);
        }
    }

    /// Select the active profile by id.
    pub fn set_active(&mut self, id: impl Into<String>) {
        self.active_profile_id = Some(id.into());
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn staging() -> Profile {
        Profile {
            id: "prof-1".into(),
            name: "staging".into(),
            remote: Some(RemoteParams {
                host: "staging.example.com".into(),
                port: 22,
                user: "deploy".into(),
                private_key_path: None,
            }),
        }
    }

    #[test]
    fn default_config_has_no_active_profile() {
        let cfg = CliConfig::default();
        assert!(cfg.active_profile().is_none());
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn local_profile_is_local() {
        let p = Profile::local();
        assert!(p.is_local());
        assert_eq!(p.id, Profile::LOCAL_ID);
        assert!(p.remote.is_none());
        assert!(!staging().is_local());
    }

    #[test]
    fn local_sentinel_resolves_without_being_listed() {
        let mut cfg = CliConfig::default();
        cfg.set_active(Profile::LOCAL_ID);
        let active = cfg.active_profile().unwrap();
        assert!(active.is_local());
    }

    #[test]
    fn active_profile_resolves_by_id() {
        let mut cfg = CliConfig::default();
        cfg.upsert_profile(staging());
        cfg.set_active("prof-1");
        let active = cfg.active_profile().unwrap();
        assert_eq!(active.name, "staging");
    }

    #[test]
    fn dangling_active_id_resolves_to_none() {
        let mut cfg = CliConfig::default();
        cfg.set_active("gone");
        assert!(cfg.active_profile().is_none());
    }

    #[test]
    fn upsert_replaces_existing_profile() {
        let mut cfg = CliConfig::default();
        cfg.upsert_profile(staging());
        let mut renamed = staging();
        renamed.name = "stage-2".into();
        cfg.upsert_profile(renamed);
        assert_eq!(cfg.profiles.len(), 1);
        assert_eq!(cfg.profiles[0].name, "stage-2");
    }

    #[test]
    fn config_roundtrip_json() {
        let mut cfg = CliConfig::default();
        cfg.upsert_profile(staging());
        cfg.set_active("prof-1");
        let json = serde_json::to_string(&cfg).unwrap();
        let loaded: CliConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.active_profile_id.as_deref(), Some("prof-1"));
        assert_eq!(loaded.profiles[0].remote.as_ref().unwrap().port, 22);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CliConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = CliConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn save_and_load_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut cfg = CliConfig::default();
        cfg.upsert_profile(staging());
        cfg.set_active("prof-1");
        cfg.save_to(&path).unwrap();
        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.active_profile().unwrap().name, "staging");
    }
}
