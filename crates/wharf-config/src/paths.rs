//! Well-known filesystem locations.
//!
//! The daemon socket lives at a fixed path so that clients (and tunnels
//! from remote clients) can find it without any discovery step. Tunnel
//! sockets share the same directory, named after the profile they serve.

use std::path::PathBuf;

/// Directory holding runtime unix sockets.
pub const SOCKET_DIR: &str = "/tmp/wharf";

/// File name of the daemon's listening socket inside [`SOCKET_DIR`].
pub const DAEMON_SOCKET_NAME: &str = "wharfd.sock";

/// Runtime socket directory.
pub fn socket_dir() -> PathBuf {
    PathBuf::from(SOCKET_DIR)
}

/// Path the daemon listens on. The same fixed path is used on remote
/// hosts, so it doubles as the remote endpoint of a tunnel.
pub fn daemon_socket_path() -> PathBuf {
    socket_dir().join(DAEMON_SOCKET_NAME)
}

/// File name for a tunnel socket serving `profile_name`.
///
/// The random `suffix` keeps concurrent sessions for the same profile from
/// colliding on a path.
pub fn tunnel_socket_name(profile_name: &str, suffix: u32) -> String {
    format!("wharf-{profile_name}-{suffix}.sock")
}

/// Config directory: `~/.wharf`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".wharf"))
}

/// CLI config file: `~/.wharf/config.json`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.json"))
}

/// Daemon config file: `~/.wharf/daemon.json`.
pub fn daemon_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("daemon.json"))
}
