//! Connection broker error types.

use thiserror::Error;
use wharf_config::ConfigError;

/// Errors surfaced by [`Connector::connect`](crate::connection::Connector::connect).
///
/// Nothing here is retried automatically; retry policy belongs to the
/// caller.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No profile was given and no active profile is set.
    #[error("no active profile; select one with `wharf profile use <name>`")]
    NoActiveProfile,

    /// The local daemon has never been configured on this machine.
    #[error("local daemon not configured; run `wharf configure` first")]
    NotConfigured,

    /// The tunnel failed, was cancelled, or timed out before readiness.
    #[error("tunnel failed to start: {0}")]
    TunnelStart(String),

    /// Dialing the daemon socket failed.
    #[error("failed to dial daemon: {0}")]
    Dial(String),
}
