//! Daemon connection acquisition.
//!
//! The single entry point [`Connector::connect`] hands callers a live
//! channel to the daemon, choosing between the local unix socket and an
//! SSH tunnel based on the profile.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wharf_config::{CliConfig, DaemonConfig, Profile, paths};

use crate::channel::{ConnectivityState, DaemonChannel, dial_unix};
use crate::error::ConnectError;
use crate::ssh::SshForwarder;
use crate::tunnel::{RemoteForwarder, TunnelSession, start_tunnel};

/// Tunables and path overrides for [`Connector`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Bound on tunnel establishment; expiry fails the acquisition.
    pub ready_timeout: Duration,
    /// Bound on dialing the unix socket.
    pub connect_timeout: Duration,
    /// Directory where tunnel sockets are created.
    pub socket_dir: PathBuf,
    /// Socket path the daemon listens on, on the remote host.
    pub remote_socket_path: PathBuf,
    /// CLI config location. `None` means `~/.wharf/config.json`.
    pub config_path: Option<PathBuf>,
    /// Daemon config location. `None` means `~/.wharf/daemon.json`.
    pub daemon_config_path: Option<PathBuf>,
    /// Caller-driven cancellation scope. Cancelling it tears down any
    /// in-flight tunnel that has not yet produced a channel.
    pub cancel: CancellationToken,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            socket_dir: paths::socket_dir(),
            remote_socket_path: paths::daemon_socket_path(),
            config_path: None,
            daemon_config_path: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Produces daemon channels from profiles.
pub struct Connector {
    forwarder: Arc<dyn RemoteForwarder>,
    options: ConnectOptions,
}

impl Connector {
    /// Connector using the system-ssh forwarder.
    pub fn new(options: ConnectOptions) -> Self {
        Self::with_forwarder(Arc::new(SshForwarder), options)
    }

    /// Connector with an injected forwarding primitive.
    pub fn with_forwarder(forwarder: Arc<dyn RemoteForwarder>, options: ConnectOptions) -> Self {
        Self { forwarder, options }
    }

    /// Get a channel to the daemon selected by `profile`.
    ///
    /// With no explicit profile, the active profile from the CLI config is
    /// used. Local profiles dial the daemon socket directly; remote
    /// profiles go through a tunnel whose lifetime is tied to the returned
    /// channel.
    pub async fn connect(&self, profile: Option<Profile>) -> Result<DaemonChannel, ConnectError> {
        let profile = self.resolve_profile(profile)?;
        if profile.is_local() {
            self.connect_local().await
        } else {
            self.connect_tunneled(&profile).await
        }
    }

    /// The explicit profile when given, otherwise the active one from the
    /// CLI config. Explicit profiles are passed through unvalidated.
    fn resolve_profile(&self, explicit: Option<Profile>) -> Result<Profile, ConnectError> {
        if let Some(profile) = explicit {
            return Ok(profile);
        }
        let config = match &self.options.config_path {
            Some(path) => CliConfig::load_from(path)?,
            None => CliConfig::load()?,
        };
        config.active_profile().ok_or(ConnectError::NoActiveProfile)
    }

    /// Dial the local daemon directly.
    ///
    /// Refuses to dial when the daemon was never configured: the socket
    /// would have no listener behind it.
    async fn connect_local(&self) -> Result<DaemonChannel, ConnectError> {
        let daemon_config = match &self.options.daemon_config_path {
            Some(path) => DaemonConfig::load_from(path)?,
            None => DaemonConfig::load()?,
        };
        let Some(daemon_config) = daemon_config else {
            return Err(ConnectError::NotConfigured);
        };

        debug!(path = %daemon_config.socket_path.display(), "dialing local daemon");
        let channel = dial_unix(&daemon_config.socket_path, self.options.connect_timeout)
            .await
            .map_err(|err| ConnectError::Dial(err.to_string()))?;
        Ok(DaemonChannel::new(channel))
    }

    /// Start a tunnel for `profile`, wait for it, dial through it, and
    /// hand the tunnel over to a lifecycle watcher.
    async fn connect_tunneled(&self, profile: &Profile) -> Result<DaemonChannel, ConnectError> {
        let mut session = start_tunnel(
            self.forwarder.as_ref(),
            profile,
            &self.options.socket_dir,
            &self.options.remote_socket_path,
            &self.options.cancel,
        )?;

        info!(profile = %profile.name, path = %session.local_path().display(), "starting tunnel");

        // Race readiness against failure, the establishment bound, and the
        // caller's cancellation scope. Every non-ready outcome still owns
        // the session and tears it down before returning.
        tokio::select! {
            ready = &mut session.ready => {
                if ready.is_err() {
                    session.shutdown();
                    return Err(ConnectError::TunnelStart(
                        "tunnel closed before becoming ready".into(),
                    ));
                }
            }
            failed = &mut session.failed => {
                let message = failed.map_or_else(
                    |_| "tunnel closed before becoming ready".to_string(),
                    |err| err.to_string(),
                );
                warn!(profile = %profile.name, error = %message, "tunnel failed to start");
                session.shutdown();
                return Err(ConnectError::TunnelStart(message));
            }
            () = tokio::time::sleep(self.options.ready_timeout) => {
                session.shutdown();
                return Err(ConnectError::TunnelStart(format!(
                    "timed out after {:?} waiting for tunnel readiness",
                    self.options.ready_timeout
                )));
            }
            () = self.options.cancel.cancelled() => {
                session.shutdown();
                return Err(ConnectError::TunnelStart("cancelled".into()));
            }
        }

        let channel = match dial_unix(session.local_path(), self.options.connect_timeout).await {
            Ok(channel) => channel,
            Err(err) => {
                // The tunnel is up but unusable; reclaim it here rather
                // than leaving it to a watcher that will never exist.
                session.shutdown();
                return Err(ConnectError::Dial(err.to_string()));
            }
        };

        let daemon_channel = DaemonChannel::new(channel);
        spawn_lifecycle_watcher(daemon_channel.subscribe(), session);
        Ok(daemon_channel)
    }
}

/// Get a channel to the daemon for `profile`, or the active profile when
/// `None`, using default options and the system-ssh forwarder.
pub async fn get_connection(profile: Option<Profile>) -> Result<DaemonChannel, ConnectError> {
    Connector::new(ConnectOptions::default()).connect(profile).await
}

/// Watch a tunneled channel and reclaim the tunnel on terminal shutdown.
///
/// Waits event-driven on the state cell; a dropped channel handle counts
/// as shutdown too. The session is consumed here, so teardown happens
/// exactly once no matter how often shutdown is observed.
fn spawn_lifecycle_watcher(mut state: watch::Receiver<ConnectivityState>, session: TunnelSession) {
    tokio::spawn(async move {
        let _ = state.wait_for(|s| *s == ConnectivityState::Shutdown).await;
        info!(path = %session.local_path().display(), "channel shut down, reclaiming tunnel");
        session.shutdown();
    });
}
