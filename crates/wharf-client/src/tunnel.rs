//! Tunnel supervision: unique socket paths, start signals, teardown.

use std::path::{Path, PathBuf};

use rand::RngExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wharf_config::{Profile, paths};

use crate::error::ConnectError;

/// Error reported by a forwarder when a tunnel fails.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ForwardError(pub String);

/// One-shot signals handed back by
/// [`RemoteForwarder::forward_unix_socket`].
#[derive(Debug)]
pub struct ForwardSignals {
    /// Fires once when the local socket is live.
    pub ready: oneshot::Receiver<()>,
    /// Fires once if the tunnel fails before readiness.
    pub failed: oneshot::Receiver<ForwardError>,
}

/// The secure forwarding primitive.
///
/// Implementations expose the daemon's remote unix socket at `local_path`
/// and report the outcome through [`ForwardSignals`]. The call returns
/// immediately; establishment runs in the background. Cancelling `cancel`
/// stops forwarding and releases the local socket. Dropping both signal
/// senders without firing either counts as failure.
pub trait RemoteForwarder: Send + Sync {
    fn forward_unix_socket(
        &self,
        cancel: CancellationToken,
        profile: &Profile,
        local_path: &Path,
        remote_path: &Path,
    ) -> ForwardSignals;
}

/// One active forwarding session.
///
/// Owned by the acquisition path until a channel is produced; ownership
/// then transfers to the lifecycle watcher, which is the only place
/// allowed to cancel it.
#[derive(Debug)]
pub struct TunnelSession {
    pub(crate) local_path: PathBuf,
    pub(crate) ready: oneshot::Receiver<()>,
    pub(crate) failed: oneshot::Receiver<ForwardError>,
    cancel: CancellationToken,
}

impl TunnelSession {
    /// Local socket path the tunnel exposes.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Cancel the tunnel and remove its local socket artifact.
    ///
    /// Consumes the session, so teardown happens exactly once.
    pub(crate) fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = std::fs::remove_file(&self.local_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.local_path.display(), %err, "failed to remove tunnel socket");
            }
        }
    }
}

/// How many times to re-roll the socket suffix when the path is taken.
const PATH_ATTEMPTS: u32 = 8;

/// Derive a tunnel socket path unique to this invocation.
///
/// Re-rolls the random suffix when a socket with the same name already
/// exists, e.g. a leftover from a crashed prior session.
fn unique_socket_path(socket_dir: &Path, profile_name: &str) -> Result<PathBuf, ConnectError> {
    for _ in 0..PATH_ATTEMPTS {
        let suffix = rand::rng().random::<u32>();
        let candidate = socket_dir.join(paths::tunnel_socket_name(profile_name, suffix));
        if !candidate.exists() {
            return Ok(candidate);
        }
        debug!(path = %candidate.display(), "tunnel socket path taken, retrying");
    }
    Err(ConnectError::TunnelStart(format!(
        "no free tunnel socket path for profile {profile_name}"
    )))
}

/// Start a forwarding session for `profile`.
///
/// The tunnel's cancellation scope is a child of `parent`, so cancelling
/// the caller's scope also tears down a tunnel that never became ready.
pub(crate) fn start_tunnel(
    forwarder: &dyn RemoteForwarder,
    profile: &Profile,
    socket_dir: &Path,
    remote_path: &Path,
    parent: &CancellationToken,
) -> Result<TunnelSession, ConnectError> {
    std::fs::create_dir_all(socket_dir)
        .map_err(|err| ConnectError::TunnelStart(format!("cannot create socket dir: {err}")))?;
    let local_path = unique_socket_path(socket_dir, &profile.name)?;
    let cancel = parent.child_token();
    let signals = forwarder.forward_unix_socket(cancel.clone(), profile, &local_path, remote_path);
    Ok(TunnelSession {
        local_path,
        ready: signals.ready,
        failed: signals.failed,
        cancel,
    })
}
