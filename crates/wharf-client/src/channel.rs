//! Channel handle and connectivity state for daemon connections.

use std::path::Path;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::sync::watch;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

/// Transport health of a daemon channel.
///
/// `Shutdown` is terminal: once entered, the state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

/// A live channel to the daemon.
///
/// Wraps the underlying tonic [`Channel`] together with a connectivity
/// state cell. The RPC layer reports transitions via [`set_state`];
/// background observers subscribe to the same cell. Dropping the handle
/// counts as shutdown for observers.
///
/// [`set_state`]: DaemonChannel::set_state
#[derive(Debug)]
pub struct DaemonChannel {
    channel: Channel,
    state_tx: watch::Sender<ConnectivityState>,
}

impl DaemonChannel {
    pub(crate) fn new(channel: Channel) -> Self {
        let (state_tx, _) = watch::channel(ConnectivityState::Ready);
        Self { channel, state_tx }
    }

    /// Clone of the underlying transport channel, for building service
    /// clients.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Current connectivity state.
    pub fn state(&self) -> ConnectivityState {
        *self.state_tx.borrow()
    }

    /// Record a state transition observed by the RPC layer.
    ///
    /// Transitions out of [`ConnectivityState::Shutdown`] are ignored.
    pub fn set_state(&self, next: ConnectivityState) {
        self.state_tx.send_if_modified(|current| {
            if *current == ConnectivityState::Shutdown || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Mark the channel as terminally shut down.
    pub fn mark_shutdown(&self) {
        self.set_state(ConnectivityState::Shutdown);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state_tx.subscribe()
    }
}

/// Dial a unix-domain socket with a plaintext HTTP/2 transport.
///
/// Traffic on this hop never leaves the machine; the socket's filesystem
/// permissions are the trust boundary. Remote traffic is already encrypted
/// by the tunnel in front of it.
pub(crate) async fn dial_unix(
    path: &Path,
    connect_timeout: Duration,
) -> Result<Channel, tonic::transport::Error> {
    let path = path.to_path_buf();
    // The endpoint URI is required by the builder but never resolved; the
    // connector always dials the socket path.
    Endpoint::from_static("http://wharfd.localhost")
        .connect_timeout(connect_timeout)
        .connect_with_connector(service_fn(move |_: Uri| {
            let path = path.clone();
            async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
        }))
        .await
}
