//! Wharf client library
//!
//! Client-side connection stack for the wharfd control-plane daemon:
//! - profile-based transport selection (local socket vs. SSH tunnel)
//! - tunnel supervision with readiness/failure signaling
//! - channel lifecycle observation and tunnel reclamation

pub mod channel;
pub mod connection;
pub mod error;
pub mod ssh;
pub mod tunnel;

pub use channel::{ConnectivityState, DaemonChannel};
pub use connection::{ConnectOptions, Connector, get_connection};
pub use error::ConnectError;
pub use ssh::SshForwarder;
pub use tunnel::{ForwardError, ForwardSignals, RemoteForwarder, TunnelSession};
