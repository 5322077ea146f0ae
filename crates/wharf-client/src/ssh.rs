//! SSH-backed remote forwarder.
//!
//! Exposes the daemon's remote unix socket locally by spawning the system
//! `ssh` client with a streamlocal forward (`-L local.sock:remote.sock`).
//! Readiness is detected by the forwarded socket appearing on disk;
//! failure is the process exiting before that happens.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wharf_config::Profile;

use crate::tunnel::{ForwardError, ForwardSignals, RemoteForwarder};

/// Interval for checking whether the forwarded socket has appeared.
const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Forwarder backed by the system `ssh` binary.
#[derive(Debug, Default)]
pub struct SshForwarder;

impl SshForwarder {
    /// Build the `ssh` invocation for a profile. `None` when the profile
    /// carries no remote access parameters.
    fn build_command(profile: &Profile, local: &Path, remote: &Path) -> Option<Command> {
        let remote_params = profile.remote.as_ref()?;
        let mut cmd = Command::new("ssh");
        cmd.arg("-N")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ExitOnForwardFailure=yes")
            .arg("-o")
            .arg("StreamLocalBindUnlink=yes")
            .arg("-p")
            .arg(remote_params.port.to_string())
            .arg("-L")
            .arg(format!("{}:{}", local.display(), remote.display()));
        if let Some(key) = &remote_params.private_key_path {
            cmd.arg("-i").arg(key);
        }
        cmd.arg(format!("{}@{}", remote_params.user, remote_params.host));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        Some(cmd)
    }
}

impl RemoteForwarder for SshForwarder {
    fn forward_unix_socket(
        &self,
        cancel: CancellationToken,
        profile: &Profile,
        local_path: &Path,
        remote_path: &Path,
    ) -> ForwardSignals {
        let (ready_tx, ready) = oneshot::channel();
        let (failed_tx, failed) = oneshot::channel();

        let Some(mut cmd) = Self::build_command(profile, local_path, remote_path) else {
            let _ = failed_tx.send(ForwardError(format!(
                "profile {} has no remote access parameters",
                profile.name
            )));
            return ForwardSignals { ready, failed };
        };

        let local = local_path.to_path_buf();
        tokio::spawn(async move {
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    let _ = failed_tx.send(ForwardError(format!("failed to spawn ssh: {err}")));
                    return;
                }
            };

            // Drain stderr so a failure carries the ssh diagnostics.
            let stderr_task = child.stderr.take().map(|stderr| {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    let mut collected = Vec::new();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(target: "wharf::ssh", "{line}");
                        collected.push(line);
                    }
                    collected
                })
            });

            let mut poll = tokio::time::interval(SOCKET_POLL_INTERVAL);
            let mut ready_tx = Some(ready_tx);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!(path = %local.display(), "tunnel cancelled, stopping ssh");
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return;
                    }
                    status = child.wait() => {
                        let diagnostics = match stderr_task {
                            Some(task) => task.await.unwrap_or_default().join("\n"),
                            None => String::new(),
                        };
                        let detail = match status {
                            Ok(status) => format!("ssh exited: {status}"),
                            Err(err) => format!("failed to wait for ssh: {err}"),
                        };
                        let message = if diagnostics.is_empty() {
                            detail
                        } else {
                            format!("{detail}: {diagnostics}")
                        };
                        warn!(path = %local.display(), %message, "tunnel process ended");
                        let _ = failed_tx.send(ForwardError(message));
                        return;
                    }
                    _ = poll.tick(), if ready_tx.is_some() => {
                        if local.exists() {
                            info!(path = %local.display(), "tunnel ready");
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(());
                            }
                        }
                    }
                }
            }
        });

        ForwardSignals { ready, failed }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use wharf_config::RemoteParams;

    fn staging() -> Profile {
        Profile {
            id: "prof-1".into(),
            name: "staging".into(),
            remote: Some(RemoteParams {
                host: "staging.example.com".into(),
                port: 2222,
                user: "deploy".into(),
                private_key_path: Some(PathBuf::from("/home/deploy/.ssh/id_ed25519")),
            }),
        }
    }

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn command_forwards_local_to_remote_socket() {
        let cmd = SshForwarder::build_command(
            &staging(),
            Path::new("/tmp/wharf/wharf-staging-7.sock"),
            Path::new("/tmp/wharf/wharfd.sock"),
        )
        .unwrap();
        let args = args_of(&cmd);
        assert!(args.contains(&"-N".to_string()));
        assert!(args.contains(&"ExitOnForwardFailure=yes".to_string()));
        assert!(
            args.contains(&"/tmp/wharf/wharf-staging-7.sock:/tmp/wharf/wharfd.sock".to_string())
        );
        assert!(args.contains(&"2222".to_string()));
        assert!(args.contains(&"/home/deploy/.ssh/id_ed25519".to_string()));
        assert!(args.contains(&"deploy@staging.example.com".to_string()));
    }

    #[test]
    fn local_profile_yields_no_command() {
        let cmd = SshForwarder::build_command(
            &Profile::local(),
            Path::new("/tmp/a.sock"),
            Path::new("/tmp/b.sock"),
        );
        assert!(cmd.is_none());
    }

    #[tokio::test]
    async fn profile_without_remote_params_signals_failure() {
        let forwarder = SshForwarder;
        let signals = forwarder.forward_unix_socket(
            CancellationToken::new(),
            &Profile::local(),
            Path::new("/tmp/a.sock"),
            Path::new("/tmp/b.sock"),
        );
        let err = signals.failed.await.unwrap();
        assert!(err.to_string().contains("no remote access parameters"));
    }
}
