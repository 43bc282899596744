//! Teardown
//!
//! Owns every process the launcher started and releases them in reverse
//! order of acquisition. `release` is called on every exit path of a run;
//! `Drop` covers the paths where it cannot be (panics).

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::ipc::protocol::Command;
use crate::ipc::TargetClient;
use crate::launch::{ProcessHandle, Termination};

/// Upper bound for the polite IPC shutdown request
const SHUTDOWN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Teardown {
    handles: Vec<ProcessHandle>,
    shutdown_socket: Option<PathBuf>,
    grace: Duration,
}

impl Teardown {
    /// `grace` is how long each process gets between SIGTERM and a kill
    pub fn new(grace: Duration) -> Self {
        Self {
            handles: Vec::new(),
            shutdown_socket: None,
            grace,
        }
    }

    /// Take ownership of a freshly spawned process
    pub fn adopt(&mut self, handle: ProcessHandle) -> &mut ProcessHandle {
        let index = self.handles.len();
        self.handles.push(handle);
        &mut self.handles[index]
    }

    /// Ask the target on `socket` to shut down before signalling it, and
    /// remove the socket afterwards
    pub fn shutdown_via(&mut self, socket: &Path) {
        self.shutdown_socket = Some(socket.to_path_buf());
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Stop everything, newest first; failures are logged, never returned
    ///
    /// Returns the number of processes released.
    pub async fn release(&mut self) -> usize {
        self.release_within(self.grace, true).await
    }

    /// Kill everything right away, for runs that are already out of time
    pub async fn abort(&mut self) -> usize {
        self.release_within(Duration::ZERO, false).await
    }

    async fn release_within(&mut self, grace: Duration, polite: bool) -> usize {
        let socket = self.shutdown_socket.take();
        if let Some(socket) = &socket {
            if polite && !self.handles.is_empty() {
                request_shutdown(socket).await;
            }
        }

        let mut released = 0;
        while let Some(mut handle) = self.handles.pop() {
            let label = handle.label().to_string();
            match handle.terminate(grace).await {
                Ok(Termination::AlreadyExited(status)) => {
                    tracing::info!(process = %label, %status, "Process had already exited");
                }
                Ok(Termination::Terminated(status)) => {
                    tracing::info!(process = %label, %status, "Process terminated");
                }
                Ok(Termination::Killed) if grace.is_zero() => {
                    tracing::info!(process = %label, "Process killed");
                }
                Ok(Termination::Killed) => {
                    tracing::warn!(process = %label, "Process ignored SIGTERM and was killed");
                }
                Err(e) => {
                    tracing::warn!(process = %label, error = %e, "Failed to terminate process");
                }
            }
            released += 1;
        }

        if let Some(socket) = socket {
            if let Err(e) = paths::remove_socket(&socket) {
                tracing::warn!(socket = %socket.display(), error = %e, "Failed to remove socket");
            }
        }

        released
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        for handle in &mut self.handles {
            tracing::warn!(process = handle.label(), "Killing process left behind by teardown");
            handle.force_kill();
        }
    }
}

/// Best-effort `shutdown` over IPC
async fn request_shutdown(socket: &Path) {
    let attempt = async {
        let mut client = TargetClient::connect(socket).await?;
        client.send_command(Command::Shutdown).await
    };
    match tokio::time::timeout(SHUTDOWN_REQUEST_TIMEOUT, attempt).await {
        Ok(Ok(_)) => tracing::debug!(socket = %socket.display(), "Target acknowledged shutdown"),
        Ok(Err(e)) => tracing::debug!(error = %e, "Shutdown request failed"),
        Err(_) => tracing::debug!("Shutdown request timed out"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command as ProcessCommand;

    fn sleeper(label: &str) -> ProcessHandle {
        let mut command = ProcessCommand::new("sleep");
        command.arg("30");
        ProcessHandle::spawn(label, command).unwrap()
    }

    #[tokio::test]
    async fn test_release_stops_everything() {
        let mut teardown = Teardown::new(Duration::from_secs(2));
        teardown.adopt(sleeper("display"));
        teardown.adopt(sleeper("target"));
        assert_eq!(teardown.len(), 2);

        assert_eq!(teardown.release().await, 2);
        assert!(teardown.is_empty());
    }

    #[tokio::test]
    async fn test_release_tolerates_dead_processes() {
        let mut teardown = Teardown::new(Duration::from_secs(1));
        let handle = teardown.adopt(ProcessHandle::spawn("gone", ProcessCommand::new("true")).unwrap());
        for _ in 0..50 {
            if handle.try_exit().unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(teardown.release().await, 1);
    }

    #[tokio::test]
    async fn test_release_removes_socket_without_listener() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("stale.sock");
        std::fs::write(&socket, b"").unwrap();

        let mut teardown = Teardown::new(Duration::from_secs(1));
        teardown.shutdown_via(&socket);
        teardown.adopt(sleeper("target"));
        teardown.release().await;

        assert!(!socket.exists());
    }

    #[tokio::test]
    async fn test_empty_release_is_noop() {
        let mut teardown = Teardown::new(Duration::from_secs(1));
        assert_eq!(teardown.release().await, 0);
    }

    /// A shell that records its label in `log` when it receives SIGTERM
    fn recorder(label: &str, log: &Path, ready: &Path) -> ProcessHandle {
        let script = format!(
            "trap \"echo {label} >> '{log}'; exit 0\" TERM; touch '{ready}'; while :; do sleep 0.05; done",
            log = log.display(),
            ready = ready.display(),
        );
        let mut command = ProcessCommand::new("sh");
        command.arg("-c").arg(script);
        ProcessHandle::spawn(label, command).unwrap()
    }

    async fn wait_for_file(path: &Path) {
        for _ in 0..100 {
            if path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never appeared", path.display());
    }

    #[tokio::test]
    async fn test_release_order_is_reverse_of_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("terminated.log");
        let display_ready = dir.path().join("display.ready");
        let target_ready = dir.path().join("target.ready");

        let mut teardown = Teardown::new(Duration::from_secs(5));
        teardown.adopt(recorder("display", &log, &display_ready));
        teardown.adopt(recorder("target", &log, &target_ready));
        wait_for_file(&display_ready).await;
        wait_for_file(&target_ready).await;

        assert_eq!(teardown.release().await, 2);

        let order = std::fs::read_to_string(&log).unwrap();
        assert_eq!(order.lines().collect::<Vec<_>>(), vec!["target", "display"]);
    }

    #[tokio::test]
    async fn test_abort_does_not_wait_out_the_grace_period() {
        let mut command = ProcessCommand::new("sh");
        command.arg("-c").arg("trap '' TERM; sleep 30");

        let mut teardown = Teardown::new(Duration::from_secs(30));
        teardown.adopt(ProcessHandle::spawn("stubborn", command).unwrap());

        let started = std::time::Instant::now();
        assert_eq!(teardown.abort().await, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
