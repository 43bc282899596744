//! Owned child processes
//!
//! A `ProcessHandle` is created by the launcher and handed straight to
//! `Teardown`, which is the only place that signals it.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::common::{Error, Result};

/// How a process ended during teardown
#[derive(Debug)]
pub enum Termination {
    /// It was gone before we asked
    AlreadyExited(ExitStatus),
    /// It exited within the grace period after SIGTERM
    Terminated(ExitStatus),
    /// It had to be killed
    Killed,
}

/// A spawned child process and its label
pub struct ProcessHandle {
    label: String,
    child: Child,
    pid: Option<u32>,
}

impl ProcessHandle {
    /// Spawn `command` in its own process group with output forwarded to tracing
    pub fn spawn(label: &str, mut command: Command) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // New process group, so teardown also reaches grandchildren (npm -> electron)
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::launch(label, "program not found")
            } else {
                Error::launch(label, e)
            }
        })?;

        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            forward_output(label, "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(label, "stderr", stderr);
        }

        tracing::info!(process = label, pid, "Spawned process");

        Ok(Self {
            label: label.to_string(),
            child,
            pid,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Non-blocking exit check
    pub fn try_exit(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Ask the process to stop, escalating to a kill after `grace`
    pub async fn terminate(&mut self, grace: Duration) -> Result<Termination> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(Termination::AlreadyExited(status));
        }

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            signal_group(pid, libc::SIGTERM);
        }
        #[cfg(not(unix))]
        self.child.start_kill()?;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(Termination::Terminated(status?)),
            Err(_) => {
                #[cfg(unix)]
                if let Some(pid) = self.pid {
                    signal_group(pid, libc::SIGKILL);
                }
                self.child.kill().await?;
                Ok(Termination::Killed)
            }
        }
    }

    /// Synchronous last-resort kill, for drop paths
    pub fn force_kill(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            signal_group(pid, libc::SIGKILL);
        }
        let _ = self.child.start_kill();
    }
}

/// Signal the whole process group led by `pid`, or just `pid` if that fails
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    let result = unsafe { libc::kill(-pid, signal) };
    if result != 0 {
        unsafe { libc::kill(pid, signal) };
    }
}

fn forward_output<R>(label: &str, stream: &'static str, output: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let label = label.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(output).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(process = %label, stream, "{}", line);
        }
    });
}
