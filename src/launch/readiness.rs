//! Readiness checks
//!
//! Poll a launched process until it accepts work, fails, or runs out of
//! startup grace. Replaces fixed startup sleeps.

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::common::{Error, Result};
use crate::ipc::TargetClient;

use super::process::ProcessHandle;

/// Delay between readiness attempts
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single IPC ping
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Poll `is_ready` until it succeeds
///
/// Fails early if the process exits, and with `NotReady` once `grace` has
/// elapsed. Returns the number of attempts taken.
pub async fn wait_until_ready<F, Fut>(
    handle: &mut ProcessHandle,
    grace: Duration,
    mut is_ready: F,
) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);

        if let Some(status) = handle.try_exit()? {
            return Err(Error::ExitedDuringStartup {
                label: handle.label().to_string(),
                status: status.to_string(),
            });
        }

        if is_ready().await {
            tracing::debug!(process = handle.label(), attempts, "Process ready");
            return Ok(attempts);
        }

        if start.elapsed() >= grace {
            return Err(Error::NotReady {
                label: handle.label().to_string(),
                secs: grace.as_secs(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// True when a target answers `ping` on `socket`
pub async fn ping_socket(socket: &Path) -> bool {
    let attempt = async {
        let mut client = TargetClient::connect(socket).await?;
        client.ping().await
    };
    matches!(tokio::time::timeout(PING_TIMEOUT, attempt).await, Ok(Ok(_)))
}
