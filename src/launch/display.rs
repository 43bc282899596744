//! Virtual display
//!
//! Starts an X server when the harness has no display of its own.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use tokio::process::Command;

use crate::common::config::{DisplayConfig, DisplayMode};
use crate::common::{Error, Result};
use crate::teardown::Teardown;

use super::process::ProcessHandle;
use super::readiness::wait_until_ready;

const LABEL: &str = "virtual display";

/// Make a display available per `config`
///
/// Returns the display identifier to inject into the target's environment,
/// or `None` when the target should inherit the harness environment.
pub async fn start_virtual_display(
    config: &DisplayConfig,
    grace: Duration,
    teardown: &mut Teardown,
) -> Result<Option<String>> {
    if config.mode == DisplayMode::None {
        return Ok(None);
    }

    if let Some(existing) = std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()) {
        tracing::info!(display = %existing, "Display already available, not starting a virtual one");
        return Ok(Some(existing));
    }

    let display = format!(":{}", config.number);
    let x_socket = x_socket_path(config.number);
    if x_socket.exists() {
        return Err(Error::launch(
            LABEL,
            format!("display {} is already in use ({})", display, x_socket.display()),
        ));
    }

    let server = which::which(&config.server)
        .map_err(|_| Error::launch(LABEL, format!("'{}' not found in PATH", config.server)))?;

    println!("  Starting virtual display {}", display.dimmed());

    let mut command = Command::new(server);
    command.arg(&display).args(&config.args);
    let handle = teardown.adopt(ProcessHandle::spawn(LABEL, command)?);

    let x_socket_path = x_socket.as_path();
    wait_until_ready(handle, grace, move || std::future::ready(x_socket_path.exists())).await?;

    println!("  {} Virtual display {} ready", "✓".green(), display);
    Ok(Some(display))
}

/// Unix socket an X server listens on for display `number`
pub fn x_socket_path(number: u32) -> PathBuf {
    PathBuf::from(format!("/tmp/.X11-unix/X{}", number))
}
