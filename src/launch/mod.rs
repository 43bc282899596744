//! Harness launcher
//!
//! Starts the optional virtual display and then the target, registering each
//! process with `Teardown` before probing it so a failed start is still
//! cleaned up.

mod display;
mod process;
mod readiness;

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tokio::process::Command;

use crate::common::config::{Config, TargetConfig};
use crate::common::{display_command, paths, Error, Result};
use crate::ipc::protocol::SOCKET_ENV;
use crate::store::Fault;
use crate::teardown::Teardown;

pub use display::{start_virtual_display, x_socket_path};
pub use process::{ProcessHandle, Termination};
pub use readiness::{ping_socket, wait_until_ready, POLL_INTERVAL};

/// Launch the target and wait until it answers on `socket`
pub async fn launch(
    config: &Config,
    workdir: &Path,
    socket: &Path,
    teardown: &mut Teardown,
) -> Result<()> {
    let grace = Duration::from_secs(config.timeouts.startup_grace_seconds);

    let display = start_virtual_display(&config.display, grace, teardown).await?;

    let (label, mut command) = target_command(&config.target, socket)?;
    command.env(SOCKET_ENV, socket);
    if let Some(display) = &display {
        command.env("DISPLAY", display);
    }
    if workdir.is_dir() {
        command.current_dir(workdir);
    }

    paths::ensure_socket_dir(socket)?;
    paths::remove_socket(socket)?;

    println!("  Starting {}", label.dimmed());
    teardown.shutdown_via(socket);
    let handle = teardown.adopt(ProcessHandle::spawn(&label, command)?);

    let attempts = wait_until_ready(handle, grace, move || ping_socket(socket)).await?;
    tracing::info!(process = %label, attempts, socket = %socket.display(), "Target ready");
    println!("  {} {} ready", "✓".green(), label);

    Ok(())
}

/// Build the command for the configured target, or the built-in surrogate
fn target_command(target: &TargetConfig, socket: &Path) -> Result<(String, Command)> {
    match &target.command {
        Some(argv) => {
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| Error::Config("target.command must not be empty".to_string()))?;
            let mut command = Command::new(program);
            command.args(args);
            Ok((format!("target '{}'", display_command(argv)), command))
        }
        None => {
            let exe = std::env::current_exe().map_err(|e| Error::launch("surrogate", e))?;
            let mut command = Command::new(exe);
            command.arg("surrogate").arg("--socket").arg(socket);
            if target.fault != Fault::None {
                if let Some(value) = clap::ValueEnum::to_possible_value(&target.fault) {
                    command.arg("--fault").arg(value.get_name());
                }
            }
            Ok(("surrogate".to_string(), command))
        }
    }
}
