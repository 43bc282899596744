//! Surrogate target
//!
//! A stand-in for the application under test that serves a conversation
//! store over the IPC command surface. The harness launches it (through the
//! hidden `surrogate` subcommand) when no target command is configured, and
//! its injectable faults let the harness exercise its own failure paths.

mod handler;
mod server;

use std::path::PathBuf;

use crate::common::Result;
use crate::store::Fault;

pub use server::Surrogate;

/// Run in surrogate mode
///
/// This is the entry point when the binary is invoked with the hidden
/// `surrogate` command.
pub async fn run(socket: PathBuf, fault: Fault) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        ?fault,
        "Starting surrogate target"
    );

    let mut surrogate = Surrogate::new(socket, fault);
    surrogate.run().await
}
