//! CLI command definitions
//!
//! Defines the clap arguments for a harness run and the hidden surrogate
//! subcommand.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::{DisplayMode, Overrides, SurfaceKind};
use crate::store::Fault;

/// Options for a harness run
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (default: <config dir>/deletion-harness/config.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// YAML file with scenario parameters
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Repository location to clone the target from
    #[arg(long)]
    pub repo: Option<String>,

    /// Working directory for the checkout and the target
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Display handling for the target
    #[arg(long, value_enum)]
    pub display: Option<DisplayMode>,

    /// Conversation surface to drive
    #[arg(long, value_enum)]
    pub surface: Option<SurfaceKind>,

    /// Fault to inject into the conversation store (self-test)
    #[arg(long, value_enum)]
    pub fault: Option<Fault>,

    /// Seconds the target has to become ready
    #[arg(long, value_name = "SECS")]
    pub startup_grace: Option<u64>,

    /// Overall run deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run the install command even if dependencies look installed
    #[arg(long)]
    pub force_install: bool,

    /// Skip source acquisition and dependency installation
    #[arg(long)]
    pub skip_prepare: bool,

    /// Debug-level logging
    #[arg(long, short)]
    pub verbose: bool,
}

impl RunArgs {
    /// Command-line values that override the configuration file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            repo: self.repo.clone(),
            workdir: self.workdir.clone(),
            display: self.display,
            surface: self.surface,
            fault: self.fault,
            startup_grace_seconds: self.startup_grace,
            overall_timeout_seconds: self.timeout,
            scenario: self.scenario.clone(),
            force_install: self.force_install,
            skip_prepare: self.skip_prepare,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// [Internal] Run the built-in target surrogate
    #[command(hide = true)]
    Surrogate {
        /// Socket to serve the command surface on
        #[arg(long)]
        socket: PathBuf,

        /// Fault to inject
        #[arg(long, value_enum, default_value_t = Fault::None)]
        fault: Fault,
    },
}
