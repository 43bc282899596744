//! Run orchestration
//!
//! Sequences preparation, launch, the scenario and verification under one
//! overall deadline, and releases everything the run started no matter how
//! it ends.

use std::time::Duration;

use colored::Colorize;

use crate::common::config::{Config, ScenarioConfig, SurfaceKind};
use crate::common::{paths, Error, Result};
use crate::driver::{ConversationSurface, MockSurface, RemoteSurface, ScenarioDriver};
use crate::launch::launch;
use crate::prepare::prepare;
use crate::teardown::Teardown;
use crate::verify::{self, ScenarioResult};

/// Exit code after Ctrl+C (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The scenario ran (or was cut off by the overall timeout) and has a verdict
    Completed(ScenarioResult),
    /// The run stopped before the scenario could start
    Aborted(Error),
    /// The user interrupted the run
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(result) => result.exit_code(),
            RunOutcome::Aborted(e) => e.kind().exit_code(),
            RunOutcome::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }

    /// Print the verdict, or the abort reason on stderr
    pub fn report(&self) {
        match self {
            RunOutcome::Completed(result) => verify::report(result),
            RunOutcome::Aborted(e) => {
                eprintln!("Error: {} failed: {}", e.kind().phase(), e);
            }
            RunOutcome::Interrupted => eprintln!("Interrupted"),
        }
    }
}

/// Execute one harness run
///
/// Teardown has finished by the time this returns, so the caller's report is
/// the last thing the run prints.
pub async fn run(config: &Config) -> RunOutcome {
    let mut teardown = Teardown::new(Duration::from_secs(config.timeouts.terminate_grace_seconds));
    let overall = config.timeouts.overall_timeout_seconds;

    let (outcome, out_of_time) = {
        let phases = tokio::time::timeout(
            Duration::from_secs(overall),
            run_phases(config, &mut teardown),
        );

        tokio::select! {
            result = phases => match result {
                Ok(Ok(result)) => (RunOutcome::Completed(result), false),
                Ok(Err(e)) => (RunOutcome::Aborted(e), false),
                Err(_) => {
                    tracing::warn!(secs = overall, "Overall timeout reached, killing processes");
                    (RunOutcome::Completed(ScenarioResult::timed_out(overall)), true)
                }
            },
            _ = until_interrupted(tokio::signal::ctrl_c()) => {
                tracing::warn!("Interrupted, killing processes");
                (RunOutcome::Interrupted, true)
            }
        }
    };

    // Past the deadline there is no time left for a graceful shutdown
    let released = if out_of_time {
        teardown.abort().await
    } else {
        teardown.release().await
    };
    tracing::debug!(released, "Teardown complete");

    outcome
}

/// Resolves on Ctrl+C; if the handler cannot be installed, never resolves
async fn until_interrupted<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

async fn run_phases(config: &Config, teardown: &mut Teardown) -> Result<ScenarioResult> {
    println!("{} {}", "Running scenario:".bold(), config.scenario.name);
    if let Some(description) = &config.scenario.description {
        println!("  {}", description.dimmed());
    }

    let op_timeout = Duration::from_secs(config.timeouts.operation_seconds);

    match config.target.surface {
        SurfaceKind::Mock => {
            tracing::debug!("Mock surface selected, skipping preparation and launch");
            let mut surface = MockSurface::new(config.target.fault);
            Ok(drive(&mut surface, op_timeout, &config.scenario).await)
        }
        SurfaceKind::Ipc => {
            let prepared = prepare(&config.repo).await?;

            let socket = config
                .target
                .socket
                .clone()
                .unwrap_or_else(paths::run_socket_path);

            println!("\n{}", "Launching:".cyan());
            launch(config, &prepared.workdir, &socket, teardown).await?;

            let mut surface = match RemoteSurface::connect(&socket).await {
                Ok(surface) => surface,
                Err(e) => return Ok(ScenarioResult::from_error(&e)),
            };
            Ok(drive(&mut surface, op_timeout, &config.scenario).await)
        }
    }
}

async fn drive(
    surface: &mut dyn ConversationSurface,
    op_timeout: Duration,
    scenario: &ScenarioConfig,
) -> ScenarioResult {
    println!("\nSurface: {}", surface.describe());
    println!("\n{}", "Steps:".cyan());

    let outcome = ScenarioDriver::new(surface, op_timeout).run(scenario).await;
    verify::verify(&outcome)
}
