//! Conversation deletion harness
//!
//! Prepares and launches a chat application, drives one create/delete/verify
//! cycle against its conversation surface and reports a single verdict.

use clap::Parser;
use deletion_harness::commands::{Commands, RunArgs};
use deletion_harness::common::config::Config;
use deletion_harness::common::{logging, ErrorKind};
use deletion_harness::{harness, surrogate};

#[derive(Parser)]
#[command(name = "deletion-harness", about = "Smoke test for conversation deletion")]
#[command(version, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Surrogate { socket, fault }) = cli.command {
        let _guard = logging::init_surrogate();
        if let Err(e) = surrogate::run(socket, fault).await {
            tracing::error!("Surrogate failed: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    logging::init_cli(cli.run.verbose);

    let config = match load_config(&cli.run) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {} failed: {}", e.kind().phase(), e);
            std::process::exit(ErrorKind::Config.exit_code());
        }
    };

    let outcome = harness::run(&config).await;
    outcome.report();
    std::process::exit(outcome.exit_code());
}

fn load_config(args: &RunArgs) -> deletion_harness::Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(args.overrides())?;
    Ok(config)
}
