//! External setup commands (git, package managers)

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;

use crate::common::{display_command, Error, Result};

/// Number of trailing stderr lines quoted in a failure
const STDERR_TAIL_LINES: usize = 5;

/// Run `argv` in `dir` behind a spinner; a non-zero exit is an acquisition error
pub async fn run_step(argv: &[String], dir: Option<&Path>) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Config("empty setup command".to_string()))?;
    let line = display_command(argv);

    let program_path = which::which(program)
        .map_err(|_| Error::Acquisition(format!("'{}' not found in PATH", program)))?;

    let mut command = Command::new(program_path);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(line.clone());
    spinner.enable_steady_tick(Duration::from_millis(100));

    tracing::debug!(command = %line, "Running setup step");
    let output = command.output().await;
    spinner.finish_and_clear();

    let output =
        output.map_err(|e| Error::Acquisition(format!("failed to run '{}': {}", line, e)))?;

    if !output.status.success() {
        return Err(Error::StepFailed {
            command: line,
            status: output.status.to_string(),
            detail: stderr_tail(&output.stderr),
        });
    }

    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    format!(": {}", lines[start..].join(" | "))
}
