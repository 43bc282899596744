//! Verifier and reporter
//!
//! Turns a driver outcome into exactly one `ScenarioResult`. A conversation
//! that survives deletion is a normal failing result, not an error.

use colored::Colorize;

use crate::common::{Error, ErrorKind};
use crate::driver::{ScenarioOutcome, ScenarioState};

pub const PASS_MESSAGE: &str = "Test passed: Conversation was successfully deleted";
pub const STILL_EXISTS_MESSAGE: &str = "Test failed: Conversation still exists after deletion";

/// Why a scenario did not pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The conversation was still present after deletion
    Verification,
    /// The run was cut short by an error of this kind
    Error(ErrorKind),
}

impl Failure {
    pub fn exit_code(self) -> i32 {
        match self {
            Failure::Verification => 1,
            Failure::Error(kind) => kind.exit_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub passed: bool,
    pub message: String,
    pub failure: Option<Failure>,
}

impl ScenarioResult {
    pub fn passed() -> Self {
        Self {
            passed: true,
            message: PASS_MESSAGE.to_string(),
            failure: None,
        }
    }

    /// Failing result carrying the error that caused it
    pub fn from_error(error: &Error) -> Self {
        let kind = error.kind();
        Self {
            passed: false,
            message: format!("Test failed: {} error: {}", kind, error),
            failure: Some(Failure::Error(kind)),
        }
    }

    /// Failing result for a run cut off by the overall timeout
    pub fn timed_out(secs: u64) -> Self {
        Self::from_error(&Error::Timeout(secs))
    }

    pub fn exit_code(&self) -> i32 {
        self.failure.map(Failure::exit_code).unwrap_or(0)
    }
}

/// Judge a finished scenario
pub fn verify(outcome: &ScenarioOutcome) -> ScenarioResult {
    if let Some(error) = &outcome.error {
        return ScenarioResult::from_error(error);
    }

    match (outcome.state, &outcome.final_lookup) {
        (ScenarioState::Verified, None) => ScenarioResult::passed(),
        (_, Some(_)) => ScenarioResult {
            passed: false,
            message: STILL_EXISTS_MESSAGE.to_string(),
            failure: Some(Failure::Verification),
        },
        (state, None) => ScenarioResult::from_error(&Error::Internal(format!(
            "scenario ended in {:?} without a verdict",
            state
        ))),
    }
}

/// Print the verdict as the final line of stdout
pub fn report(result: &ScenarioResult) {
    if result.passed {
        println!("\n{}", "✓ Scenario passed".green().bold());
    } else {
        println!("\n{}", "✗ Scenario failed".red().bold());
    }
    println!("{}", result.message);
}
