//! Scenario state machine
//!
//! `Init -> Created -> Deleted -> Verified`, with `Failed` reachable from any
//! state. Every surface call is bounded by the operation timeout.

use std::future::Future;
use std::time::Duration;

use colored::Colorize;

use crate::common::config::ScenarioConfig;
use crate::common::{Error, Result};
use crate::store::Conversation;

use super::{ConversationSurface, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Init,
    Created,
    Deleted,
    Verified,
    Failed,
}

/// What the driver observed, handed to the verifier
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Terminal state (`Verified` or `Failed`)
    pub state: ScenarioState,
    /// Furthest state reached before the run ended
    pub reached: ScenarioState,
    /// The conversation the final lookup still found, if any
    pub final_lookup: Option<Conversation>,
    /// The error that aborted the scenario, if any
    pub error: Option<Error>,
}

/// Drives one create/delete/verify cycle against a surface
pub struct ScenarioDriver<'a> {
    surface: &'a mut dyn ConversationSurface,
    op_timeout: Duration,
    state: ScenarioState,
    step: usize,
}

impl<'a> ScenarioDriver<'a> {
    pub fn new(surface: &'a mut dyn ConversationSurface, op_timeout: Duration) -> Self {
        Self {
            surface,
            op_timeout,
            state: ScenarioState::Init,
            step: 0,
        }
    }

    /// Run the scenario to a terminal state
    pub async fn run(mut self, scenario: &ScenarioConfig) -> ScenarioOutcome {
        let result = self.drive(scenario).await;
        let reached = self.state;

        match result {
            Ok(None) => {
                self.state = ScenarioState::Verified;
                self.step_ok("conversation is gone");
                ScenarioOutcome {
                    state: self.state,
                    reached,
                    final_lookup: None,
                    error: None,
                }
            }
            Ok(Some(still_there)) => {
                self.state = ScenarioState::Failed;
                self.step_failed(&format!("conversation '{}' is still present", still_there.id));
                ScenarioOutcome {
                    state: self.state,
                    reached,
                    final_lookup: Some(still_there),
                    error: None,
                }
            }
            Err(e) => {
                self.state = ScenarioState::Failed;
                self.step_failed(&e.to_string());
                ScenarioOutcome {
                    state: self.state,
                    reached,
                    final_lookup: None,
                    error: Some(e),
                }
            }
        }
    }

    /// Returns the result of the final lookup
    async fn drive(&mut self, scenario: &ScenarioConfig) -> Result<Option<Conversation>> {
        let id = scenario.conversation_id.as_str();
        let name = scenario.conversation_name.as_str();
        let limit = self.op_timeout;

        let created = bounded(Operation::Create, limit, self.surface.create(id, name)).await?;
        if created.id != id {
            return Err(Error::Operation {
                op: Operation::Create,
                message: format!("asked for '{}', target created '{}'", id, created.id),
            });
        }
        self.state = ScenarioState::Created;
        self.step_ok(&format!("create {} ({})", id, name));

        let seen = bounded(Operation::Lookup, limit, self.surface.lookup(id)).await?;
        match seen {
            Some(c) if c.id == id && c.name == name => {}
            Some(c) => {
                return Err(Error::Operation {
                    op: Operation::Lookup,
                    message: format!(
                        "expected '{}' named '{}', found '{}' named '{}'",
                        id, name, c.id, c.name
                    ),
                });
            }
            None => {
                return Err(Error::Operation {
                    op: Operation::Lookup,
                    message: format!("created conversation '{}' is not visible", id),
                });
            }
        }
        self.step_ok(&format!("lookup {} is present", id));

        bounded(Operation::Delete, limit, self.surface.delete(id)).await?;
        self.state = ScenarioState::Deleted;
        self.step_ok(&format!("delete {}", id));

        if scenario.resync_before_verify {
            bounded(Operation::Resync, limit, self.surface.resync()).await?;
            self.step_ok("resync");
        }

        bounded(Operation::Lookup, limit, self.surface.lookup(id)).await
    }

    fn step_ok(&mut self, what: &str) {
        self.step += 1;
        println!("  {} Step {}: {}", "✓".green(), self.step, what.dimmed());
    }

    fn step_failed(&mut self, what: &str) {
        self.step += 1;
        println!("  {} Step {}: {}", "✗".red(), self.step, what);
    }
}

/// Await a surface call, turning errors and expiry into operation errors
async fn bounded<T, F>(op: Operation, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::operation(op, e)),
        Err(_) => Err(Error::OperationTimeout {
            op,
            secs: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::driver::MockSurface;
    use crate::store::Fault;
    use async_trait::async_trait;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig::default()
    }

    fn limit() -> Duration {
        Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_mock_scenario_verifies() {
        let mut surface = MockSurface::default();
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        assert_eq!(outcome.state, ScenarioState::Verified);
        assert_eq!(outcome.reached, ScenarioState::Deleted);
        assert!(outcome.final_lookup.is_none());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_resync_scenario_verifies() {
        let mut surface = MockSurface::default();
        let mut config = scenario();
        config.resync_before_verify = true;

        let outcome = ScenarioDriver::new(&mut surface, limit()).run(&config).await;
        assert_eq!(outcome.state, ScenarioState::Verified);
    }

    #[tokio::test]
    async fn test_resync_that_resurrects_fails_with_lookup() {
        let mut surface = MockSurface::new(Fault::ResurrectOnResync);
        let mut config = scenario();
        config.resync_before_verify = true;

        let outcome = ScenarioDriver::new(&mut surface, limit()).run(&config).await;
        assert_eq!(outcome.state, ScenarioState::Failed);
        assert_eq!(outcome.reached, ScenarioState::Deleted);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.final_lookup.unwrap().id, "test-conversation");
    }

    #[tokio::test]
    async fn test_resurrect_fault_is_harmless_without_resync() {
        let mut surface = MockSurface::new(Fault::ResurrectOnResync);
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;
        assert_eq!(outcome.state, ScenarioState::Verified);
    }

    #[tokio::test]
    async fn test_ignored_delete_fails_with_lookup() {
        let mut surface = MockSurface::new(Fault::IgnoreDelete);
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        assert_eq!(outcome.state, ScenarioState::Failed);
        assert_eq!(outcome.reached, ScenarioState::Deleted);
        assert!(outcome.error.is_none());
        let still_there = outcome.final_lookup.unwrap();
        assert_eq!(still_there.id, "test-conversation");
        assert_eq!(still_there.name, "Test Conversation");
    }

    #[tokio::test]
    async fn test_create_failure_aborts_before_created() {
        let mut surface = MockSurface::new(Fault::FailCreate);
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        assert_eq!(outcome.state, ScenarioState::Failed);
        assert_eq!(outcome.reached, ScenarioState::Init);
        let err = outcome.error.unwrap();
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert!(matches!(err, Error::Operation { op: Operation::Create, .. }));
    }

    #[tokio::test]
    async fn test_stalled_call_times_out() {
        let mut surface = MockSurface::new(Fault::Stall);
        let outcome = ScenarioDriver::new(&mut surface, Duration::from_millis(50))
            .run(&scenario())
            .await;

        assert_eq!(outcome.state, ScenarioState::Failed);
        assert!(matches!(
            outcome.error,
            Some(Error::OperationTimeout { op: Operation::Create, .. })
        ));
    }

    /// Surface whose create claims success but never stores anything
    struct ForgetfulSurface {
        lookup_name: Option<String>,
    }

    #[async_trait]
    impl ConversationSurface for ForgetfulSurface {
        fn describe(&self) -> String {
            "forgetful".to_string()
        }

        async fn create(&mut self, id: &str, name: &str) -> Result<Conversation> {
            Ok(Conversation {
                id: id.to_string(),
                name: name.to_string(),
            })
        }

        async fn delete(&mut self, id: &str) -> Result<()> {
            Err(Error::ConversationNotFound(id.to_string()))
        }

        async fn lookup(&mut self, id: &str) -> Result<Option<Conversation>> {
            Ok(self.lookup_name.clone().map(|name| Conversation {
                id: id.to_string(),
                name,
            }))
        }

        async fn resync(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delete_of_unknown_id_is_operation_error() {
        let mut surface = ForgetfulSurface {
            lookup_name: Some("Test Conversation".to_string()),
        };
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        assert_eq!(outcome.state, ScenarioState::Failed);
        assert_eq!(outcome.reached, ScenarioState::Created);
        match outcome.error {
            Some(Error::Operation { op, message }) => {
                assert_eq!(op, Operation::Delete);
                assert!(message.contains("not found"));
            }
            other => panic!("Expected delete operation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invisible_create_fails_lookup() {
        let mut surface = ForgetfulSurface { lookup_name: None };
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        assert!(matches!(
            outcome.error,
            Some(Error::Operation { op: Operation::Lookup, .. })
        ));
    }

    #[tokio::test]
    async fn test_renamed_conversation_fails_lookup() {
        let mut surface = ForgetfulSurface {
            lookup_name: Some("Someone Else".to_string()),
        };
        let outcome = ScenarioDriver::new(&mut surface, limit())
            .run(&scenario())
            .await;

        match outcome.error {
            Some(Error::Operation { op, message }) => {
                assert_eq!(op, Operation::Lookup);
                assert!(message.contains("Someone Else"));
            }
            other => panic!("Expected lookup operation error, got {other:?}"),
        }
    }
}
