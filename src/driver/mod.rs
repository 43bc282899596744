//! Scenario driver
//!
//! The driver issues create/delete/lookup against a `ConversationSurface`.
//! Two surfaces exist: an in-process mock used to self-test the harness, and
//! a remote surface that talks to a launched target over IPC.

mod mock;
mod remote;
mod scenario;

use std::fmt;

use async_trait::async_trait;

use crate::common::Result;
use crate::store::Conversation;

pub use mock::MockSurface;
pub use remote::RemoteSurface;
pub use scenario::{ScenarioDriver, ScenarioOutcome, ScenarioState};

/// Logical operation against a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    Lookup,
    Resync,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Lookup => "lookup",
            Operation::Resync => "resync",
        };
        f.write_str(name)
    }
}

/// The capability set a scenario needs from a target
#[async_trait]
pub trait ConversationSurface: Send {
    /// Human-readable name of the variant, printed before the scenario runs
    fn describe(&self) -> String;

    async fn create(&mut self, id: &str, name: &str) -> Result<Conversation>;

    /// Deleting an id the target does not know is an error
    async fn delete(&mut self, id: &str) -> Result<()>;

    /// Absence is `Ok(None)`, never an error
    async fn lookup(&mut self, id: &str) -> Result<Option<Conversation>>;

    async fn resync(&mut self) -> Result<()>;
}
