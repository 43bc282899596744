//! Conversation deletion harness
//!
//! End-to-end smoke test for a chat application: acquire and install the
//! application, launch it (optionally under a virtual display), create a
//! conversation, delete it, verify it is gone, and tear everything down.

pub mod commands;
pub mod common;
pub mod driver;
pub mod harness;
pub mod ipc;
pub mod launch;
pub mod prepare;
pub mod store;
pub mod surrogate;
pub mod teardown;
pub mod verify;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use store::{Conversation, Fault};
