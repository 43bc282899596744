//! IPC protocol message types
//!
//! Defines the request/response format between the harness and a target's
//! command surface. Uses a simple length-prefixed JSON protocol.

use serde::{Deserialize, Serialize};

use crate::common::error::IpcError;
use crate::store::Conversation;

/// Environment variable telling a launched target where to listen
pub const SOCKET_ENV: &str = "HARNESS_SOCKET";

/// IPC request from harness to target
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for matching responses
    pub id: u64,
    /// The command to execute
    pub command: Command,
}

/// IPC response from target to harness
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: u64,
    /// Whether the command succeeded
    pub success: bool,
    /// Result data on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error information on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IpcError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: IpcError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Create a success response with no data
    pub fn ok(id: u64) -> Self {
        Self {
            id,
            success: true,
            result: Some(serde_json::json!({})),
            error: None,
        }
    }
}

/// Commands the harness sends to a target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Readiness check
    Ping,

    /// Create a conversation
    Create { id: String, name: String },

    /// Delete a conversation
    Delete { id: String },

    /// Look a conversation up; absence is a successful `LookupResult` with no conversation
    Lookup { id: String },

    /// Re-pull conversations from the server side
    Resync,

    /// Ask the target to exit
    Shutdown,
}

/// Result of `Lookup`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupResult {
    pub conversation: Option<Conversation>,
}

/// Result of `Resync`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResyncResult {
    pub restored: usize,
}

/// Result of `Ping`; targets may answer with an empty object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PingResult {
    pub pid: u32,
    pub conversations: usize,
}
