//! Error types for the deletion harness
//!
//! Every error belongs to one harness phase (`ErrorKind`). The phase decides
//! the process exit code and the name printed in the failure line, so a user
//! can tell at a glance whether setup, launch or the scenario itself broke.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::driver::Operation;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Acquisition Errors ===
    #[error("Source acquisition failed: {0}")]
    Acquisition(String),

    #[error("'{command}' exited with {status}{detail}")]
    StepFailed {
        command: String,
        status: String,
        detail: String,
    },

    // === Launch Errors ===
    #[error("Failed to start {label}: {reason}")]
    Launch { label: String, reason: String },

    #[error("{label} exited during startup with {status}")]
    ExitedDuringStartup { label: String, status: String },

    #[error("{label} was not ready after {secs} seconds")]
    NotReady { label: String, secs: u64 },

    // === Operation Errors ===
    #[error("{op} failed: {message}")]
    Operation { op: Operation, message: String },

    #[error("{op} timed out after {secs} seconds")]
    OperationTimeout { op: Operation, secs: u64 },

    #[error("Conversation '{0}' not found")]
    ConversationNotFound(String),

    #[error("Conversation '{0}' already exists")]
    ConversationExists(String),

    #[error("Failed to connect to target: {0}")]
    ConnectionFailed(#[source] io::Error),

    #[error("Target communication error: {0}")]
    Communication(String),

    // === Timeout Errors ===
    #[error("Run timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Harness phase an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Acquisition,
    Launch,
    Operation,
    Timeout,
    Config,
    Internal,
}

impl ErrorKind {
    /// Process exit code for a run that ended with this kind of error
    ///
    /// Code 1 is reserved for a verification failure, which is not an error.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Acquisition => 2,
            ErrorKind::Launch => 3,
            ErrorKind::Operation => 4,
            ErrorKind::Timeout => 5,
            ErrorKind::Config | ErrorKind::Internal => 6,
        }
    }

    /// Phase name used in user-facing failure lines
    pub fn phase(self) -> &'static str {
        match self {
            ErrorKind::Acquisition => "acquisition",
            ErrorKind::Launch => "launch",
            ErrorKind::Operation => "operation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Config => "configuration",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase())
    }
}

impl Error {
    /// Phase this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Acquisition(_) | Error::StepFailed { .. } => ErrorKind::Acquisition,
            Error::Launch { .. } | Error::ExitedDuringStartup { .. } | Error::NotReady { .. } => {
                ErrorKind::Launch
            }
            Error::Operation { .. }
            | Error::OperationTimeout { .. }
            | Error::ConversationNotFound(_)
            | Error::ConversationExists(_)
            | Error::ConnectionFailed(_)
            | Error::Communication(_) => ErrorKind::Operation,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } => ErrorKind::Config,
            Error::Io(_) | Error::Json(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap a failure of a scenario operation, keeping the cause in the message
    pub fn operation(op: Operation, cause: Error) -> Self {
        match cause {
            e @ Error::Operation { .. } | e @ Error::OperationTimeout { .. } => e,
            other => Self::Operation {
                op,
                message: other.to_string(),
            },
        }
    }

    /// Create a launch error for a labelled process
    pub fn launch(label: &str, reason: impl fmt::Display) -> Self {
        Self::Launch {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// IPC-serializable error for target responses
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IpcError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for IpcError {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::ConversationNotFound(_) => "CONVERSATION_NOT_FOUND",
            Error::ConversationExists(_) => "CONVERSATION_EXISTS",
            Error::Json(_) => "INVALID_REQUEST",
            _ => "INTERNAL_ERROR",
        }
        .to_string();

        let message = match e {
            Error::ConversationNotFound(id) | Error::ConversationExists(id) => id.clone(),
            other => other.to_string(),
        };

        Self { code, message }
    }
}

impl From<IpcError> for Error {
    fn from(e: IpcError) -> Self {
        match e.code.as_str() {
            "CONVERSATION_NOT_FOUND" => Error::ConversationNotFound(e.message),
            "CONVERSATION_EXISTS" => Error::ConversationExists(e.message),
            _ => Error::Communication(format!("{}: {}", e.code, e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_phase() {
        let codes = [
            ErrorKind::Acquisition.exit_code(),
            ErrorKind::Launch.exit_code(),
            ErrorKind::Operation.exit_code(),
            ErrorKind::Timeout.exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            assert_ne!(*a, 1, "1 is reserved for verification failures");
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_operation_wraps_cause() {
        let err = Error::operation(
            Operation::Delete,
            Error::ConversationNotFound("missing".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(err.to_string(), "delete failed: Conversation 'missing' not found");
    }

    #[test]
    fn test_operation_does_not_double_wrap() {
        let timeout = Error::OperationTimeout {
            op: Operation::Create,
            secs: 3,
        };
        let err = Error::operation(Operation::Create, timeout);
        assert!(matches!(err, Error::OperationTimeout { secs: 3, .. }));
    }

    #[test]
    fn test_ipc_error_round_trip_keeps_type() {
        let ipc = IpcError::from(&Error::ConversationNotFound("abc".to_string()));
        assert_eq!(ipc.code, "CONVERSATION_NOT_FOUND");
        match Error::from(ipc) {
            Error::ConversationNotFound(id) => assert_eq!(id, "abc"),
            other => panic!("Expected ConversationNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_ipc_code_becomes_communication_error() {
        let err = Error::from(IpcError {
            code: "WEIRD".to_string(),
            message: "boom".to_string(),
        });
        assert!(matches!(err, Error::Communication(_)));
        assert_eq!(err.kind(), ErrorKind::Operation);
    }
}
