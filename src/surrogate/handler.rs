//! Command handler for the surrogate target
//!
//! Translates IPC commands into conversation store operations.

use serde_json::json;

use crate::common::{error::IpcError, Error, Result};
use crate::ipc::protocol::{Command, LookupResult, PingResult, Response, ResyncResult};
use crate::store::{ConversationStore, Fault};

/// Handle an IPC command
pub async fn handle_command(store: &mut ConversationStore, id: u64, command: Command) -> Response {
    match handle_command_inner(store, command).await {
        Ok(result) => Response::success(id, result),
        Err(e) => Response::error(id, IpcError::from(&e)),
    }
}

async fn handle_command_inner(
    store: &mut ConversationStore,
    command: Command,
) -> Result<serde_json::Value> {
    // A stalled target still answers pings so it looks ready
    if store.fault() == Fault::Stall && !matches!(command, Command::Ping | Command::Shutdown) {
        tracing::debug!(?command, "Stalling (injected fault)");
        std::future::pending::<()>().await;
    }

    match command {
        Command::Ping => Ok(serde_json::to_value(PingResult {
            pid: std::process::id(),
            conversations: store.len(),
        })?),

        Command::Create { id, name } => {
            let conversation = store.create(&id, &name)?;
            tracing::info!(id = %conversation.id, "Conversation created");
            Ok(serde_json::to_value(conversation)?)
        }

        Command::Delete { id } => {
            store.delete(&id)?;
            tracing::info!(%id, "Conversation deleted");
            Ok(json!({}))
        }

        Command::Lookup { id } => Ok(serde_json::to_value(LookupResult {
            conversation: store.lookup(&id),
        })?),

        Command::Resync => {
            let restored = store.resync();
            if restored > 0 {
                tracing::info!(restored, "Resync restored conversations");
            }
            Ok(serde_json::to_value(ResyncResult { restored })?)
        }

        // Handled by the server loop before dispatch
        Command::Shutdown => Err(Error::Internal(
            "shutdown must be handled by the server".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Conversation;
    use std::time::Duration;

    fn create(id: &str) -> Command {
        Command::Create {
            id: id.to_string(),
            name: format!("Conversation {id}"),
        }
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let mut store = ConversationStore::default();

        let response = handle_command(&mut store, 1, create("c1")).await;
        assert!(response.success);
        assert_eq!(response.id, 1);
        let created: Conversation = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(created.id, "c1");

        let response = handle_command(&mut store, 2, Command::Lookup { id: "c1".into() }).await;
        let lookup: LookupResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(lookup.conversation, Some(created));
    }

    #[tokio::test]
    async fn test_lookup_of_absent_conversation_succeeds() {
        let mut store = ConversationStore::default();
        let response = handle_command(&mut store, 1, Command::Lookup { id: "nope".into() }).await;

        assert!(response.success);
        let lookup: LookupResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert!(lookup.conversation.is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_reports_not_found() {
        let mut store = ConversationStore::default();
        let response = handle_command(&mut store, 7, Command::Delete { id: "ghost".into() }).await;

        assert!(!response.success);
        let error = response.error.unwrap();
        assert_eq!(error.code, "CONVERSATION_NOT_FOUND");
        assert_eq!(error.message, "ghost");
    }

    #[tokio::test]
    async fn test_duplicate_create_reports_exists() {
        let mut store = ConversationStore::default();
        handle_command(&mut store, 1, create("c1")).await;
        let response = handle_command(&mut store, 2, create("c1")).await;

        assert_eq!(response.error.unwrap().code, "CONVERSATION_EXISTS");
    }

    #[tokio::test]
    async fn test_resync_reports_restored_count() {
        let mut store = ConversationStore::default();
        store.seed_remote(Conversation {
            id: "elsewhere".into(),
            name: "From another device".into(),
        });

        let response = handle_command(&mut store, 1, Command::Resync).await;
        let result: ResyncResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.restored, 1);

        let response = handle_command(&mut store, 2, Command::Ping).await;
        let ping: PingResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(ping.conversations, 1);
        assert_eq!(ping.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_stall_fault_blocks_operations_but_not_ping() {
        let mut store = ConversationStore::new(Fault::Stall);

        let ping = handle_command(&mut store, 1, Command::Ping).await;
        assert!(ping.success);

        let stalled = tokio::time::timeout(
            Duration::from_millis(50),
            handle_command(&mut store, 2, create("c1")),
        )
        .await;
        assert!(stalled.is_err());
    }

    #[tokio::test]
    async fn test_fail_create_is_internal_error() {
        let mut store = ConversationStore::new(Fault::FailCreate);
        let response = handle_command(&mut store, 1, create("c1")).await;
        assert_eq!(response.error.unwrap().code, "INTERNAL_ERROR");
    }
}
