//! Remote surface over the target's IPC command surface

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::Result;
use crate::ipc::protocol::{Command, LookupResult, ResyncResult};
use crate::ipc::TargetClient;
use crate::store::Conversation;

use super::ConversationSurface;

/// Surface that forwards every call to a running target
pub struct RemoteSurface {
    client: TargetClient,
    socket: PathBuf,
}

impl RemoteSurface {
    pub async fn connect(socket: &Path) -> Result<Self> {
        let client = TargetClient::connect(socket).await?;
        Ok(Self {
            client,
            socket: socket.to_path_buf(),
        })
    }
}

#[async_trait]
impl ConversationSurface for RemoteSurface {
    fn describe(&self) -> String {
        format!("ipc ({})", self.socket.display())
    }

    async fn create(&mut self, id: &str, name: &str) -> Result<Conversation> {
        let result = self
            .client
            .send_command(Command::Create {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn delete(&mut self, id: &str) -> Result<()> {
        self.client
            .send_command(Command::Delete { id: id.to_string() })
            .await?;
        Ok(())
    }

    async fn lookup(&mut self, id: &str) -> Result<Option<Conversation>> {
        let result = self
            .client
            .send_command(Command::Lookup { id: id.to_string() })
            .await?;
        let lookup: LookupResult = serde_json::from_value(result)?;
        Ok(lookup.conversation)
    }

    async fn resync(&mut self) -> Result<()> {
        let result = self.client.send_command(Command::Resync).await?;
        let resync: ResyncResult = serde_json::from_value(result)?;
        tracing::debug!(restored = resync.restored, "Target resynced");
        Ok(())
    }
}
