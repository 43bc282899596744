//! Harness-side IPC client for a target's command surface

use std::path::Path;

use tokio::io::{ReadHalf, WriteHalf};

use crate::common::{Error, Result};

use super::protocol::{Command, PingResult, Request, Response};
use super::transport::{self, Stream};

/// Client connected to a running target
pub struct TargetClient {
    reader: ReadHalf<Stream>,
    writer: WriteHalf<Stream>,
    next_id: u64,
}

impl TargetClient {
    /// Connect to the target listening on `socket`
    pub async fn connect(socket: &Path) -> Result<Self> {
        let stream = transport::connect(socket)
            .await
            .map_err(Error::ConnectionFailed)?;

        let (reader, writer) = tokio::io::split(stream);

        Ok(Self {
            reader,
            writer,
            next_id: 1,
        })
    }

    /// Send a command and wait for the response
    pub async fn send_command(&mut self, command: Command) -> Result<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request { id, command };
        let json = serde_json::to_vec(&request)?;

        transport::send_message(&mut self.writer, &json)
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        let response_data = transport::recv_message(&mut self.reader)
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        let response: Response = serde_json::from_slice(&response_data)?;

        if response.id != id {
            return Err(Error::Communication(format!(
                "Response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        if response.success {
            Ok(response.result.unwrap_or(serde_json::json!({})))
        } else {
            let error = response
                .error
                .unwrap_or_else(|| crate::common::error::IpcError {
                    code: "UNKNOWN".to_string(),
                    message: "Unknown error".to_string(),
                });
            Err(error.into())
        }
    }

    /// Check that the target answers
    pub async fn ping(&mut self) -> Result<PingResult> {
        let result = self.send_command(Command::Ping).await?;
        Ok(serde_json::from_value(result)?)
    }
}
