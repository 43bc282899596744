//! Surrogate server - IPC listener and main event loop

use std::path::PathBuf;
use std::time::Duration;

use interprocess::local_socket::traits::tokio::Listener as ListenerTrait;
use tokio::io::BufReader;

use crate::common::{error::IpcError, paths, Result};
use crate::ipc::{
    protocol::{Command, Request, Response},
    transport,
};
use crate::store::{ConversationStore, Fault};

use super::handler;

/// How long a connected client may stay silent before it is dropped
const CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Surrogate target serving a conversation store
pub struct Surrogate {
    /// Socket path to listen on
    socket: PathBuf,
    /// Conversation state
    store: ConversationStore,
    /// Whether shutdown was requested
    shutdown_requested: bool,
}

impl Surrogate {
    pub fn new(socket: PathBuf, fault: Fault) -> Self {
        Self {
            socket,
            store: ConversationStore::new(fault),
            shutdown_requested: false,
        }
    }

    /// Serve until a `shutdown` command or a termination signal arrives
    pub async fn run(&mut self) -> Result<()> {
        let listener = transport::create_listener(&self.socket).await?;
        tracing::info!(socket = %self.socket.display(), "Surrogate listening");

        let result = self.serve_until_signalled(&listener).await;

        tracing::info!("Cleaning up surrogate resources");
        drop(listener);
        paths::remove_socket(&self.socket)?;
        tracing::info!("Surrogate shutdown complete");

        result
    }

    #[cfg(unix)]
    async fn serve_until_signalled(&mut self, listener: &transport::platform::Listener) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                Ok(())
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    #[cfg(not(unix))]
    async fn serve_until_signalled(&mut self, listener: &transport::platform::Listener) -> Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down gracefully");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept clients one at a time until shutdown is requested
    async fn serve(&mut self, listener: &transport::platform::Listener) -> Result<()> {
        while !self.shutdown_requested {
            match listener.accept().await {
                Ok(stream) => {
                    if let Err(e) = self.handle_client(stream).await {
                        tracing::error!("Error handling client: {}", e);
                    }
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }
        tracing::info!("Shutdown requested, exiting");
        Ok(())
    }

    /// Handle a single client connection
    async fn handle_client(&mut self, stream: transport::platform::Stream) -> Result<()> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        loop {
            let request_data = tokio::select! {
                result = transport::recv_message(&mut reader) => {
                    match result {
                        Ok(data) => data,
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            tracing::debug!("Client disconnected");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Error reading request: {}", e);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(CLIENT_IDLE_TIMEOUT) => {
                    tracing::debug!("Client timeout");
                    break;
                }
            };

            let request: Request = match serde_json::from_slice(&request_data) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!("Invalid request: {}", e);
                    let response = Response::error(
                        0,
                        IpcError {
                            code: "INVALID_REQUEST".to_string(),
                            message: e.to_string(),
                        },
                    );
                    let json = serde_json::to_vec(&response)?;
                    transport::send_message(&mut writer, &json).await?;
                    continue;
                }
            };

            tracing::debug!("Received command: {:?}", request.command);

            if matches!(request.command, Command::Shutdown) {
                self.shutdown_requested = true;
                let json = serde_json::to_vec(&Response::ok(request.id))?;
                transport::send_message(&mut writer, &json).await?;
                break;
            }

            let response = handler::handle_command(&mut self.store, request.id, request.command).await;

            let json = serde_json::to_vec(&response)?;
            transport::send_message(&mut writer, &json).await?;
        }

        Ok(())
    }
}
