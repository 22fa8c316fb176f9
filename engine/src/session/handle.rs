use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::*;
use super::events::UciLogEntry;
use super::store::{SessionReader, SessionState};

/// Cheap, cloneable handle to a session actor.
///
/// Requests return once the controller has taken them, not when the engine
/// has acted on them; watch the [`SessionReader`] for results. The session
/// shuts down when the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    reader: SessionReader,
    uci_log: broadcast::Sender<UciLogEntry>,
}

impl SessionHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<SessionCommand>,
        reader: SessionReader,
        uci_log: broadcast::Sender<UciLogEntry>,
    ) -> Self {
        Self {
            cmd_tx,
            reader,
            uci_log,
        }
    }

    pub async fn request_position(&self, fen: impl Into<String>) -> Result<(), SessionError> {
        let fen = fen.into();
        self.call(|reply| SessionCommand::AnalyzePosition { fen, reply })
            .await
    }

    pub async fn request_stop(&self) -> Result<(), SessionError> {
        self.call(|reply| SessionCommand::Stop { reply }).await
    }

    pub async fn request_option_change(
        &self,
        name: impl Into<String>,
        value: impl ToString,
    ) -> Result<(), SessionError> {
        let name = name.into();
        let value = value.to_string();
        self.call(|reply| SessionCommand::ChangeOption { name, value, reply })
            .await
    }

    pub async fn set_search_depth(&self, depth: u32) -> Result<(), SessionError> {
        self.call(|reply| SessionCommand::SetSearchDepth { depth, reply })
            .await
    }

    pub async fn resume_analysis(&self) -> Result<(), SessionError> {
        self.call(|reply| SessionCommand::ResumeAnalysis { reply })
            .await
    }

    pub fn snapshot(&self) -> SessionState {
        self.reader.snapshot()
    }

    pub fn reader(&self) -> SessionReader {
        self.reader.clone()
    }

    /// Raw protocol traffic from now on.
    pub fn subscribe_uci(&self) -> broadcast::Receiver<UciLogEntry> {
        self.uci_log.subscribe()
    }

    /// Stop the engine process and end the actor. Waits for teardown.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    async fn call(
        &self,
        command: impl FnOnce(oneshot::Sender<()>) -> SessionCommand,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}
