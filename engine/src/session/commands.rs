use std::time::Duration;

use tokio::sync::oneshot;

use super::store::{DEFAULT_LINE_COUNT, DEFAULT_SEARCH_DEPTH};

/// How long the engine has to answer the handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Engine session closed")]
    Closed,
}

/// Settings a session starts with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub search_depth: u32,
    pub line_count: u32,
    pub handshake_timeout: Duration,
    /// Name for the session in log spans.
    pub label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_depth: DEFAULT_SEARCH_DEPTH,
            line_count: DEFAULT_LINE_COUNT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            label: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Commands sent to the session actor. Each embeds a oneshot acknowledged
/// once the controller has taken the request.
pub enum SessionCommand {
    AnalyzePosition {
        fen: String,
        reply: oneshot::Sender<()>,
    },
    ChangeOption {
        name: String,
        value: String,
        reply: oneshot::Sender<()>,
    },
    SetSearchDepth {
        depth: u32,
        reply: oneshot::Sender<()>,
    },
    ResumeAnalysis {
        reply: oneshot::Sender<()>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
