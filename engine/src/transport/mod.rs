//! The engine process as an opaque asynchronous actor.
//!
//! A transport offers four operations: `send` a line, a stream of inbound
//! lines, a fatal-error notification (both delivered as [`TransportEvent`]s
//! on the channel returned at spawn time), and `terminate`. The session
//! controller only ever talks to an engine through this seam.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod stockfish;

pub use stockfish::{find_engine_path, StockfishProcess};

/// Inbound traffic from the engine, strictly FIFO per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One line of engine output, without the line terminator.
    Line(String),
    /// The process failed outside the protocol (crash, EOF, I/O error).
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Engine executable not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Engine transport is closed")]
    Closed,
}

/// Outbound half of an engine connection.
pub trait EngineTransport: Send + 'static {
    /// Queue one command line for the engine. Never blocks.
    fn send(&mut self, line: &str) -> Result<(), TransportError>;

    /// Release the process. Sends after this fail with [`TransportError::Closed`].
    fn terminate(&mut self);
}
