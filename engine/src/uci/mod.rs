pub mod parser;

pub use parser::{parse_event, UciEvent};

use std::fmt;

/// Commands sent to the engine. `Display` renders the protocol line without
/// the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    /// Handshake request, answered by `uciok`.
    Uci,
    SetOption { name: String, value: String },
    /// Settle request, answered by `readyok`.
    IsReady,
    Position { fen: String },
    Go { depth: u32 },
    Stop,
    Quit,
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => write!(f, "uci"),
            Self::SetOption { name, value } => write!(f, "setoption name {} value {}", name, value),
            Self::IsReady => write!(f, "isready"),
            Self::Position { fen } => write!(f, "position fen {}", fen),
            Self::Go { depth } => write!(f, "go depth {}", depth),
            Self::Stop => write!(f, "stop"),
            Self::Quit => write!(f, "quit"),
        }
    }
}
