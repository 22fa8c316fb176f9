pub mod format;
pub mod session;
pub mod transport;
pub mod uci;

pub use format::{format_score, score_class, ScoreClass};
pub use session::{
    spawn_session, EngineSession, SessionConfig, SessionError, SessionHandle, SessionReader,
    SessionState, SessionStore, UciDirection, UciLogEntry,
};
pub use transport::{find_engine_path, EngineTransport, StockfishProcess, TransportError, TransportEvent};
pub use uci::{parse_event, UciCommand, UciEvent};

use serde::{Deserialize, Serialize};

/// Kind of evaluation carried by an engine line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Material evaluation in 1/100 of a pawn.
    #[default]
    Centipawn,
    /// Moves to mate. Positive = side to move mates, negative = side to move gets mated.
    Mate,
}

/// One ranked candidate line from a progress sample.
///
/// A line is identified within a session by `multipv` and is always replaced
/// wholesale by a fresher sample for the same rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLine {
    pub depth: u32,
    pub score: i32,
    pub score_kind: ScoreKind,
    /// Principal variation as UCI move tokens.
    pub pv: Vec<String>,
    /// Principal variation exactly as the engine printed it.
    pub raw_pv: String,
    pub nodes: u64,
    pub nps: u64,
    /// Line rank, 1-indexed (1 = best).
    pub multipv: u32,
}

impl EngineLine {
    pub fn display_score(&self) -> String {
        format_score(self.score, self.score_kind)
    }

    pub fn score_class(&self) -> ScoreClass {
        score_class(self.score, self.score_kind)
    }
}
