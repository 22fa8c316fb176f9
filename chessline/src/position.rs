//! Board tracking for the positions sent to the engine.
//!
//! Legality and FEN generation come from `cozy-chess`; this module only keeps
//! the start position and the moves played so moves can be taken back.

use cozy_chess::{Board, File, Move, Rank, Square};

#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Nothing to undo")]
    NothingToUndo,
}

#[derive(Debug, Clone)]
pub struct Position {
    start: Board,
    board: Board,
    history: Vec<Move>,
}

impl Position {
    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let board: Board = fen
            .trim()
            .parse()
            .map_err(|_| PositionError::InvalidFen(fen.to_string()))?;
        Ok(Self::from_board(board))
    }

    fn from_board(board: Board) -> Self {
        Self {
            start: board.clone(),
            board,
            history: Vec::new(),
        }
    }

    /// Play a move given in UCI notation (`e2e4`, `e7e8q`, `e1g1`).
    pub fn play_uci(&mut self, uci: &str) -> Result<(), PositionError> {
        let parsed: Move = uci
            .parse()
            .map_err(|_| PositionError::InvalidMove(uci.to_string()))?;
        let mv = convert_uci_castling(parsed, &self.legal_moves());
        self.board
            .try_play(mv)
            .map_err(|_| PositionError::IllegalMove(uci.to_string()))?;
        self.history.push(mv);
        Ok(())
    }

    /// Take back the last move.
    pub fn undo(&mut self) -> Result<(), PositionError> {
        self.history.pop().ok_or(PositionError::NothingToUndo)?;
        let mut board = self.start.clone();
        for mv in &self.history {
            board
                .try_play(*mv)
                .map_err(|_| PositionError::IllegalMove(format!("{:?}", mv)))?;
        }
        self.board = board;
        Ok(())
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// False when the side to move is checkmated or stalemated. Draws by
    /// rule (fifty moves, repetition) still have moves to analyze.
    pub fn has_legal_moves(&self) -> bool {
        !self.legal_moves().is_empty()
    }

    fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }
}

/// Convert UCI castling notation to cozy_chess notation.
///
/// UCI moves the king two squares (`e1g1`); cozy_chess encodes castling as
/// king-takes-rook (`e1h1`). Anything that is not a legal castle is
/// returned unchanged.
fn convert_uci_castling(mv: Move, legal_moves: &[Move]) -> Move {
    if mv.promotion.is_some() || mv.from.file() != File::E {
        return mv;
    }

    let rook_square = match (mv.from.rank(), mv.to.rank(), mv.to.file()) {
        (Rank::First, Rank::First, File::G) => Square::new(File::H, Rank::First),
        (Rank::First, Rank::First, File::C) => Square::new(File::A, Rank::First),
        (Rank::Eighth, Rank::Eighth, File::G) => Square::new(File::H, Rank::Eighth),
        (Rank::Eighth, Rank::Eighth, File::C) => Square::new(File::A, Rank::Eighth),
        _ => return mv,
    };

    let converted = Move {
        from: mv.from,
        to: rook_square,
        promotion: None,
    };
    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}
