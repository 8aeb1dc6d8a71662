//! Board capability traits.

use thiserror::Error;

/// A move that cannot be applied in the current position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal move {uci}: {reason}")]
pub struct IllegalMove {
    pub uci: String,
    pub reason: String,
}

impl IllegalMove {
    pub fn new<U: Into<String>, R: Into<String>>(uci: U, reason: R) -> Self {
        IllegalMove {
            uci: uci.into(),
            reason: reason.into(),
        }
    }
}

/// A starting position that cannot be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid FEN '{fen}': {reason}")]
pub struct InvalidPosition {
    pub fen: String,
    pub reason: String,
}

/// The operations the position expander needs from a chess engine.
///
/// Implementations must keep no terminal-state cache that survives a query:
/// asking for the FEN or the transcript of a finished game must not prevent a
/// later [`ChessBoard::apply_uci`] from being evaluated against the current
/// position.
pub trait ChessBoard {
    /// Play a move given in UCI coordinates (`e2e4`, `e7e8q`).
    fn apply_uci(&mut self, uci: &str) -> Result<(), IllegalMove>;

    /// Full FEN of the current position.
    fn fen(&self) -> String;

    /// PGN transcript of the moves played since the starting position.
    fn transcript(&self) -> String;

    /// Undo the last move. No-op at the starting position.
    fn step_backward(&mut self);
}

/// Creates boards from a starting position.
pub trait BoardFactory: Send + Sync {
    type Board: ChessBoard;

    fn from_fen(&self, fen: &str) -> Result<Self::Board, InvalidPosition>;
}
