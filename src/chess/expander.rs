//! Replays puzzle move lists into reachable positions.

use crate::chess::board::{BoardFactory, ChessBoard};
use crate::chess::shakmaty_board::ShakmatyFactory;
use crate::error::{NifError, Result};
use crate::puzzle::RawPuzzle;

/// Positions and transcript produced by replaying a move list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Starting position first, then one FEN per move.
    pub fens: Vec<String>,
    pub pgn: String,
}

/// Something that can expand a raw puzzle.
pub trait Expand: Send + Sync {
    fn expand(&self, puzzle: &RawPuzzle) -> Result<Expansion>;
}

/// Replays moves through a [`ChessBoard`].
#[derive(Debug, Clone, Default)]
pub struct PositionExpander<F: BoardFactory = ShakmatyFactory> {
    factory: F,
}

impl PositionExpander<ShakmatyFactory> {
    pub fn new() -> Self {
        Self::with_factory(ShakmatyFactory)
    }
}

impl<F: BoardFactory> PositionExpander<F> {
    pub fn with_factory(factory: F) -> Self {
        PositionExpander { factory }
    }

    /// Replay `moves` from `start_fen`.
    ///
    /// Any illegal move fails the whole expansion; no partial position list is
    /// ever returned.
    pub fn expand_moves(&self, id: &str, start_fen: &str, moves: &[String]) -> Result<Expansion> {
        let mut board = self
            .factory
            .from_fen(start_fen)
            .map_err(|e| NifError::move_application(id, e.to_string()))?;

        let mut fens = Vec::with_capacity(moves.len() + 1);
        fens.push(board.fen());
        for uci in moves {
            board
                .apply_uci(uci)
                .map_err(|e| NifError::move_application(id, e.to_string()))?;
            fens.push(board.fen());
        }

        Ok(Expansion {
            fens,
            pgn: board.transcript(),
        })
    }
}

impl<F: BoardFactory> Expand for PositionExpander<F> {
    fn expand(&self, puzzle: &RawPuzzle) -> Result<Expansion> {
        self.expand_moves(&puzzle.id, &puzzle.fen, &puzzle.moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn moves(list: &str) -> Vec<String> {
        list.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_expand_returns_start_and_one_fen_per_move() {
        let expander = PositionExpander::new();
        let expansion = expander
            .expand_moves("A", START, &moves("e2e4 e7e5 g1f3"))
            .unwrap();

        assert_eq!(expansion.fens.len(), 4);
        assert_eq!(expansion.fens[0], START);
        assert_eq!(
            expansion.fens[3],
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
        assert!(expansion.pgn.ends_with("1. e4 e5 2. Nf3 *"));
    }

    #[test]
    fn test_empty_move_list() {
        let expansion = PositionExpander::new().expand_moves("A", START, &[]).unwrap();
        assert_eq!(expansion.fens, vec![START.to_string()]);
    }

    #[test]
    fn test_illegal_move_fails_the_record() {
        let err = PositionExpander::new()
            .expand_moves("B", START, &moves("e2e4 e2e4"))
            .unwrap_err();
        match err {
            NifError::MoveApplication { id, message } => {
                assert_eq!(id, "B");
                assert!(message.contains("e2e4"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_promotion_moves() {
        let expansion = PositionExpander::new()
            .expand_moves("P", "8/4P3/8/8/8/8/8/k6K w - - 0 1", &moves("e7e8q"))
            .unwrap();
        assert_eq!(expansion.fens[1], "4Q3/8/8/8/8/8/8/k6K b - - 0 1");
    }
}
