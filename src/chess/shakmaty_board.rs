//! [`ChessBoard`] backed by shakmaty.

use std::fmt::Write;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

use crate::chess::board::{BoardFactory, ChessBoard, IllegalMove, InvalidPosition};

/// A game in progress: the starting position plus every move played since.
#[derive(Debug, Clone)]
pub struct ShakmatyBoard {
    start_fen: String,
    start: Chess,
    /// Position after each move, paired with the move in SAN.
    history: Vec<(Chess, SanPlus)>,
}

impl ShakmatyBoard {
    /// Load a board from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, InvalidPosition> {
        let invalid = |reason: String| InvalidPosition {
            fen: fen.to_string(),
            reason,
        };

        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let start: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;

        Ok(ShakmatyBoard {
            start_fen: fen.trim().to_string(),
            start,
            history: Vec::new(),
        })
    }

    fn current(&self) -> &Chess {
        self.history.last().map(|(pos, _)| pos).unwrap_or(&self.start)
    }

    /// Number of moves played.
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    fn movetext(&self) -> String {
        let mut text = String::new();
        let mut color = self.start.turn();
        let mut number = self.start.fullmoves().get();

        for (i, (_, san)) in self.history.iter().enumerate() {
            if !text.is_empty() {
                text.push(' ');
            }
            match color {
                Color::White => {
                    let _ = write!(text, "{number}. {san}");
                }
                Color::Black if i == 0 => {
                    let _ = write!(text, "{number}... {san}");
                }
                Color::Black => {
                    let _ = write!(text, "{san}");
                }
            }
            if color == Color::Black {
                number += 1;
            }
            color = !color;
        }
        text
    }
}

impl ChessBoard for ShakmatyBoard {
    fn apply_uci(&mut self, uci: &str) -> Result<(), IllegalMove> {
        let parsed: UciMove = uci
            .parse()
            .map_err(|e| IllegalMove::new(uci, format!("{e}")))?;

        let mut pos = self.current().clone();
        let m = parsed
            .to_move(&pos)
            .map_err(|e| IllegalMove::new(uci, format!("{e}")))?;
        let san = SanPlus::from_move_and_play_unchecked(&mut pos, &m);

        self.history.push((pos, san));
        Ok(())
    }

    fn fen(&self) -> String {
        let setup = self.current().clone().into_setup(EnPassantMode::Legal);
        Fen::from_setup(setup).to_string()
    }

    fn transcript(&self) -> String {
        let movetext = self.movetext();
        let mut pgn = format!("[FEN \"{}\"]\n[SetUp \"1\"]\n\n", self.start_fen);
        if !movetext.is_empty() {
            pgn.push_str(&movetext);
            pgn.push(' ');
        }
        pgn.push('*');
        pgn
    }

    fn step_backward(&mut self) {
        self.history.pop();
    }
}

/// Factory for [`ShakmatyBoard`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyFactory;

impl BoardFactory for ShakmatyFactory {
    type Board = ShakmatyBoard;

    fn from_fen(&self, fen: &str) -> Result<ShakmatyBoard, InvalidPosition> {
        ShakmatyBoard::from_fen(fen)
    }
}
