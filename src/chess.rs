//! Chess engine adapter.
//!
//! The index builder never touches move generation directly. It consumes a
//! narrow [`ChessBoard`] capability (apply a coordinate move, render the
//! position, render the game, step back) and the [`PositionExpander`] replays
//! a puzzle's move list through it.

pub mod board;
pub mod expander;
pub mod shakmaty_board;

pub use board::*;
pub use expander::*;
pub use shakmaty_board::*;
