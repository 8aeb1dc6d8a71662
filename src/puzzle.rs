//! Puzzle records and CSV row parsing.
//!
//! A source row looks like:
//!
//! ```csv
//! PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags
//! 00sHx,q3k1nr/1pp1nQpp/3p4/1P2p3/4P3/B1PP1b2/B5PP/5K2 b k - 0 17,e8d7 a2e6 d7d8 f7f8,1760,80,83,72,mate mateIn2,https://lichess.org/yyznGmXs/black#34,Italian_Game
//! ```
//!
//! Rows are first parsed into a [`RawPuzzle`], which only holds what the file
//! says. Expanding the move list into reachable positions turns it into a
//! [`Record`].

pub mod reader;

use serde::{Deserialize, Serialize};

use crate::error::{NifError, Result};

/// Minimum number of fields of a source row. The tenth (opening tags) is optional.
pub const MIN_FIELDS: usize = 9;

/// A puzzle row as read from the source file, before move expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPuzzle {
    /// 1-based line number in the source file, for error reporting.
    pub line: usize,
    pub id: String,
    pub fen: String,
    pub moves: Vec<String>,
    pub rating: i32,
    pub rating_deviation: i32,
    pub popularity: i32,
    pub plays: i32,
    pub themes: Vec<String>,
    pub game_url: String,
    pub opening_tags: Vec<String>,
}

impl RawPuzzle {
    /// Parse a row from its already split fields.
    pub fn from_fields<'a, I>(line: usize, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields: Vec<&str> = fields.into_iter().collect();
        if fields.len() < MIN_FIELDS {
            return Err(NifError::record_parse(
                line,
                format!(
                    "expected at least {MIN_FIELDS} fields, found {}",
                    fields.len()
                ),
            ));
        }

        let id = fields[0].trim();
        if id.is_empty() {
            return Err(NifError::record_parse(line, "empty puzzle id"));
        }

        let fen = fields[1].trim();
        if fen.is_empty() {
            return Err(NifError::record_parse(line, "empty FEN"));
        }

        Ok(RawPuzzle {
            line,
            id: id.to_string(),
            fen: fen.to_string(),
            moves: split_words(fields[2]),
            rating: parse_int(line, "rating", fields[3])?,
            rating_deviation: parse_int(line, "rating deviation", fields[4])?,
            popularity: parse_int(line, "popularity", fields[5])?,
            plays: parse_int(line, "play count", fields[6])?,
            themes: split_words(fields[7]),
            game_url: fields[8].trim().to_string(),
            opening_tags: fields.get(9).map(|f| split_words(f)).unwrap_or_default(),
        })
    }

    /// Parse a raw comma separated line.
    pub fn parse_line(line: usize, text: &str) -> Result<Self> {
        Self::from_fields(line, text.split(','))
    }

    /// Attach the expanded positions and transcript to this row.
    pub fn into_record(self, fens: Vec<String>, pgn: String) -> Record {
        Record {
            id: self.id,
            fens,
            moves: self.moves,
            rating: self.rating,
            rating_deviation: self.rating_deviation,
            popularity: self.popularity,
            plays: self.plays,
            themes: self.themes,
            game_url: self.game_url,
            opening_tags: self.opening_tags,
            pgn,
        }
    }
}

/// A fully expanded puzzle.
///
/// `fens[0]` is the starting position and `fens[i + 1]` is the position after
/// `moves[i]`, so `fens.len() == moves.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fens: Vec<String>,
    pub moves: Vec<String>,
    pub rating: i32,
    pub rating_deviation: i32,
    pub popularity: i32,
    pub plays: i32,
    pub themes: Vec<String>,
    pub game_url: String,
    pub opening_tags: Vec<String>,
    pub pgn: String,
}

impl Record {
    /// Iterate over the 2-field prefixes (board and side to move) of every position.
    pub fn fen_prefixes(&self) -> impl Iterator<Item = &str> + '_ {
        self.fens.iter().map(|fen| fen_prefix(fen))
    }

    /// Check the positions/moves length invariant.
    pub fn validate(&self) -> Result<()> {
        if self.fens.len() != self.moves.len() + 1 {
            return Err(NifError::move_application(
                &self.id,
                format!(
                    "{} positions for {} moves",
                    self.fens.len(),
                    self.moves.len()
                ),
            ));
        }
        Ok(())
    }
}

/// The board layout and side-to-move fields of a FEN.
///
/// ```
/// use puzzlenif::puzzle::fen_prefix;
///
/// let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
/// assert_eq!(fen_prefix(fen), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b");
/// ```
pub fn fen_prefix(fen: &str) -> &str {
    let fen = fen.trim();
    let mut spaces = fen.match_indices(' ');
    match spaces.nth(1) {
        Some((end, _)) => &fen[..end],
        None => fen,
    }
}

fn split_words(field: &str) -> Vec<String> {
    field.split_whitespace().map(str::to_string).collect()
}

fn parse_int(line: usize, name: &str, value: &str) -> Result<i32> {
    value.trim().parse::<i32>().map_err(|e| {
        NifError::record_parse(line, format!("invalid {name} '{}': {e}", value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "00sHx,q3k1nr/1pp1nQpp/3p4/1P2p3/4P3/B1PP1b2/B5PP/5K2 b k - 0 17,e8d7 a2e6 d7d8 f7f8,1760,80,83,72,mate mateIn2 middlegame short,https://lichess.org/yyznGmXs/black#34,Italian_Game Italian_Game_Classical_Variation";

    #[test]
    fn test_parse_full_row() {
        let raw = RawPuzzle::parse_line(2, ROW).unwrap();
        assert_eq!(raw.id, "00sHx");
        assert_eq!(raw.moves, vec!["e8d7", "a2e6", "d7d8", "f7f8"]);
        assert_eq!(raw.rating, 1760);
        assert_eq!(raw.rating_deviation, 80);
        assert_eq!(raw.popularity, 83);
        assert_eq!(raw.plays, 72);
        assert_eq!(raw.themes.len(), 4);
        assert_eq!(raw.game_url, "https://lichess.org/yyznGmXs/black#34");
        assert_eq!(
            raw.opening_tags,
            vec!["Italian_Game", "Italian_Game_Classical_Variation"]
        );
    }

    #[test]
    fn test_parse_row_without_opening_tags() {
        let row = "000aY,r1bqk2r/pp1nbNp1/2p1p2p/8/2BP4/1PN3P1/P3QP1P/3R1RK1 b kq - 0 19,e8f7 e2e6 f7f8 e6f7,1530,76,95,1097,mate mateIn2 middlegame short,https://lichess.org/iQqpVhH8#37";
        let raw = RawPuzzle::parse_line(3, row).unwrap();
        assert_eq!(raw.id, "000aY");
        assert!(raw.opening_tags.is_empty());
    }

    #[test]
    fn test_parse_short_row_fails() {
        let err = RawPuzzle::parse_line(7, "abc,fen,e2e4,1500").unwrap_err();
        match err {
            NifError::RecordParse { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_numeric_rating_fails() {
        let row = "abc,8/8/8/8/8/8/8/K6k w - - 0 1,a1a2,high,80,83,72,mate,url";
        let err = RawPuzzle::parse_line(4, row).unwrap_err();
        assert!(err.is_record_error());
        assert!(err.to_string().contains("rating"));
    }

    #[test]
    fn test_fen_prefix() {
        assert_eq!(
            fen_prefix("8/8/8/8/8/8/8/K6k w - - 0 1"),
            "8/8/8/8/8/8/8/K6k w"
        );
        assert_eq!(fen_prefix("8/8/8/8/8/8/8/K6k w"), "8/8/8/8/8/8/8/K6k w");
        assert_eq!(fen_prefix("8/8/8/8/8/8/8/K6k"), "8/8/8/8/8/8/8/K6k");
    }

    #[test]
    fn test_record_invariant() {
        let raw = RawPuzzle::parse_line(2, ROW).unwrap();
        let record = raw.into_record(vec!["a w".to_string()], String::new());
        assert!(record.validate().is_err());
    }
}
