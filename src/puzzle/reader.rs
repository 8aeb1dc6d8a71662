//! CSV reader for the puzzle source file.
//!
//! The first row is the header and is skipped. Rows may have nine or ten
//! fields, so the reader runs in flexible mode and leaves the field count
//! check to [`RawPuzzle::from_fields`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecordsIntoIter};

use crate::error::{NifError, Result};
use crate::puzzle::RawPuzzle;

/// A reader producing [`RawPuzzle`] rows from CSV input.
#[derive(Debug, Clone)]
pub struct PuzzleCsvReader {
    /// Whether the first row is a header
    has_headers: bool,
}

impl Default for PuzzleCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PuzzleCsvReader {
    /// Create a new reader with comma delimiter and a header row.
    pub fn new() -> Self {
        PuzzleCsvReader {
            has_headers: true,
        }
    }

    /// Set whether the input starts with a header row.
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    /// Open a CSV file.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<PuzzleRows<File>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            NifError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open {}: {e}", path.display()),
            ))
        })?;
        Ok(self.from_reader(file))
    }

    /// Read rows from any reader.
    pub fn from_reader<R: Read>(&self, reader: R) -> PuzzleRows<R> {
        let reader = ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .from_reader(reader);
        PuzzleRows {
            records: reader.into_records(),
        }
    }
}

/// Iterator over parsed rows.
pub struct PuzzleRows<R: Read> {
    records: StringRecordsIntoIter<R>,
}

impl<R: Read> Iterator for PuzzleRows<R> {
    type Item = Result<RawPuzzle>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(match record {
            Ok(record) => {
                let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
                RawPuzzle::from_fields(line, record.iter())
            }
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
                Err(NifError::record_parse(line, e.to_string()))
            }
        })
    }
}
