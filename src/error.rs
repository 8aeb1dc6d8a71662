//! Error types for puzzlenif.
//!
//! All fallible operations in the crate return [`Result`], whose error side is
//! the [`NifError`] enum. Variants map onto the failure classes of the build
//! pipeline: unreadable input rows, illegal move lists, record store failures
//! and violations of the index layout.
//!
//! # Examples
//!
//! ```
//! use puzzlenif::error::{NifError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(NifError::invalid_argument("ngram size must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for puzzlenif operations.
#[derive(Error, Debug)]
pub enum NifError {
    /// I/O errors (file operations, network streams, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A CSV row could not be turned into a puzzle.
    #[error("Record parse error on line {line}: {message}")]
    RecordParse { line: usize, message: String },

    /// A move of a puzzle's move list is illegal in the position it is applied to.
    #[error("Move application error in puzzle {id}: {message}")]
    MoveApplication { id: String, message: String },

    /// Record store errors (open, read, write, sweep)
    #[error("Store error: {0}")]
    Store(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Index layout or format errors
    #[error("Index error: {0}")]
    Index(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Download / freshness check errors
    #[error("Download error: {0}")]
    Download(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Thread pool errors
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// SQLite errors raised by the record store
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for operations that may fail with NifError.
pub type Result<T> = std::result::Result<T, NifError>;

impl NifError {
    /// Create a new record parse error.
    pub fn record_parse<S: Into<String>>(line: usize, msg: S) -> Self {
        NifError::RecordParse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new move application error.
    pub fn move_application<I: Into<String>, S: Into<String>>(id: I, msg: S) -> Self {
        NifError::MoveApplication {
            id: id.into(),
            message: msg.into(),
        }
    }

    /// Create a new store error.
    pub fn store<S: Into<String>>(msg: S) -> Self {
        NifError::Store(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        NifError::Storage(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        NifError::Index(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        NifError::Serialization(msg.into())
    }

    /// Create a new download error.
    pub fn download<S: Into<String>>(msg: S) -> Self {
        NifError::Download(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        NifError::InvalidArgument(msg.into())
    }

    /// Whether this error only invalidates a single record.
    ///
    /// Record-level failures may be skipped under [`crate::config::ErrorPolicy::Skip`];
    /// everything else aborts the run.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            NifError::RecordParse { .. } | NifError::MoveApplication { .. }
        )
    }
}

impl From<bincode::Error> for NifError {
    fn from(err: bincode::Error) -> Self {
        NifError::Serialization(err.to_string())
    }
}
