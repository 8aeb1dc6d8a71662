//! Persistent record cache.
//!
//! Expanding a puzzle's moves is the expensive part of a run, so expanded
//! records are kept in a single-file store keyed by the case-folded puzzle id
//! (see [`crate::key`]). A later run only expands puzzles it has not seen,
//! and a sweep after the load pass drops entries whose puzzle disappeared
//! from the source file.

pub mod codec;
pub mod record_cache;
pub mod sqlite;
pub mod store;

pub use codec::*;
pub use record_cache::*;
pub use sqlite::*;
pub use store::*;
