//! # puzzlenif
//!
//! Builds a compact n-gram index (NIF) over every position reachable in a
//! chess puzzle corpus.
//!
//! ## Features
//!
//! - Parallel CSV loading with a persistent record cache
//! - Overlap-compressed n-gram string table
//! - Greedy minimization of the n-gram postings
//! - Self-describing binary index with per-position checksums
//! - Conditional download of the upstream puzzle dump

pub mod cache;
pub mod chess;
pub mod cli;
pub mod config;
pub mod error;
pub mod key;
pub mod ngram;
pub mod nif;
pub mod pipeline;
pub mod puzzle;
pub mod refresh;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
