//! N-gram string table and postings.
//!
//! Every fixed-length window of every indexed FEN prefix is stored exactly once
//! in a shared overlap-compressed buffer (the string table). The postings map
//! each window to the records containing it, and the minimizer then keeps
//! only as many windows as needed to reach every record.

pub mod builder;
pub mod minimizer;

pub use builder::*;
pub use minimizer::*;

/// Record ordinal in the sorted identifier table.
pub type RecordIndex = u32;
