//! Command line interface of the puzzlenif binary.

pub mod args;
pub mod commands;
pub mod output;

pub use args::*;
pub use commands::*;
pub use output::*;
