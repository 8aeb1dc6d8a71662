//! Storage abstraction layer for index files.
//!
//! Index files are written through a pluggable backend: the file system for
//! real builds and memory for tests.

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

pub use file::*;
pub use memory::*;
pub use structured::*;
pub use traits::*;
