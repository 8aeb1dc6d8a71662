//! The NIF binary index format.
//!
//! A NIF file holds the overlap-compressed n-gram string table, the sorted
//! puzzle identifiers, the minimized n-gram postings and a CRC-24 of every
//! reachable position prefix of every puzzle. All integers are little-endian
//! and every variable width is recorded in the header, so a reader needs
//! nothing but the file itself.

pub mod crc;
pub mod layout;
pub mod reader;
pub mod writer;

pub use crc::*;
pub use layout::*;
pub use reader::*;
pub use writer::*;

/// Format tag at the start of every file.
pub const TAG: &[u8; 3] = b"NIF";

/// Current format version.
pub const VERSION: u8 = 3;

/// Width of a position checksum in bytes.
pub const CRC_SIZE: u8 = 3;

/// Byte length of the fixed header.
pub const HEADER_LEN: u64 = 3 + 1 + 4 + 4 + 1 + 4 + 1;

/// Width of every section offset in bytes.
pub const OFFSET_SIZE: u64 = 4;
