//! CRC-24 of position prefixes.

/// CRC-24 generator polynomial.
pub const CRC24_POLY: u32 = 0x864CFB;

const CRC24_INIT: u32 = 0xFF_FFFF;

/// Compute the 24-bit checksum of `data`.
///
/// The register starts at all ones, consumes each byte least significant bit
/// first, and is inverted at the end.
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC24_POLY
            } else {
                crc >> 1
            };
        }
    }
    (crc ^ CRC24_INIT) & 0xFF_FFFF
}

/// Checksum of a 2-field FEN prefix.
pub fn prefix_crc(prefix: &str) -> u32 {
    crc24(prefix.as_bytes())
}
