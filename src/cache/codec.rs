//! Compressed binary encoding of cached records.

use crate::error::{NifError, Result};
use crate::puzzle::Record;

/// zstd level used for cache payloads.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Serialize and compress a record.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let bytes = bincode::serialize(record)?;
    zstd::encode_all(bytes.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| NifError::serialization(format!("failed to compress record: {e}")))
}

/// Decompress and deserialize a record.
pub fn decode_record(payload: &[u8]) -> Result<Record> {
    let bytes = zstd::decode_all(payload)
        .map_err(|e| NifError::serialization(format!("failed to decompress record: {e}")))?;
    let record: Record = bincode::deserialize(&bytes)?;
    record.validate()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            id: "00sHx".to_string(),
            fens: vec![
                "8/8/8/8/8/8/8/K6k w - - 0 1".to_string(),
                "8/8/8/8/8/8/K7/7k b - - 1 1".to_string(),
            ],
            moves: vec!["a1a2".to_string()],
            rating: 1760,
            rating_deviation: 80,
            popularity: 83,
            plays: 72,
            themes: vec!["endgame".to_string()],
            game_url: "https://lichess.org/yyznGmXs".to_string(),
            opening_tags: Vec::new(),
            pgn: "1. Ka2 *".to_string(),
        }
    }

    #[test]
    fn test_encode_decode() {
        let record = sample();
        let payload = encode_record(&record).unwrap();
        assert_eq!(decode_record(&payload).unwrap(), record);
    }

    #[test]
    fn test_corrupt_payload_is_an_error() {
        assert!(decode_record(b"definitely not zstd").is_err());
    }
}
