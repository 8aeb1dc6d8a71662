//! Header and section layout of a NIF file.

use serde::Serialize;

use crate::error::{NifError, Result};
use crate::ngram::MinimizedPostings;
use crate::nif::{CRC_SIZE, HEADER_LEN, OFFSET_SIZE, TAG, VERSION};
use crate::puzzle::Record;
use crate::storage::{StorageInput, StorageOutput, StructReader, StructWriter, max_for_width};

/// Smallest byte count `b >= 1` such that `n < 256^b`.
pub fn bytes_for(n: u64) -> u8 {
    let mut width = 1;
    while width < 8 && n > max_for_width(width) {
        width += 1;
    }
    width
}

/// Per-file widths of the variable-size fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldWidths {
    /// Fixed identifier slot width.
    pub id_size: u8,
    /// Width of a record index inside n-gram payloads.
    pub id_index_size: u8,
    /// Width of an n-gram postings count.
    pub id_count_size: u8,
    /// Width of a per-record position count.
    pub position_count_size: u8,
}

impl FieldWidths {
    /// Derive the widths from the sorted records and the retained postings.
    pub fn compute(records: &[Record], postings: &MinimizedPostings) -> Result<Self> {
        let longest_id = records.iter().map(|r| r.id.len()).max().unwrap_or(0);
        if longest_id > u8::MAX as usize {
            return Err(NifError::index(format!(
                "identifier of {longest_id} bytes exceeds the 255-byte id slot"
            )));
        }
        let most_positions = records.iter().map(|r| r.fens.len()).max().unwrap_or(0);

        Ok(FieldWidths {
            id_size: (longest_id as u8).max(1),
            id_index_size: bytes_for(records.len() as u64),
            id_count_size: bytes_for(postings.max_set_len() as u64),
            position_count_size: bytes_for(most_positions as u64),
        })
    }
}

/// The fixed-size header at the start of every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u8,
    pub widths: FieldWidths,
    pub record_count: u32,
    pub ngram_size: u8,
    pub string_len: u32,
    pub crc_size: u8,
}

impl Header {
    pub fn new(
        widths: FieldWidths,
        record_count: usize,
        ngram_size: usize,
        string_len: usize,
    ) -> Result<Self> {
        let record_count = u32::try_from(record_count)
            .map_err(|_| NifError::index(format!("{record_count} records exceed the u32 count")))?;
        let ngram_size = u8::try_from(ngram_size)
            .map_err(|_| NifError::index(format!("ngram size {ngram_size} exceeds 255")))?;
        let string_len = u32::try_from(string_len).map_err(|_| {
            NifError::index(format!("string table of {string_len} bytes exceeds u32"))
        })?;

        Ok(Header {
            version: VERSION,
            widths,
            record_count,
            ngram_size,
            string_len,
            crc_size: CRC_SIZE,
        })
    }

    /// Number of n-gram slots, one per window of the string table.
    pub fn slot_count(&self) -> u64 {
        let len = self.string_len as u64;
        let k = self.ngram_size as u64;
        if k > 0 && len >= k { len - k + 1 } else { 0 }
    }

    pub fn ids_start(&self) -> u64 {
        HEADER_LEN + self.string_len as u64
    }

    pub fn ngram_slots_start(&self) -> u64 {
        self.ids_start() + self.record_count as u64 * self.widths.id_size as u64
    }

    pub fn ngram_slot_len(&self) -> u64 {
        OFFSET_SIZE + self.widths.id_count_size as u64
    }

    pub fn record_slots_start(&self) -> u64 {
        self.ngram_slots_start() + self.slot_count() * self.ngram_slot_len()
    }

    pub fn record_slot_len(&self) -> u64 {
        OFFSET_SIZE + self.widths.position_count_size as u64
    }

    /// Absolute offset of the first payload byte.
    pub fn payload_start(&self) -> u64 {
        self.record_slots_start() + self.record_count as u64 * self.record_slot_len()
    }

    pub fn write_to<W: StorageOutput>(&self, writer: &mut StructWriter<W>) -> Result<()> {
        writer.write_raw(TAG)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.widths.id_size)?;
        writer.write_u8(self.widths.id_index_size)?;
        writer.write_u8(self.widths.id_count_size)?;
        writer.write_u8(self.widths.position_count_size)?;
        writer.write_u32(self.record_count)?;
        writer.write_u8(self.ngram_size)?;
        writer.write_u32(self.string_len)?;
        writer.write_u8(self.crc_size)?;
        Ok(())
    }

    pub fn read_from<R: StorageInput>(reader: &mut StructReader<R>) -> Result<Self> {
        let tag = reader.read_raw(TAG.len())?;
        if tag != TAG {
            return Err(NifError::index("missing NIF tag"));
        }
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(NifError::index(format!(
                "unsupported NIF version {version}, expected {VERSION}"
            )));
        }

        let widths = FieldWidths {
            id_size: reader.read_u8()?,
            id_index_size: reader.read_u8()?,
            id_count_size: reader.read_u8()?,
            position_count_size: reader.read_u8()?,
        };
        let header = Header {
            version,
            widths,
            record_count: reader.read_u32()?,
            ngram_size: reader.read_u8()?,
            string_len: reader.read_u32()?,
            crc_size: reader.read_u8()?,
        };

        let FieldWidths {
            id_size,
            id_index_size,
            id_count_size,
            position_count_size,
        } = widths;
        if id_size == 0
            || [id_index_size, id_count_size, position_count_size]
                .iter()
                .any(|w| !(1..=8).contains(w))
        {
            return Err(NifError::index(format!("invalid field widths {widths:?}")));
        }
        if header.crc_size != CRC_SIZE {
            return Err(NifError::index(format!(
                "unsupported checksum width {}",
                header.crc_size
            )));
        }
        if header.ngram_size == 0 {
            return Err(NifError::index("ngram size of zero"));
        }
        Ok(header)
    }
}

/// Absolute positions of every section, computed before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    pub header: Header,
    pub ngram_payload_start: u64,
    pub record_payload_start: u64,
    pub file_len: u64,
}

impl LayoutPlan {
    /// Plan a file from its header and the total payload entry counts.
    pub fn new(header: Header, retained_postings: u64, total_positions: u64) -> Result<Self> {
        let ngram_payload_start = header.payload_start();
        let record_payload_start =
            ngram_payload_start + retained_postings * header.widths.id_index_size as u64;
        let file_len = record_payload_start + total_positions * header.crc_size as u64;

        if file_len > u32::MAX as u64 {
            return Err(NifError::index(format!(
                "index of {file_len} bytes does not fit u32 offsets"
            )));
        }

        Ok(LayoutPlan {
            header,
            ngram_payload_start,
            record_payload_start,
            file_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widths() -> FieldWidths {
        FieldWidths {
            id_size: 5,
            id_index_size: 1,
            id_count_size: 1,
            position_count_size: 1,
        }
    }

    #[test]
    fn test_bytes_for() {
        assert_eq!(bytes_for(0), 1);
        assert_eq!(bytes_for(1), 1);
        assert_eq!(bytes_for(255), 1);
        assert_eq!(bytes_for(256), 2);
        assert_eq!(bytes_for(65_535), 2);
        assert_eq!(bytes_for(65_536), 3);
        assert_eq!(bytes_for(4_000_000), 3);
        assert_eq!(bytes_for(u64::MAX), 8);
    }

    #[test]
    fn test_section_offsets() {
        let header = Header::new(widths(), 2, 3, 10).unwrap();
        assert_eq!(HEADER_LEN, 18);
        assert_eq!(header.slot_count(), 8);
        assert_eq!(header.ids_start(), 28);
        assert_eq!(header.ngram_slots_start(), 38);
        assert_eq!(header.record_slots_start(), 38 + 8 * 5);
        assert_eq!(header.payload_start(), 78 + 2 * 5);

        let plan = LayoutPlan::new(header, 4, 6).unwrap();
        assert_eq!(plan.ngram_payload_start, 88);
        assert_eq!(plan.record_payload_start, 92);
        assert_eq!(plan.file_len, 92 + 18);
    }

    #[test]
    fn test_short_string_table_has_no_slots() {
        let header = Header::new(widths(), 0, 3, 2).unwrap();
        assert_eq!(header.slot_count(), 0);
    }

    #[test]
    fn test_oversized_values_are_rejected() {
        assert!(Header::new(widths(), 1, 256, 10).is_err());
        let header = Header::new(widths(), 1, 3, 10).unwrap();
        assert!(LayoutPlan::new(header, u32::MAX as u64, 1).is_err());
    }
}
