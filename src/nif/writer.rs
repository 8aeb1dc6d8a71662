//! Single-pass NIF writer.

use log::{debug, info};

use crate::error::{NifError, Result};
use crate::ngram::{MinimizedPostings, NgramTable};
use crate::nif::crc::prefix_crc;
use crate::nif::layout::{FieldWidths, Header, LayoutPlan};
use crate::puzzle::Record;
use crate::storage::{Storage, StorageOutput, StructWriter};

/// Writes one index file from a frozen n-gram table, its minimized postings
/// and the identifier-sorted records.
///
/// Postings must refer to records by their position in `records`.
pub struct NifWriter<'a> {
    table: &'a NgramTable,
    postings: &'a MinimizedPostings,
    records: &'a [Record],
}

impl<'a> NifWriter<'a> {
    pub fn new(table: &'a NgramTable, postings: &'a MinimizedPostings, records: &'a [Record]) -> Self {
        NifWriter {
            table,
            postings,
            records,
        }
    }

    /// Retained postings count carried by the slot at `offset`, zero unless
    /// the slot is the first occurrence of a retained n-gram.
    fn slot_count_at(&self, offset: usize) -> usize {
        let k = self.table.ngram_size();
        let gram = &self.table.string_table()[offset..offset + k];
        if self.table.offset_of(gram) != Some(offset) {
            return 0;
        }
        self.postings.get(gram).map_or(0, <[_]>::len)
    }

    /// Compute the field widths and every section offset.
    pub fn plan(&self) -> Result<LayoutPlan> {
        let record_count = self.records.len();
        let mut retained_postings = 0u64;
        for (gram, indices) in self.postings.iter() {
            if self.table.offset_of(gram).is_none() {
                return Err(NifError::index(format!(
                    "retained n-gram {:?} is missing from the string table",
                    String::from_utf8_lossy(gram)
                )));
            }
            if let Some(&last) = indices.last()
                && last as usize >= record_count
            {
                return Err(NifError::index(format!(
                    "posting refers to record {last} of {record_count}"
                )));
            }
            retained_postings += indices.len() as u64;
        }
        let total_positions: u64 = self.records.iter().map(|r| r.fens.len() as u64).sum();

        let widths = FieldWidths::compute(self.records, self.postings)?;
        let header = Header::new(
            widths,
            record_count,
            self.table.ngram_size(),
            self.table.string_table().len(),
        )?;
        LayoutPlan::new(header, retained_postings, total_positions)
    }

    /// Write the whole file to `output` and close it.
    pub fn write_to<W: StorageOutput>(&self, output: W) -> Result<LayoutPlan> {
        let plan = self.plan()?;
        let header = plan.header;
        let widths = header.widths;
        let slot_count = header.slot_count() as usize;
        let mut writer = StructWriter::new(output);

        header.write_to(&mut writer)?;
        writer.write_raw(self.table.string_table())?;

        debug!("writing {} puzzle ids", self.records.len());
        for record in self.records {
            writer.write_padded(record.id.as_bytes(), widths.id_size as usize, 0)?;
        }

        debug!("writing {slot_count} n-gram slots");
        let mut payload_offset = plan.ngram_payload_start;
        for slot in 0..slot_count {
            let count = self.slot_count_at(slot);
            writer.write_u32(payload_offset as u32)?;
            writer.write_uint(count as u64, widths.id_count_size)?;
            payload_offset += count as u64 * widths.id_index_size as u64;
        }

        debug!("writing {} record slots", self.records.len());
        for record in self.records {
            writer.write_u32(payload_offset as u32)?;
            writer.write_uint(record.fens.len() as u64, widths.position_count_size)?;
            payload_offset += record.fens.len() as u64 * header.crc_size as u64;
        }

        if writer.position() != plan.ngram_payload_start {
            return Err(NifError::index(format!(
                "payload starts at {} instead of the planned {}",
                writer.position(),
                plan.ngram_payload_start
            )));
        }

        let k = self.table.ngram_size();
        for slot in 0..slot_count {
            if self.slot_count_at(slot) == 0 {
                continue;
            }
            let gram = &self.table.string_table()[slot..slot + k];
            for &index in self.postings.get(gram).unwrap_or(&[]) {
                writer.write_uint(index as u64, widths.id_index_size)?;
            }
        }

        debug!("writing position checksums");
        for record in self.records {
            for prefix in record.fen_prefixes() {
                writer.write_uint(prefix_crc(prefix) as u64, header.crc_size)?;
            }
        }

        if writer.position() != plan.file_len {
            return Err(NifError::index(format!(
                "wrote {} bytes but planned {}",
                writer.position(),
                plan.file_len
            )));
        }
        writer.close()?;
        Ok(plan)
    }

    /// Write the file as `name` in `storage`, replacing any previous file only
    /// once the new one is complete.
    pub fn write(&self, storage: &dyn Storage, name: &str) -> Result<LayoutPlan> {
        let (temp_name, output) = storage.create_temp_output(name)?;
        let plan = match self.write_to(output) {
            Ok(plan) => plan,
            Err(e) => {
                let _ = storage.delete_file(&temp_name);
                return Err(e);
            }
        };
        storage.rename_file(&temp_name, name)?;
        info!(
            "Created {name}: {} records, {} bytes",
            plan.header.record_count, plan.file_len
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::{NgramTableBuilder, minimize};
    use crate::nif::HEADER_LEN;
    use crate::storage::MemoryStorage;
    use crate::storage::decode_uint;

    fn record(id: &str, fens: &[&str]) -> Record {
        Record {
            id: id.to_string(),
            fens: fens.iter().map(|f| f.to_string()).collect(),
            moves: vec!["a1a2".to_string(); fens.len() - 1],
            rating: 1500,
            rating_deviation: 80,
            popularity: 90,
            plays: 10,
            themes: Vec::new(),
            game_url: String::new(),
            opening_tags: Vec::new(),
            pgn: String::new(),
        }
    }

    fn build(records: &[Record]) -> (NgramTable, MinimizedPostings) {
        let mut builder = NgramTableBuilder::new(3);
        for (i, record) in records.iter().enumerate() {
            builder.add_record(i as u32, record.fen_prefixes());
        }
        let table = builder.finish();
        let postings = minimize(table.postings().clone(), records.len(), 100);
        (table, postings)
    }

    #[test]
    fn test_written_bytes_follow_the_plan() {
        let records = vec![
            record("a", &["abcd w - - 0 1", "bcdx b - - 0 1"]),
            record("bb", &["xyz w - - 0 1"]),
        ];
        let (table, postings) = build(&records);
        let storage = MemoryStorage::new();

        let plan = NifWriter::new(&table, &postings, &records)
            .write(&storage, "test.nif")
            .unwrap();
        let bytes = storage.read_all("test.nif").unwrap();
        assert_eq!(bytes.len() as u64, plan.file_len);

        assert_eq!(&bytes[..4], b"NIF\x03");
        assert_eq!(bytes[4], 2); // id_size
        assert_eq!(bytes[5], 1); // id_index_size
        assert_eq!(decode_uint(&bytes[8..12]), 2);
        assert_eq!(bytes[12], 3);
        let string_len = decode_uint(&bytes[13..17]) as usize;
        assert_eq!(bytes[17], 3);

        let table_start = HEADER_LEN as usize;
        assert_eq!(&bytes[table_start..table_start + string_len], table.string_table());
        let ids = &bytes[table_start + string_len..table_start + string_len + 4];
        assert_eq!(ids, b"a\0bb");

        // checksums close the file, one per position, in record order
        let crcs = &bytes[bytes.len() - 9..];
        let expected: Vec<u64> = records
            .iter()
            .flat_map(|r| r.fen_prefixes())
            .map(|p| prefix_crc(p) as u64)
            .collect();
        let actual: Vec<u64> = crcs.chunks(3).map(decode_uint).collect();
        assert_eq!(actual, expected);
        assert!(!storage.file_exists("test.nif_0.tmp"));
    }

    #[test]
    fn test_empty_index() {
        let records: Vec<Record> = Vec::new();
        let (table, postings) = build(&records);
        let storage = MemoryStorage::new();
        let plan = NifWriter::new(&table, &postings, &records)
            .write(&storage, "empty.nif")
            .unwrap();
        assert_eq!(plan.file_len, HEADER_LEN);
        assert_eq!(storage.file_size("empty.nif").unwrap(), HEADER_LEN);
    }

    #[test]
    fn test_postings_out_of_range_are_rejected() {
        let records = vec![record("a", &["abcd w - - 0 1"])];
        let (table, postings) = build(&records);
        // postings built for one record but only an empty record list passed
        let err = NifWriter::new(&table, &postings, &[]).plan().unwrap_err();
        assert!(matches!(err, NifError::Index(_)));
    }
}
