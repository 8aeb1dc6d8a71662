//! Reading and querying NIF files.

use std::path::Path;

use serde::Serialize;

use crate::error::{NifError, Result};
use crate::ngram::{NgramMap, RecordIndex};
use crate::nif::crc::prefix_crc;
use crate::nif::layout::Header;
use crate::puzzle::fen_prefix;
use crate::storage::{
    FileStorage, Storage, StorageConfig, StorageInput, StructReader, decode_uint,
};

/// Offset and entry count of one postings or checksum list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub offset: u32,
    pub count: u64,
}

/// Summary of a parsed index file.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub header: Header,
    pub file_size: u64,
    pub slot_count: u64,
    pub retained_ngrams: usize,
    pub total_postings: u64,
    pub total_positions: u64,
}

/// A NIF file parsed into memory.
#[derive(Debug)]
pub struct NifIndex {
    header: Header,
    string_table: Vec<u8>,
    ids: Vec<String>,
    ngram_slots: Vec<Slot>,
    record_slots: Vec<Slot>,
    payload_start: u64,
    payload: Vec<u8>,
    /// Slot of every n-gram that carries postings.
    retained: NgramMap<usize>,
}

impl NifIndex {
    /// Open the index file at `path`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (storage, name) = FileStorage::for_file(path, StorageConfig::default())?;
        Self::open(&storage, &name)
    }

    /// Open the file `name` of `storage`.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        Self::from_input(storage.open_input(name)?)
    }

    /// Parse a whole file from `input`.
    pub fn from_input<R: StorageInput>(input: R) -> Result<Self> {
        let mut reader = StructReader::new(input)?;
        let header = Header::read_from(&mut reader)?;
        let widths = header.widths;
        if header.payload_start() > reader.size() {
            return Err(NifError::index(format!(
                "header describes {} bytes of tables, file has {}",
                header.payload_start(),
                reader.size()
            )));
        }

        let string_table = reader.read_raw(header.string_len as usize)?;

        let mut ids = Vec::with_capacity(header.record_count as usize);
        for _ in 0..header.record_count {
            let raw = reader.read_raw(widths.id_size as usize)?;
            let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            let id = String::from_utf8(raw[..end].to_vec())
                .map_err(|e| NifError::index(format!("identifier is not UTF-8: {e}")))?;
            ids.push(id);
        }

        let slot_count = header.slot_count() as usize;
        let mut ngram_slots = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            ngram_slots.push(Slot {
                offset: reader.read_u32()?,
                count: reader.read_uint(widths.id_count_size)?,
            });
        }

        let mut record_slots = Vec::with_capacity(header.record_count as usize);
        for _ in 0..header.record_count {
            record_slots.push(Slot {
                offset: reader.read_u32()?,
                count: reader.read_uint(widths.position_count_size)?,
            });
        }

        let payload_start = reader.position();
        if payload_start != header.payload_start() {
            return Err(NifError::index(format!(
                "payload found at {payload_start}, header implies {}",
                header.payload_start()
            )));
        }
        let payload = reader.read_remaining()?;

        let k = header.ngram_size as usize;
        let mut retained = NgramMap::default();
        for (slot, entry) in ngram_slots.iter().enumerate() {
            if entry.count > 0 {
                retained
                    .entry(string_table[slot..slot + k].into())
                    .or_insert(slot);
            }
        }

        Ok(NifIndex {
            header,
            string_table,
            ids,
            ngram_slots,
            record_slots,
            payload_start,
            payload,
            retained,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn string_table(&self) -> &[u8] {
        &self.string_table
    }

    /// Identifiers in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn ngram_slots(&self) -> &[Slot] {
        &self.ngram_slots
    }

    pub fn record_slots(&self) -> &[Slot] {
        &self.record_slots
    }

    /// The n-gram described by `slot`.
    pub fn slot_ngram(&self, slot: usize) -> Option<&[u8]> {
        let k = self.header.ngram_size as usize;
        self.string_table.get(slot..slot + k)
    }

    /// Bytes of a payload list of `count` entries of `width` bytes.
    fn payload_entries(&self, slot: Slot, width: u8) -> Result<impl Iterator<Item = u64> + '_> {
        let start = (slot.offset as u64)
            .checked_sub(self.payload_start)
            .ok_or_else(|| NifError::index(format!("offset {} points before the payload", slot.offset)))?
            as usize;
        let end = usize::try_from(slot.count)
            .ok()
            .and_then(|count| count.checked_mul(width as usize))
            .and_then(|len| len.checked_add(start))
            .ok_or_else(|| {
                NifError::index(format!(
                    "payload list at {} with {} entries overflows",
                    slot.offset, slot.count
                ))
            })?;
        let bytes = self.payload.get(start..end).ok_or_else(|| {
            NifError::index(format!(
                "payload list at {} with {} entries runs past the end of the file",
                slot.offset, slot.count
            ))
        })?;
        Ok(bytes.chunks(width as usize).map(decode_uint))
    }

    /// Record indices stored for n-gram `slot`.
    pub fn slot_postings(&self, slot: usize) -> Result<Vec<RecordIndex>> {
        let entry = *self
            .ngram_slots
            .get(slot)
            .ok_or_else(|| NifError::invalid_argument(format!("no n-gram slot {slot}")))?;
        Ok(self
            .payload_entries(entry, self.header.widths.id_index_size)?
            .map(|index| index as RecordIndex)
            .collect())
    }

    /// Postings of `gram`, if the n-gram was retained.
    pub fn postings_for(&self, gram: &[u8]) -> Result<Option<Vec<RecordIndex>>> {
        match self.retained.get(gram) {
            Some(&slot) => self.slot_postings(slot).map(Some),
            None => Ok(None),
        }
    }

    /// CRC-24 of every position of `record`, in position order.
    pub fn record_crcs(&self, record: usize) -> Result<Vec<u32>> {
        let entry = *self
            .record_slots
            .get(record)
            .ok_or_else(|| NifError::invalid_argument(format!("no record {record}")))?;
        Ok(self
            .payload_entries(entry, self.header.crc_size)?
            .map(|crc| crc as u32)
            .collect())
    }

    /// Records whose positions may match `query`, a FEN prefix.
    ///
    /// Postings of every retained window of the query are intersected. When
    /// the query is a complete board-and-side prefix, candidates are further
    /// narrowed to records owning a position with the same checksum. Queries
    /// shorter than the n-gram size, or without any retained window, match
    /// nothing.
    pub fn query(&self, query: &str) -> Result<Vec<RecordIndex>> {
        let k = self.header.ngram_size as usize;
        let bytes = query.as_bytes();
        if bytes.len() < k {
            return Ok(Vec::new());
        }

        let mut candidates: Option<Vec<RecordIndex>> = None;
        for gram in bytes.windows(k) {
            let Some(postings) = self.postings_for(gram)? else {
                continue;
            };
            candidates = Some(match candidates {
                None => postings,
                Some(current) => intersect(&current, &postings),
            });
            if candidates.as_ref().is_some_and(Vec::is_empty) {
                break;
            }
        }
        let mut candidates = candidates.unwrap_or_default();

        if is_full_prefix(query) {
            let wanted = prefix_crc(query);
            let mut verified = Vec::with_capacity(candidates.len());
            for record in candidates {
                if self.record_crcs(record as usize)?.contains(&wanted) {
                    verified.push(record);
                }
            }
            candidates = verified;
        }
        Ok(candidates)
    }

    /// Identifiers of the records matching `query`.
    pub fn query_ids(&self, query: &str) -> Result<Vec<&str>> {
        Ok(self
            .query(query)?
            .into_iter()
            .filter_map(|record| self.ids.get(record as usize).map(String::as_str))
            .collect())
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            header: self.header,
            file_size: self.payload_start + self.payload.len() as u64,
            slot_count: self.ngram_slots.len() as u64,
            retained_ngrams: self.retained.len(),
            total_postings: self.ngram_slots.iter().map(|s| s.count).sum(),
            total_positions: self.record_slots.iter().map(|s| s.count).sum(),
        }
    }
}

/// Whether `query` is exactly a board-and-side prefix.
fn is_full_prefix(query: &str) -> bool {
    query.split(' ').count() == 2 && fen_prefix(query) == query
}

/// Intersection of two ascending lists.
fn intersect(a: &[RecordIndex], b: &[RecordIndex]) -> Vec<RecordIndex> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
