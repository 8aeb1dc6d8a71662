//! Overlap-compressed n-gram string table builder.
//!
//! The builder walks every window of every FEN prefix. A window already in the
//! table only gains a posting. A new window is appended to the table, reusing
//! the longest tail of the table that is also a prefix of the window. Because
//! the appended characters can complete other windows along the way, every
//! window ending in the newly appended region is registered too.
//!
//! The table is built strictly sequentially: each append depends on the
//! current tail of the buffer.

use ahash::AHashMap;

use crate::ngram::RecordIndex;

/// Map from an n-gram to a value.
pub type NgramMap<V> = AHashMap<Box<[u8]>, V>;

/// Incremental string table and postings builder.
#[derive(Debug)]
pub struct NgramTableBuilder {
    ngram_size: usize,
    buffer: Vec<u8>,
    /// First offset of every window of `buffer`.
    offsets: NgramMap<usize>,
    /// Records containing each window, in insertion order, duplicates included.
    postings: NgramMap<Vec<RecordIndex>>,
}

impl NgramTableBuilder {
    pub fn new(ngram_size: usize) -> Self {
        assert!(ngram_size > 0, "ngram size must be positive");
        NgramTableBuilder {
            ngram_size,
            buffer: Vec::new(),
            offsets: NgramMap::default(),
            postings: NgramMap::default(),
        }
    }

    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }

    /// Index every window of one position prefix for `record`.
    ///
    /// Prefixes shorter than the n-gram size contribute nothing.
    pub fn add_prefix(&mut self, record: RecordIndex, prefix: &str) {
        let bytes = prefix.as_bytes();
        if bytes.len() < self.ngram_size {
            return;
        }

        for gram in bytes.windows(self.ngram_size) {
            if !self.offsets.contains_key(gram) {
                self.append(gram);
            }
            match self.postings.get_mut(gram) {
                Some(list) => list.push(record),
                None => {
                    self.postings.insert(gram.into(), vec![record]);
                }
            }
        }
    }

    /// Index every prefix of a record.
    pub fn add_record<'a, I>(&mut self, record: RecordIndex, prefixes: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for prefix in prefixes {
            self.add_prefix(record, prefix);
        }
    }

    /// Append `gram` to the buffer, overlapping it with the buffer's tail.
    fn append(&mut self, gram: &[u8]) {
        let k = self.ngram_size;

        let mut overlap = k - 1;
        while overlap > 0 {
            if self.buffer.len() >= overlap && self.buffer[self.buffer.len() - overlap..] == gram[..overlap] {
                break;
            }
            overlap -= 1;
        }

        // Windows ending in the appended bytes start after this position.
        let before = self.buffer.len() as isize - k as isize;
        self.buffer.extend_from_slice(&gram[overlap..]);

        for step in 1..=(k - overlap) as isize {
            let start = before + step;
            if start < 0 {
                continue;
            }
            let start = start as usize;
            let window = &self.buffer[start..start + k];
            if !self.offsets.contains_key(window) {
                self.offsets.insert(window.into(), start);
            }
        }
    }

    /// Freeze the table.
    pub fn finish(self) -> NgramTable {
        NgramTable {
            ngram_size: self.ngram_size,
            string_table: self.buffer,
            offsets: self.offsets,
            postings: self.postings,
        }
    }
}

/// A frozen string table with its raw postings.
#[derive(Debug)]
pub struct NgramTable {
    ngram_size: usize,
    string_table: Vec<u8>,
    offsets: NgramMap<usize>,
    postings: NgramMap<Vec<RecordIndex>>,
}

impl NgramTable {
    pub fn ngram_size(&self) -> usize {
        self.ngram_size
    }

    /// The overlap-compressed buffer.
    pub fn string_table(&self) -> &[u8] {
        &self.string_table
    }

    /// Offset of the first occurrence of `gram` in the string table.
    pub fn offset_of(&self, gram: &[u8]) -> Option<usize> {
        self.offsets.get(gram).copied()
    }

    /// Number of window positions in the string table.
    pub fn slot_count(&self) -> usize {
        slot_count(self.string_table.len(), self.ngram_size)
    }

    /// Number of distinct n-grams that received postings.
    pub fn distinct_ngrams(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self) -> &NgramMap<Vec<RecordIndex>> {
        &self.postings
    }

    /// Move the postings out, leaving the string table and offsets in place.
    pub fn take_postings(&mut self) -> NgramMap<Vec<RecordIndex>> {
        std::mem::take(&mut self.postings)
    }
}

/// Number of `ngram_size` windows in a buffer of `len` bytes.
pub fn slot_count(len: usize, ngram_size: usize) -> usize {
    if len >= ngram_size {
        len - ngram_size + 1
    } else {
        0
    }
}
