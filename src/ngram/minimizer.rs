//! Postings minimization.
//!
//! Most n-grams of FEN prefixes are shared by a large share of all records,
//! which makes their postings both big and useless for narrowing a lookup.
//! The minimizer keeps the most selective n-grams until every indexed record
//! is reachable through at least one of them, then drops the rest.

use std::cmp::Ordering;

use bit_vec::BitVec;
use log::debug;

use crate::ngram::RecordIndex;
use crate::ngram::builder::NgramMap;

/// Postings that survived minimization.
#[derive(Debug, Default)]
pub struct MinimizedPostings {
    retained: NgramMap<Vec<RecordIndex>>,
    considered: usize,
    covered: usize,
}

impl MinimizedPostings {
    /// Sorted, deduplicated record indices for `gram`, if it was retained.
    pub fn get(&self, gram: &[u8]) -> Option<&[RecordIndex]> {
        self.retained.get(gram).map(Vec::as_slice)
    }

    pub fn contains(&self, gram: &[u8]) -> bool {
        self.retained.contains_key(gram)
    }

    /// Number of retained n-grams.
    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    /// Number of n-grams that entered minimization.
    pub fn considered(&self) -> usize {
        self.considered
    }

    /// Number of distinct records reachable through the retained n-grams.
    pub fn covered(&self) -> usize {
        self.covered
    }

    /// Size of the largest retained set.
    pub fn max_set_len(&self) -> usize {
        self.retained.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[RecordIndex])> {
        self.retained
            .iter()
            .map(|(gram, records)| (gram.as_ref(), records.as_slice()))
    }
}

/// Reduce `postings` to a selective subset covering every indexed record.
///
/// Each list is deduplicated and sorted. Entries are then visited from the
/// smallest set to the largest, ties broken by byte order of the n-gram, and
/// kept one by one. The walk stops right after keeping an entry whose set is
/// larger than `total_records / divisor` once every record appearing in any
/// postings list is covered.
pub fn minimize(
    postings: NgramMap<Vec<RecordIndex>>,
    total_records: usize,
    divisor: usize,
) -> MinimizedPostings {
    let threshold = total_records / divisor.max(1);
    let considered = postings.len();

    let mut entries: Vec<(Box<[u8]>, Vec<RecordIndex>)> = postings
        .into_iter()
        .map(|(gram, mut records)| {
            records.sort_unstable();
            records.dedup();
            (gram, records)
        })
        .collect();

    let capacity = entries
        .iter()
        .filter_map(|(_, records)| records.last())
        .map(|&last| last as usize + 1)
        .max()
        .unwrap_or(0)
        .max(total_records);

    let mut universe = BitVec::from_elem(capacity, false);
    for (_, records) in &entries {
        for &record in records {
            universe.set(record as usize, true);
        }
    }
    let universe_size = universe.iter().filter(|bit| *bit).count();

    entries.sort_unstable_by(|(a_gram, a), (b_gram, b)| match a.len().cmp(&b.len()) {
        Ordering::Equal => a_gram.cmp(b_gram),
        other => other,
    });

    let mut coverage = BitVec::from_elem(capacity, false);
    let mut covered = 0;
    let mut retained = NgramMap::default();

    for (gram, records) in entries {
        for &record in &records {
            let slot = record as usize;
            if !coverage[slot] {
                coverage.set(slot, true);
                covered += 1;
            }
        }

        let set_len = records.len();
        retained.insert(gram, records);
        if set_len > threshold && covered == universe_size {
            break;
        }
    }

    debug!(
        "minimized postings: kept {} of {} n-grams, {} records covered, threshold {}",
        retained.len(),
        considered,
        covered,
        threshold
    );

    MinimizedPostings {
        retained,
        considered,
        covered,
    }
}
