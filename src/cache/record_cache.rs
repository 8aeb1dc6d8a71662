//! Get-or-compute access to expanded records.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};

use crate::cache::codec::{decode_record, encode_record};
use crate::cache::store::RecordStore;
use crate::chess::Expand;
use crate::error::Result;
use crate::key;
use crate::puzzle::{RawPuzzle, Record};

/// Hit/miss counters of a [`RecordCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Record cache over a [`RecordStore`].
///
/// `get_or_compute` may be called concurrently from the load workers. The
/// expander runs outside any store lock, and an entry is written only after
/// the expansion fully succeeded, so a failing record leaves the store as it
/// was.
#[derive(Debug)]
pub struct RecordCache<S: RecordStore> {
    store: Arc<S>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S: RecordStore> RecordCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        RecordCache {
            store,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Return the cached record for `raw`, expanding and storing it on a miss.
    ///
    /// An entry stored under the same key for a different identifier counts as
    /// a miss and is replaced.
    pub fn get_or_compute(&self, raw: RawPuzzle, expander: &dyn Expand) -> Result<Record> {
        let key = key::encode(&raw.id);

        if let Some(payload) = self.store.get(&key)? {
            let record = decode_record(&payload)?;
            if record.id == raw.id {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(record);
            }
            debug!("key {key} holds puzzle {}, recomputing {}", record.id, raw.id);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let expansion = expander.expand(&raw)?;
        let record = raw.into_record(expansion.fens, expansion.pgn);
        record.validate()?;

        self.store.put(&key, &encode_record(&record)?)?;
        Ok(record)
    }

    /// Delete every stored entry whose key is not in `current_keys`.
    ///
    /// Must only run once the load pass is complete.
    pub fn sweep(&self, current_keys: &HashSet<String>) -> Result<usize> {
        let existing = self.store.keys()?;
        let mut stale: Vec<String> = existing.difference(current_keys).cloned().collect();
        stale.sort();
        debug!(
            "cache sweep: {} stored, {} current, {} stale",
            existing.len(),
            current_keys.len(),
            stale.len()
        );

        let deleted = self.store.delete_many(&stale)?;
        info!("Deleted {deleted} obsolete puzzles.");
        Ok(deleted)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
