//! Build orchestration: load, index, minimize, write.
//!
//! The load pass runs on a bounded worker pool; completion order is not
//! preserved, so records are re-sorted by encoded identifier before anything
//! else touches them. The n-gram and minimization stages are sequential.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::cache::{CacheStats, RecordCache, RecordStore, SqliteRecordStore};
use crate::chess::{Expand, PositionExpander};
use crate::config::{BuildConfig, ErrorPolicy};
use crate::error::{NifError, Result};
use crate::key;
use crate::ngram::{NgramTable, NgramTableBuilder, RecordIndex, minimize};
use crate::nif::NifWriter;
use crate::puzzle::reader::PuzzleCsvReader;
use crate::puzzle::{RawPuzzle, Record};
use crate::storage::{FileStorage, Storage, StorageConfig};

/// Result of the load pass.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Records sorted by encoded identifier, unique by identifier.
    pub records: Vec<Record>,
    pub skipped: usize,
    pub duplicates: usize,
    pub evicted: usize,
    pub cache: CacheStats,
}

/// Statistics of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub records: usize,
    pub skipped_records: usize,
    pub duplicate_records: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub evicted: usize,
    pub distinct_ngrams: usize,
    pub retained_ngrams: usize,
    pub string_table_len: usize,
    pub file_size: u64,
    pub elapsed_ms: u64,
}

/// An index build over one record store.
pub struct Pipeline<S: RecordStore, E: Expand = PositionExpander> {
    config: BuildConfig,
    cache: RecordCache<S>,
    expander: E,
    pool: ThreadPool,
}

impl Pipeline<SqliteRecordStore> {
    /// Pipeline over the SQLite store at `config.cache_path`.
    pub fn open(config: BuildConfig) -> Result<Self> {
        let store = Arc::new(SqliteRecordStore::open(&config.cache_path)?);
        Pipeline::new(config, store, PositionExpander::new())
    }
}

impl<S: RecordStore, E: Expand> Pipeline<S, E> {
    pub fn new(config: BuildConfig, store: Arc<S>, expander: E) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.effective_threads())
            .thread_name(|i| format!("puzzle-load-{i}"))
            .build()
            .map_err(|e| NifError::ThreadPool(format!("Failed to create thread pool: {e}")))?;

        Ok(Pipeline {
            config,
            cache: RecordCache::new(store),
            expander,
            pool,
        })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn cache(&self) -> &RecordCache<S> {
        &self.cache
    }

    /// Resolve one input row, applying the error policy to record failures.
    fn resolve(&self, row: Result<RawPuzzle>, skipped: &AtomicUsize) -> Result<Option<Record>> {
        let result = row.and_then(|raw| self.cache.get_or_compute(raw, &self.expander));
        match result {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_record_error() && self.config.error_policy == ErrorPolicy::Skip => {
                warn!("skipping record: {e}");
                skipped.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run every row through the record cache, sort, deduplicate and evict
    /// stale cache entries.
    pub fn load<I>(&self, rows: I) -> Result<LoadOutcome>
    where
        I: Iterator<Item = Result<RawPuzzle>> + Send,
    {
        let every = self.config.progress_every();
        let read = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        let loaded: Vec<Option<Record>> = self.pool.install(|| {
            rows.par_bridge()
                .map(|row| {
                    let n = read.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % every == 0 {
                        info!("reading: {n}");
                        self.cache.store().checkpoint()?;
                    }
                    self.resolve(row, &skipped)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        info!("read: {}", read.load(Ordering::Relaxed));

        let mut records: Vec<Record> = loaded.into_iter().flatten().collect();
        records.sort_by_cached_key(|r| (key::encode(&r.id), r.id.clone()));

        let before = records.len();
        records.dedup_by(|later, kept| {
            let duplicate = later.id == kept.id;
            if duplicate {
                warn!("dropping duplicate puzzle {}", later.id);
            }
            duplicate
        });
        let duplicates = before - records.len();

        if records.len() > RecordIndex::MAX as usize {
            return Err(NifError::index(format!(
                "{} records exceed the index capacity",
                records.len()
            )));
        }

        info!("Removing obsolete puzzles from cache...");
        let current: HashSet<String> = records.iter().map(|r| key::encode(&r.id)).collect();
        let evicted = self.cache.sweep(&current)?;
        self.cache.store().checkpoint()?;

        Ok(LoadOutcome {
            records,
            skipped: skipped.load(Ordering::Relaxed),
            duplicates,
            evicted,
            cache: self.cache.stats(),
        })
    }

    /// Load the configured input CSV.
    pub fn load_file(&self) -> Result<LoadOutcome> {
        info!("Reading {}", self.config.input_path.display());
        let rows = PuzzleCsvReader::new().open(&self.config.input_path)?;
        self.load(rows)
    }

    /// Build the n-gram table over the sorted records.
    pub fn build_table(&self, records: &[Record]) -> NgramTable {
        let every = self.config.progress_every();
        let mut builder = NgramTableBuilder::new(self.config.ngram_size);
        for (i, record) in records.iter().enumerate() {
            if (i + 1) % every == 0 {
                info!("processing: {}", i + 1);
            }
            builder.add_record(i as RecordIndex, record.fen_prefixes());
        }
        builder.finish()
    }

    /// Index already loaded records into `name` of `storage`.
    pub fn write_index(
        &self,
        outcome: &LoadOutcome,
        storage: &dyn Storage,
        name: &str,
    ) -> Result<BuildReport> {
        let records = &outcome.records;
        let mut table = self.build_table(records);
        let distinct_ngrams = table.distinct_ngrams();

        info!("Filtering to most effective N-grams from {distinct_ngrams}...");
        let postings = minimize(
            table.take_postings(),
            records.len(),
            self.config.minimize_divisor,
        );
        info!("Puzzles: {}", postings.covered());
        info!("N-grams: {distinct_ngrams}");
        info!("Minimal N-grams: {}", postings.len());
        info!("Compressed N-grams size: {}", table.string_table().len());

        info!("Creating {name}...");
        let plan = NifWriter::new(&table, &postings, records).write(storage, name)?;

        Ok(BuildReport {
            records: records.len(),
            skipped_records: outcome.skipped,
            duplicate_records: outcome.duplicates,
            cache_hits: outcome.cache.hits,
            cache_misses: outcome.cache.misses,
            evicted: outcome.evicted,
            distinct_ngrams,
            retained_ngrams: postings.len(),
            string_table_len: table.string_table().len(),
            file_size: plan.file_len,
            elapsed_ms: 0,
        })
    }

    /// Load `rows` and write the index into `name` of `storage`.
    pub fn build_into<I>(&self, rows: I, storage: &dyn Storage, name: &str) -> Result<BuildReport>
    where
        I: Iterator<Item = Result<RawPuzzle>> + Send,
    {
        let start = Instant::now();
        let outcome = self.load(rows)?;
        let mut report = self.write_index(&outcome, storage, name)?;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Full build from the configured input to the configured output file.
    pub fn run(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let outcome = self.load_file()?;
        let (storage, name) = FileStorage::for_file(&self.config.output_path, StorageConfig::default())?;
        let mut report = self.write_index(&outcome, &storage, &name)?;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!("Time taken: {:.1} seconds", report.elapsed_ms as f64 / 1000.0);
        debug!("{report:?}");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryRecordStore;
    use crate::nif::NifIndex;
    use crate::storage::MemoryStorage;

    const CSV: &str = "PuzzleId,FEN,Moves,Rating,RatingDeviation,Popularity,NbPlays,Themes,GameUrl,OpeningTags
zz9,rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1,e2e4 e7e5,1000,75,90,10,opening,https://lichess.org/a,
Aa1,rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1,d2d4 d7d5,1100,75,90,10,opening,https://lichess.org/b,
bb2,8/8/8/8/8/8/8/K6k w - - 0 1,a1a2,900,75,90,10,endgame,https://lichess.org/c,
";

    fn config() -> BuildConfig {
        BuildConfig {
            threads: 2,
            ..BuildConfig::default()
        }
    }

    fn rows(csv: &str) -> impl Iterator<Item = Result<RawPuzzle>> + Send + '_ {
        PuzzleCsvReader::new().from_reader(csv.as_bytes())
    }

    fn pipeline(config: BuildConfig) -> Pipeline<MemoryRecordStore> {
        Pipeline::new(
            config,
            Arc::new(MemoryRecordStore::new()),
            PositionExpander::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_load_sorts_by_encoded_key() {
        let pipeline = pipeline(config());
        let outcome = pipeline.load(rows(CSV)).unwrap();
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
        // "aa14" < "bb20" < "zz90"
        assert_eq!(ids, vec!["Aa1", "bb2", "zz9"]);
        assert_eq!(outcome.cache, CacheStats { hits: 0, misses: 3 });
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let csv = format!("{CSV}bb2,8/8/8/8/8/8/8/K6k w - - 0 1,a1b1,900,75,90,10,endgame,https://lichess.org/d,\n");
        let outcome = pipeline(config()).load(rows(&csv)).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_abort_policy_fails_on_illegal_move() {
        let csv = format!("{CSV}bad,8/8/8/8/8/8/8/K6k w - - 0 1,a1a8,900,75,90,10,endgame,https://lichess.org/e,\n");
        let err = pipeline(config()).load(rows(&csv)).unwrap_err();
        assert!(matches!(err, NifError::MoveApplication { .. }));
    }

    #[test]
    fn test_skip_policy_counts_bad_records() {
        let csv = format!(
            "{CSV}bad,8/8/8/8/8/8/8/K6k w - - 0 1,a1a8,900,75,90,10,endgame,https://lichess.org/e,\nshort,row\n"
        );
        let config = BuildConfig {
            error_policy: ErrorPolicy::Skip,
            ..config()
        };
        let pipeline = pipeline(config);
        let outcome = pipeline.load(rows(&csv)).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(pipeline.cache().store().len().unwrap(), 3);
    }

    #[test]
    fn test_build_into_writes_a_readable_index() {
        // a threshold of all records keeps every n-gram
        let pipeline = pipeline(BuildConfig {
            minimize_divisor: 1,
            ..config()
        });
        let storage = MemoryStorage::new();
        let report = pipeline.build_into(rows(CSV), &storage, "p.nif").unwrap();

        assert_eq!(report.records, 3);
        assert!(report.retained_ngrams > 0);
        assert!(report.retained_ngrams <= report.distinct_ngrams);
        assert_eq!(report.file_size, storage.file_size("p.nif").unwrap());

        let index = NifIndex::open(&storage, "p.nif").unwrap();
        assert_eq!(index.ids(), &["Aa1", "bb2", "zz9"]);
        let hits = index
            .query_ids("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w")
            .unwrap();
        assert!(hits.contains(&"Aa1"));
        assert!(hits.contains(&"zz9"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BuildConfig {
            ngram_size: 0,
            ..config()
        };
        assert!(
            Pipeline::new(config, Arc::new(MemoryRecordStore::new()), PositionExpander::new())
                .is_err()
        );
    }
}
