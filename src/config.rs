//! Build and refresh configuration.
//!
//! Every field has a default, so a configuration file only needs to name what
//! it changes:
//!
//! ```json
//! { "threads": 8, "error_policy": "skip" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NifError, Result};

/// What to do with a record that fails to parse or to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log, count and drop the record.
    Skip,
}

/// Configuration of an index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source CSV file.
    pub input_path: PathBuf,

    /// Record store file.
    pub cache_path: PathBuf,

    /// Index file to write.
    pub output_path: PathBuf,

    /// N-gram length.
    pub ngram_size: usize,

    /// Worker threads for the load pass (0 = number of CPUs).
    pub threads: usize,

    /// A retained n-gram is "popular" once its set exceeds `records / minimize_divisor`.
    pub minimize_divisor: usize,

    /// Records between progress log lines.
    pub progress_interval: usize,

    /// Handling of record-level failures.
    pub error_policy: ErrorPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            input_path: PathBuf::from("Data/lichess_db_puzzle.csv"),
            cache_path: PathBuf::from("puzzleCache.db"),
            output_path: PathBuf::from("Output/puzzle.nif"),
            ngram_size: 3,
            threads: 16,
            minimize_divisor: 100,
            progress_interval: 10_000,
            error_policy: ErrorPolicy::Abort,
        }
    }
}

impl BuildConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: BuildConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.ngram_size == 0 || self.ngram_size > u8::MAX as usize {
            return Err(NifError::invalid_argument(format!(
                "ngram_size must be within 1..=255, got {}",
                self.ngram_size
            )));
        }
        if self.minimize_divisor == 0 {
            return Err(NifError::invalid_argument(
                "minimize_divisor must be at least 1",
            ));
        }
        Ok(())
    }

    /// Worker count actually used by the load pass.
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Progress interval, never zero.
    pub fn progress_every(&self) -> usize {
        self.progress_interval.max(1)
    }
}

/// Configuration of the source file freshness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Remote compressed CSV.
    pub url: String,

    /// Local copy of the compressed CSV; its mtime is the freshness reference.
    pub archive_path: PathBuf,

    /// Decompressed CSV.
    pub csv_path: PathBuf,

    /// Request timeout.
    pub timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            url: "https://database.lichess.org/lichess_db_puzzle.csv.zst".to_string(),
            archive_path: PathBuf::from("Data/lichess_db_puzzle.csv.zst"),
            csv_path: PathBuf::from("Data/lichess_db_puzzle.csv"),
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_default() {
        let config = BuildConfig::default();
        assert_eq!(config.ngram_size, 3);
        assert_eq!(config.threads, 16);
        assert_eq!(config.minimize_divisor, 100);
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BuildConfig =
            serde_json::from_str(r#"{ "threads": 4, "error_policy": "skip" }"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.error_policy, ErrorPolicy::Skip);
        assert_eq!(config.ngram_size, 3);
        assert_eq!(config.output_path, PathBuf::from("Output/puzzle.nif"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = BuildConfig {
            ngram_size: 0,
            ..BuildConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BuildConfig {
            minimize_divisor: 0,
            ..BuildConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        fs::write(&path, r#"{ "ngram_size": 4, "cache_path": "cache.db" }"#).unwrap();

        let config = BuildConfig::from_file(&path).unwrap();
        assert_eq!(config.ngram_size, 4);
        assert_eq!(config.cache_path, PathBuf::from("cache.db"));
    }

    #[test]
    fn test_effective_threads() {
        let config = BuildConfig {
            threads: 0,
            ..BuildConfig::default()
        };
        assert!(config.effective_threads() >= 1);
        assert_eq!(BuildConfig::default().effective_threads(), 16);
    }
}
