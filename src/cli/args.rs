//! Command line argument parsing for the puzzlenif CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, ErrorPolicy, RefreshConfig};

/// puzzlenif - builds the NIF n-gram index of a chess puzzle corpus
#[derive(Parser, Debug, Clone)]
#[command(name = "puzzlenif")]
#[command(about = "Builds a compact n-gram index over the positions of a chess puzzle corpus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PuzzleNifArgs {
    /// Raise the log level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Build configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "PUZZLENIF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PuzzleNifArgs {
    /// Get the effective verbosity level (0=quiet, 1=normal, 2=verbose, 3+=debug)
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the index from the puzzle CSV
    Build(BuildArgs),

    /// Download the puzzle dump if the server has a newer one
    Refresh(RefreshArgs),

    /// Refresh the puzzle dump and rebuild the index when it changed
    Update(UpdateArgs),

    /// Show index statistics
    Stats(StatsArgs),

    /// Find the puzzles passing through a position
    Query(QueryArgs),

    /// Print the case-folded cache key of identifiers
    #[command(name = "encode-key")]
    EncodeKey(EncodeKeyArgs),
}

/// Arguments for building an index
#[derive(Parser, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Puzzle CSV file
    #[arg(short, long, value_name = "CSV_FILE")]
    pub input: Option<PathBuf>,

    /// Record cache database
    #[arg(long, value_name = "DB_FILE")]
    pub cache: Option<PathBuf>,

    /// Index file to write
    #[arg(short, long, value_name = "NIF_FILE")]
    pub output: Option<PathBuf>,

    /// Worker threads for loading (0 = number of CPUs)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// N-gram length
    #[arg(long)]
    pub ngram_size: Option<usize>,

    /// Popularity threshold divisor of the n-gram minimizer
    #[arg(long)]
    pub minimize_divisor: Option<usize>,

    /// Skip records that fail to parse or replay instead of aborting
    #[arg(long)]
    pub skip_errors: bool,
}

impl BuildArgs {
    /// Override `config` with the flags that were given.
    pub fn apply(&self, config: &mut BuildConfig) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(ngram_size) = self.ngram_size {
            config.ngram_size = ngram_size;
        }
        if let Some(divisor) = self.minimize_divisor {
            config.minimize_divisor = divisor;
        }
        if self.skip_errors {
            config.error_policy = ErrorPolicy::Skip;
        }
    }
}

/// Arguments for refreshing the puzzle dump
#[derive(Parser, Debug, Clone, Default)]
pub struct RefreshArgs {
    /// URL of the compressed puzzle dump
    #[arg(long)]
    pub url: Option<String>,

    /// Local compressed archive
    #[arg(long, value_name = "ZST_FILE")]
    pub archive: Option<PathBuf>,

    /// Decompressed CSV destination
    #[arg(long, value_name = "CSV_FILE")]
    pub csv: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RefreshArgs {
    /// Refresh configuration with the given flags applied.
    pub fn to_config(&self) -> RefreshConfig {
        let mut config = RefreshConfig::default();
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(archive) = &self.archive {
            config.archive_path = archive.clone();
        }
        if let Some(csv) = &self.csv {
            config.csv_path = csv.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// Arguments for refresh followed by a conditional build
#[derive(Parser, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub refresh: RefreshArgs,

    #[command(flatten)]
    pub build: BuildArgs,

    /// Rebuild even when the puzzle dump did not change
    #[arg(long)]
    pub force: bool,
}

/// Arguments for showing statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Index file
    #[arg(value_name = "NIF_FILE")]
    pub index: PathBuf,
}

/// Arguments for querying an index
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Index file
    #[arg(value_name = "NIF_FILE")]
    pub index: PathBuf,

    /// FEN prefix, e.g. "8/8/8/8/8/8/8/K6k w"
    #[arg(value_name = "FEN_PREFIX")]
    pub fen_prefix: String,

    /// Maximum number of identifiers to print
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for key encoding
#[derive(Parser, Debug, Clone)]
pub struct EncodeKeyArgs {
    /// Puzzle identifiers
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_overrides() {
        let args = PuzzleNifArgs::try_parse_from([
            "puzzlenif",
            "build",
            "--input",
            "puzzles.csv",
            "--threads",
            "4",
            "--skip-errors",
        ])
        .unwrap();

        let Command::Build(build) = args.command else {
            panic!("Expected Build command");
        };
        let mut config = BuildConfig::default();
        build.apply(&mut config);
        assert_eq!(config.input_path, PathBuf::from("puzzles.csv"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.error_policy, ErrorPolicy::Skip);
        assert_eq!(config.output_path, BuildConfig::default().output_path);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = PuzzleNifArgs::try_parse_from([
            "puzzlenif",
            "stats",
            "Output/puzzle.nif",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.verbosity(), 3);
    }

    #[test]
    fn test_each_verbose_flag_raises_the_level() {
        let default = PuzzleNifArgs::try_parse_from(["puzzlenif", "encode-key", "AbC"]).unwrap();
        assert_eq!(default.verbosity(), 1);

        let verbose =
            PuzzleNifArgs::try_parse_from(["puzzlenif", "-v", "encode-key", "AbC"]).unwrap();
        assert_eq!(verbose.verbosity(), 2);
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let args = PuzzleNifArgs::try_parse_from(["puzzlenif", "-q", "-v", "encode-key", "AbC"])
            .unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_update_combines_refresh_and_build_flags() {
        let args = PuzzleNifArgs::try_parse_from([
            "puzzlenif",
            "update",
            "--csv",
            "Data/p.csv",
            "--output",
            "out.nif",
            "--force",
        ])
        .unwrap();
        let Command::Update(update) = args.command else {
            panic!("Expected Update command");
        };
        assert!(update.force);
        assert_eq!(update.refresh.to_config().csv_path, PathBuf::from("Data/p.csv"));
        assert_eq!(update.build.output, Some(PathBuf::from("out.nif")));
    }

    #[test]
    fn test_encode_key_requires_an_id() {
        assert!(PuzzleNifArgs::try_parse_from(["puzzlenif", "encode-key"]).is_err());
    }
}
