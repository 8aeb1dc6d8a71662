//! Command implementations for the puzzlenif CLI.

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::{BuildConfig, RefreshConfig};
use crate::error::Result;
use crate::key;
use crate::nif::NifIndex;
use crate::pipeline::{BuildReport, Pipeline};
use crate::refresh::Refresher;

/// Execute a CLI command.
pub fn execute_command(args: PuzzleNifArgs) -> Result<()> {
    match &args.command {
        Command::Build(build_args) => build(build_args, &args),
        Command::Refresh(refresh_args) => refresh(refresh_args, &args),
        Command::Update(update_args) => update(update_args, &args),
        Command::Stats(stats_args) => stats(stats_args, &args),
        Command::Query(query_args) => query(query_args, &args),
        Command::EncodeKey(encode_args) => encode_key(encode_args, &args),
    }
}

/// Configuration file (if any) with the command line overrides applied.
fn build_config(build_args: &BuildArgs, cli_args: &PuzzleNifArgs) -> Result<BuildConfig> {
    let mut config = match &cli_args.config {
        Some(path) => BuildConfig::from_file(path)?,
        None => BuildConfig::default(),
    };
    build_args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn run_build(config: BuildConfig) -> Result<BuildReport> {
    Pipeline::open(config)?.run()
}

fn run_refresh(config: RefreshConfig) -> Result<RefreshResult> {
    let refresher = Refresher::new(config)?;
    let updated = refresher.refresh()?;
    let config = refresher.config();
    Ok(RefreshResult {
        updated,
        archive: config.archive_path.display().to_string(),
        csv: config.csv_path.display().to_string(),
    })
}

fn build(args: &BuildArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let config = build_config(args, cli_args)?;
    let report = run_build(config)?;
    output_result("Index built", &report, cli_args)
}

fn refresh(args: &RefreshArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let result = run_refresh(args.to_config())?;
    let message = if result.updated {
        "Puzzle dump downloaded"
    } else {
        "Puzzle dump is up to date"
    };
    output_result(message, &result, cli_args)
}

fn update(args: &UpdateArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let refresh_config = args.refresh.to_config();
    let mut config = build_config(&args.build, cli_args)?;
    if args.build.input.is_none() {
        config.input_path = refresh_config.csv_path.clone();
    }

    let refreshed = run_refresh(refresh_config)?;
    let needs_build = refreshed.updated || args.force || !config.output_path.exists();
    let build = if needs_build {
        Some(run_build(config)?)
    } else {
        info!("Index {} is current", config.output_path.display());
        None
    };

    let message = if build.is_some() {
        "Index rebuilt"
    } else {
        "Index is up to date"
    };
    output_result(
        message,
        &UpdateResult {
            refresh: refreshed,
            build,
        },
        cli_args,
    )
}

fn stats(args: &StatsArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let index = NifIndex::open_path(&args.index)?;
    output_result(
        &format!("Statistics of {}", args.index.display()),
        &index.stats(),
        cli_args,
    )
}

fn query(args: &QueryArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let index = NifIndex::open_path(&args.index)?;
    let ids = index.query_ids(&args.fen_prefix)?;
    let result = QueryResult {
        query: args.fen_prefix.clone(),
        matches: ids.len(),
        ids: ids.iter().take(args.limit).map(|id| id.to_string()).collect(),
    };
    output_result(
        &format!("{} puzzles match", result.matches),
        &result,
        cli_args,
    )
}

fn encode_key(args: &EncodeKeyArgs, cli_args: &PuzzleNifArgs) -> Result<()> {
    let keys: Vec<EncodedKey> = args
        .ids
        .iter()
        .map(|id| EncodedKey {
            id: id.clone(),
            key: key::encode(id),
        })
        .collect();
    output_result("Encoded keys", &keys, cli_args)
}
