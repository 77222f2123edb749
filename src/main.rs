//! # tunedup
//!
//! Scans a music library for duplicate uploads and deletes the redundant
//! copies.
//!
//! ## Usage
//!
//! ```bash
//! # Mirror a library export locally
//! tunedup import all_songs.json
//!
//! # Look before deleting
//! tunedup describe --threshold 90
//!
//! # Delete, asking about anything that is not an exact match
//! tunedup dedupe --merge-plays
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::io;
use tunedup::cache::Cache;
use tunedup::cli::{self, Command};
use tunedup::commands::{self, tracks_cache_key, DedupeOptions, GroupSettings};
use tunedup::completion;
use tunedup::config::RuntimeConfig;
use tunedup::db::SqliteLibrary;
use tunedup::grouper::validate_threshold;
use tunedup::track::Track;

/// Resolve paths from flags, environment and platform defaults.
fn runtime_config(args: &cli::Args) -> Result<RuntimeConfig> {
    let config = RuntimeConfig::resolve(args.library.clone(), args.cache_dir.clone())?;
    debug!("Using runtime configuration {config:?}");
    Ok(config)
}

fn track_cache(config: &RuntimeConfig) -> Cache {
    Cache::new(&config.cache_dir, config.cache_max_age)
}

fn open_library(config: &RuntimeConfig) -> Result<SqliteLibrary> {
    SqliteLibrary::open(&config.db_path).with_context(|| {
        format!(
            "Cannot open library {}. Run `tunedup import <EXPORT>` first.",
            config.db_path.display()
        )
    })
}

/// Fetch tracks through the cache entry of `config.db_path`, dropping it
/// first when `--refresh` was given.
fn fetch_tracks(
    library: &SqliteLibrary,
    config: &RuntimeConfig,
    cache: &Cache,
    refresh: bool,
) -> Result<Vec<Track>> {
    let key = tracks_cache_key(&config.db_path);
    if refresh {
        cache.invalidate(&key)?;
    }
    let tracks = commands::load_tracks(library, Some((cache, &key)))?;
    info!("Loaded {} tracks", tracks.len());
    Ok(tracks)
}

/// Main entry point.
///
/// Logging is controlled through `RUST_LOG`, e.g.
/// `RUST_LOG=tunedup::grouper=trace tunedup describe`.
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match &args.command {
        Command::Import { export } => {
            let config = runtime_config(&args)?;
            let mut library = SqliteLibrary::create(&config.db_path).with_context(|| {
                format!("Cannot create library {}", config.db_path.display())
            })?;
            let written = commands::import(&mut library, export)?;
            track_cache(&config).invalidate(&tracks_cache_key(&config.db_path))?;
            println!("Imported {written} tracks into {}", config.db_path.display());
        }
        Command::List => {
            let config = runtime_config(&args)?;
            let library = open_library(&config)?;
            let tracks = fetch_tracks(&library, &config, &track_cache(&config), args.refresh)?;
            commands::list(&mut io::stdout().lock(), &tracks)?;
        }
        Command::Describe { grouping } => {
            let settings = GroupSettings::from(grouping);
            validate_threshold(settings.threshold)?;

            let config = runtime_config(&args)?;
            let library = open_library(&config)?;
            let tracks = fetch_tracks(&library, &config, &track_cache(&config), args.refresh)?;
            commands::describe(&mut io::stdout().lock(), &tracks, &settings)?;
        }
        Command::Dedupe {
            grouping,
            dry_run,
            yes,
            merge_plays,
        } => {
            let settings = GroupSettings::from(grouping);
            validate_threshold(settings.threshold)?;

            let config = runtime_config(&args)?;
            let cache = track_cache(&config);
            let mut library = open_library(&config)?;
            let tracks = fetch_tracks(&library, &config, &cache, args.refresh)?;
            let options = DedupeOptions {
                dry_run: *dry_run,
                assume_yes: *yes,
                merge_plays: *merge_plays,
            };

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let result = commands::dedupe(&mut library, &tracks, &settings, options, |group| {
                commands::prompt_confirm(&mut input, &mut io::stdout(), group)
            });

            // A failed run may still have deleted earlier groups.
            if result.as_ref().map_or(!options.dry_run, |outcome| outcome.tracks_deleted > 0) {
                cache.invalidate(&tracks_cache_key(&config.db_path))?;
            }
            let outcome = result?;

            println!(
                "Groups: {}, deleted automatically: {}, confirmed: {}, skipped: {}, tracks deleted: {}",
                outcome.groups,
                outcome.auto_deleted,
                outcome.confirmed,
                outcome.skipped,
                outcome.tracks_deleted
            );
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(*shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}
