//! # Command-Line Interface Module
//!
//! Clap definitions for the `tunedup` binary.
//!
//! ## Commands
//!
//! - `import`: load a library export into the local library database
//! - `list`: show every track in the library
//! - `describe`: show duplicate groups without deleting anything
//! - `dedupe`: delete duplicate tracks
//! - `completion`: generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! tunedup import ~/Downloads/all_songs.json
//! tunedup describe --threshold 85
//! tunedup dedupe --merge-plays
//! ```

use crate::commands::GroupSettings;
use crate::similarity::ScorerKind;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
#[command(name = "tunedup")]
#[command(about = "tunedup: find and delete duplicate tracks in your music library")]
#[command(version)]
pub struct Args {
    /// Library database to operate on
    ///
    /// Defaults to `library.db` in the platform data directory.
    #[arg(long, global = true, env = "TUNEDUP_LIBRARY", value_hint = clap::ValueHint::FilePath)]
    pub library: Option<PathBuf>,

    /// Directory for cached track lists
    #[arg(long, global = true, env = "TUNEDUP_CACHE_DIR", value_hint = clap::ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,

    /// Ignore any cached track list and fetch from the library
    #[arg(long, global = true)]
    pub refresh: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a library export into the library database
    ///
    /// The export is the JSON array of song objects returned by the music
    /// service. Tracks already present are updated in place.
    Import {
        /// Path to the exported JSON file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        export: PathBuf,
    },

    /// List all tracks in the library
    List,

    /// Show duplicate groups, most similar first
    ///
    /// Nothing is deleted.
    Describe {
        #[command(flatten)]
        grouping: GroupingArgs,
    },

    /// Delete duplicate tracks
    ///
    /// Groups whose metadata is identical after normalization are deleted
    /// automatically. Every other group is shown and deleted only after
    /// confirmation.
    Dedupe {
        #[command(flatten)]
        grouping: GroupingArgs,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Delete every group without asking
        #[arg(short, long)]
        yes: bool,

        /// Add the plays of deleted copies to the kept track
        #[arg(long)]
        merge_plays: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: tunedup completion bash > ~/.local/share/bash-completion/completions/tunedup
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Options controlling how tracks are grouped.
#[derive(ClapArgs, Debug, Clone)]
pub struct GroupingArgs {
    /// Similarity threshold between 0 and 100
    ///
    /// Two tracks are linked when their similarity exceeds this value.
    #[arg(short, long, default_value_t = crate::config::DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    pub threshold: f64,

    /// Similarity function
    #[arg(long, value_enum, default_value_t = ScorerKind::Ratio)]
    pub scorer: ScorerKind,

    /// Never link tracks whose durations differ by more than this many seconds
    #[arg(long)]
    pub max_duration_diff: Option<f64>,
}

impl From<&GroupingArgs> for GroupSettings {
    fn from(args: &GroupingArgs) -> Self {
        Self {
            threshold: args.threshold,
            scorer: args.scorer,
            max_duration_diff: args.max_duration_diff,
        }
    }
}
