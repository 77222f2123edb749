//! # Driver Commands
//!
//! Glue between the command line, the library client and the grouper. Each
//! command takes the library handle explicitly; nothing here owns global
//! state.
//!
//! - [`import`]: load a library export into the SQLite library
//! - [`list`]: print every track
//! - [`describe`]: print duplicate groups without touching the library
//! - [`dedupe`]: delete duplicates, automatically for certain groups and
//!   after confirmation for the rest

use crate::cache::Cache;
use crate::db::SqliteLibrary;
use crate::grouper::{DuplicateGroup, DuplicateGrouper};
use crate::library::MusicLibrary;
use crate::report;
use crate::similarity::{ScorerKind, PERFECT_SCORE};
use crate::track::Track;
use anyhow::{Context, Result};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

/// Cache key of the track list fetched from the library at `db_path`.
///
/// Libraries sharing a cache directory get separate entries. The path is
/// canonicalized first so that different spellings of it agree.
#[must_use]
pub fn tracks_cache_key(db_path: &Path) -> String {
    let path = fs::canonicalize(db_path).unwrap_or_else(|_| db_path.to_path_buf());

    let mut hasher = Sha256::new();
    hasher.update(path.as_os_str().as_encoded_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("tracks_{}", &digest[..16])
}

/// How tracks are grouped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSettings {
    pub threshold: f64,
    pub scorer: ScorerKind,
    /// Maximum duration difference in seconds between linked tracks.
    pub max_duration_diff: Option<f64>,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            threshold: crate::config::DEFAULT_THRESHOLD,
            scorer: ScorerKind::default(),
            max_duration_diff: None,
        }
    }
}

impl GroupSettings {
    #[must_use]
    pub fn grouper(&self) -> DuplicateGrouper {
        let grouper = DuplicateGrouper::new().with_boxed_scorer(self.scorer.scorer());
        match self.max_duration_diff {
            Some(seconds) => grouper.with_duration_tolerance(seconds),
            None => grouper,
        }
    }

    /// Group `tracks` with these settings.
    ///
    /// # Errors
    ///
    /// Fails when the threshold is out of range.
    pub fn group(&self, tracks: &[Track]) -> Result<Vec<DuplicateGroup>> {
        let groups = self
            .grouper()
            .group(tracks, self.threshold)
            .context("Cannot group tracks")?;
        Ok(groups)
    }
}

/// Fetch every track, going through `cache` under the given key when one is
/// given. The key must identify `library`; see [`tracks_cache_key`].
///
/// # Errors
///
/// A failed fetch is fatal and returned unchanged inside the context chain.
pub fn load_tracks(library: &dyn MusicLibrary, cache: Option<(&Cache, &str)>) -> Result<Vec<Track>> {
    let fetch = || {
        info!("Fetching tracks from library");
        library
            .fetch_all_tracks()
            .context("Failed to fetch tracks from the music library")
    };

    match cache {
        Some((cache, key)) => cache.get_or_insert_with(key, fetch),
        None => fetch(),
    }
}

/// Load a library export into `library`. Returns the number of tracks
/// written.
///
/// # Errors
///
/// Fails if the export cannot be read or decoded, or the database write
/// fails.
pub fn import(library: &mut SqliteLibrary, export_path: &Path) -> Result<usize> {
    let written = library
        .import_export(export_path)
        .with_context(|| format!("Failed to import {}", export_path.display()))?;
    info!("Imported {written} tracks from {}", export_path.display());
    Ok(written)
}

/// Print one summary line per track, sorted by artist, album, then title.
///
/// # Errors
///
/// Propagates write failures.
pub fn list(out: &mut impl Write, tracks: &[Track]) -> Result<()> {
    let mut sorted: Vec<&Track> = tracks.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.artist, &a.album, a.track_number, &a.title, &a.id)
            .cmp(&(&b.artist, &b.album, b.track_number, &b.title, &b.id))
    });

    for track in sorted {
        writeln!(out, "{}", track.summary())?;
    }
    writeln!(out, "Total Tracks: {}", tracks.len())?;
    Ok(())
}

/// Print the duplicate groups found in `tracks`. Returns the group count.
///
/// # Errors
///
/// Fails on an invalid threshold or a write failure.
pub fn describe(out: &mut impl Write, tracks: &[Track], settings: &GroupSettings) -> Result<usize> {
    let groups = settings.group(tracks)?;
    report::write_groups(out, &groups)?;
    Ok(groups.len())
}

/// Switches for [`dedupe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeOptions {
    /// Show decisions but never delete.
    pub dry_run: bool,
    /// Delete every group without asking.
    pub assume_yes: bool,
    /// Add the deleted copies' plays to the kept track first.
    pub merge_plays: bool,
}

/// What a [`dedupe`] run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub groups: usize,
    /// Groups with identical metadata, deleted without asking.
    pub auto_deleted: usize,
    /// Groups deleted after confirmation (or `assume_yes`).
    pub confirmed: usize,
    pub skipped: usize,
    pub tracks_deleted: usize,
}

/// Group `tracks` and delete the redundant copies from `library`.
///
/// Groups whose members all share identical keys (similarity 100) are
/// deleted straight away. Every other group is deleted only when `confirm`
/// returns true for it, or when `options.assume_yes` is set.
///
/// # Errors
///
/// Fails on an invalid threshold, when `confirm` fails, or when the library
/// rejects a delete. Deletes already issued are not rolled back.
pub fn dedupe<F>(
    library: &mut dyn MusicLibrary,
    tracks: &[Track],
    settings: &GroupSettings,
    options: DedupeOptions,
    mut confirm: F,
) -> Result<DedupeOutcome>
where
    F: FnMut(&DuplicateGroup) -> Result<bool>,
{
    let groups = settings.group(tracks)?;
    let mut outcome = DedupeOutcome {
        groups: groups.len(),
        ..DedupeOutcome::default()
    };

    for group in &groups {
        let certain = group.similarity >= PERFECT_SCORE;

        if options.dry_run {
            info!("Dry run, would delete {:?}", group.delete_ids());
            outcome.skipped += 1;
            continue;
        }

        let approved = certain || options.assume_yes || confirm(group)?;
        if !approved {
            debug!("Keeping all {} tracks of group around {}", group.len(), group.keep.id);
            outcome.skipped += 1;
            continue;
        }

        delete_group(library, group, options.merge_plays)?;
        outcome.tracks_deleted += group.delete.len();
        if certain {
            outcome.auto_deleted += 1;
        } else {
            outcome.confirmed += 1;
        }
    }

    info!(
        "Deduplication finished: {} groups, {} deleted automatically, {} confirmed, {} skipped",
        outcome.groups, outcome.auto_deleted, outcome.confirmed, outcome.skipped
    );
    Ok(outcome)
}

fn delete_group(library: &mut dyn MusicLibrary, group: &DuplicateGroup, merge_plays: bool) -> Result<()> {
    if merge_plays {
        merge_play_counts(library, group)?;
    }

    let ids = group.delete_ids();
    info!("Keeping {}, deleting {:?}", group.keep.id, ids);
    library
        .delete_tracks(&ids)
        .with_context(|| format!("Failed to delete duplicates of {}", group.keep.id))
}

/// Add the plays of every deleted copy to the kept track, stamped with the
/// most recent play time in the group.
///
/// # Errors
///
/// Fails when the library rejects the update.
pub fn merge_play_counts(library: &mut dyn MusicLibrary, group: &DuplicateGroup) -> Result<()> {
    let extra_plays = group
        .delete
        .iter()
        .fold(0u32, |total, track| total.saturating_add(track.play_count));
    if extra_plays == 0 {
        return Ok(());
    }

    let last_played = group.members().filter_map(|track| track.last_played_micros).max();
    debug!("Adding {extra_plays} plays to {}", group.keep.id);
    library
        .increment_play_count(&group.keep.id, extra_plays, last_played)
        .with_context(|| format!("Failed to merge play counts into {}", group.keep.id))
}

/// Show the decision for `group` and ask `Delete? (y/N)` until the answer is
/// understood. End of input counts as "no".
///
/// # Errors
///
/// Propagates read and write failures.
pub fn prompt_confirm(
    input: &mut impl BufRead,
    output: &mut impl Write,
    group: &DuplicateGroup,
) -> Result<bool> {
    write!(output, "{}", report::decision(group))?;

    loop {
        writeln!(output, "Delete? (y/N)")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output, "Not deleting.")?;
            return Ok(false);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                writeln!(output, "Deleting.")?;
                return Ok(true);
            }
            "" | "n" | "no" => {
                writeln!(output, "Not deleting.")?;
                return Ok(false);
            }
            _ => continue,
        }
    }
}
