//! # Integration Tests for tunedup
//!
//! Exercises tunedup from the outside: the binary's command line, a library
//! database built from an export on disk, the track cache, and the grouping
//! properties that must hold for any input.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const EXPORT: &str = r#"[
    {"id": "1", "title": "Song A", "artist": "Foo", "album": "X", "trackNumber": "1",
     "durationMillis": "200000", "playCount": "3", "recentTimestamp": "1372040508935000"},
    {"id": "2", "title": "song a", "artist": "foo", "album": "x", "trackNumber": 1,
     "durationMillis": 200000, "playCount": 4, "recentTimestamp": "1400000000000000"},
    {"id": "3", "title": "Sunday Morning", "artist": "The Velvet Underground",
     "album": "The Velvet Underground & Nico", "durationMillis": "174000"},
    {"id": "4", "title": "Sunday Mornin", "artist": "The Velvet Underground",
     "album": "The Velvet Underground & Nico", "durationMillis": "174000", "playCount": 1},
    {"id": "5", "title": "Totally Different", "artist": "Bar", "album": "Y"}
]"#;

/// Test helper writing the sample export into a fresh temporary directory
fn create_test_export() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let export_path = temp_dir.path().join("all_songs.json");
    fs::write(&export_path, EXPORT)?;
    Ok((temp_dir, export_path))
}

/// Runs the tunedup binary against a library and cache inside `dir`
fn run_tunedup(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tunedup"))
        .env("TUNEDUP_LIBRARY", dir.join("library.db"))
        .env("TUNEDUP_CACHE_DIR", dir.join("cache"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to run tunedup")
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = Command::new(env!("CARGO_BIN_EXE_tunedup"))
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("tunedup"));
        assert!(stdout.contains("import"));
        assert!(stdout.contains("describe"));
        assert!(stdout.contains("dedupe"));
    }

    #[test]
    fn test_completion_generation() {
        let output = Command::new(env!("CARGO_BIN_EXE_tunedup"))
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_tunedup"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_import_describe_dedupe_workflow() -> Result<()> {
        let (temp_dir, export_path) = create_test_export()?;
        let dir = temp_dir.path();

        let output = run_tunedup(dir, &["import", export_path.to_str().unwrap()]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert!(String::from_utf8_lossy(&output.stdout).contains("Imported 5 tracks"));

        let output = run_tunedup(dir, &["describe", "--threshold", "90"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Group Size: 2"));
        assert!(stdout.contains("Total Groups: 2"));
        assert!(!stdout.contains("Totally Different"));

        // Closed stdin declines the fuzzy group; the exact group goes anyway.
        let output = run_tunedup(dir, &["dedupe", "--threshold", "90", "--merge-plays"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("deleted automatically: 1"));
        assert!(stdout.contains("skipped: 1"));

        let output = run_tunedup(dir, &["list"]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Total Tracks: 4"));
        assert!(stdout.contains("(7 plays)"));
        Ok(())
    }

    #[test]
    fn test_invalid_threshold_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let output = run_tunedup(temp_dir.path(), &["describe", "--threshold", "101"]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("invalid similarity threshold 101"));
        // Rejected before anything touched the library.
        assert!(!temp_dir.path().join("library.db").exists());
        Ok(())
    }

    #[test]
    fn test_missing_library_suggests_import() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let output = run_tunedup(temp_dir.path(), &["list"]);

        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("tunedup import"));
        Ok(())
    }
}

#[cfg(test)]
mod database_integration_tests {
    use super::*;
    use tunedup::commands::{self, DedupeOptions, GroupSettings};
    use tunedup::db::SqliteLibrary;
    use tunedup::error::LibraryError;
    use tunedup::MusicLibrary;

    #[test]
    fn test_import_then_reopen() -> Result<()> {
        let (temp_dir, export_path) = create_test_export()?;
        let db_path = temp_dir.path().join("nested").join("library.db");

        {
            let mut library = SqliteLibrary::create(&db_path)?;
            assert_eq!(commands::import(&mut library, &export_path)?, 5);
        }

        let library = SqliteLibrary::open(&db_path)?;
        let tracks = library.fetch_all_tracks()?;
        let ids: Vec<&str> = tracks.iter().map(|track| track.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(tracks[0].duration_seconds, Some(200.0));
        Ok(())
    }

    #[test]
    fn test_open_missing_database_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();

        let result = SqliteLibrary::open(&temp_dir.path().join("absent.db"));

        assert!(matches!(result, Err(LibraryError::ServiceUnavailable(_))));
    }

    #[test]
    fn test_dedupe_against_sqlite_merges_plays() -> Result<()> {
        let (temp_dir, export_path) = create_test_export()?;
        let mut library = SqliteLibrary::create(&temp_dir.path().join("library.db"))?;
        commands::import(&mut library, &export_path)?;
        let tracks = library.fetch_all_tracks()?;

        let options = DedupeOptions {
            assume_yes: true,
            merge_plays: true,
            ..DedupeOptions::default()
        };
        let outcome = commands::dedupe(
            &mut library,
            &tracks,
            &GroupSettings::default(),
            options,
            |_| panic!("assume_yes must not prompt"),
        )?;

        assert_eq!(outcome.groups, 2);
        assert_eq!(outcome.auto_deleted, 1);
        assert_eq!(outcome.confirmed, 1);
        assert_eq!(outcome.tracks_deleted, 2);

        let remaining = library.fetch_all_tracks()?;
        let ids: Vec<&str> = remaining.iter().map(|track| track.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "5"]);
        assert_eq!(remaining[0].play_count, 7);
        assert_eq!(remaining[0].last_played_micros, Some(1_400_000_000_000_000));
        Ok(())
    }

    #[test]
    fn test_dry_run_leaves_database_untouched() -> Result<()> {
        let (temp_dir, export_path) = create_test_export()?;
        let mut library = SqliteLibrary::create(&temp_dir.path().join("library.db"))?;
        commands::import(&mut library, &export_path)?;
        let tracks = library.fetch_all_tracks()?;

        let options = DedupeOptions {
            dry_run: true,
            ..DedupeOptions::default()
        };
        let outcome =
            commands::dedupe(&mut library, &tracks, &GroupSettings::default(), options, |_| Ok(true))?;

        assert_eq!(outcome.tracks_deleted, 0);
        assert_eq!(library.count()?, 5);
        Ok(())
    }
}

#[cfg(test)]
mod cache_integration_tests {
    use super::*;
    use std::time::Duration;
    use tunedup::cache::Cache;
    use tunedup::commands::{self, tracks_cache_key};
    use tunedup::db::SqliteLibrary;
    use tunedup::MusicLibrary;

    #[test]
    fn test_cached_tracks_survive_library_changes_until_invalidated() -> Result<()> {
        let (temp_dir, export_path) = create_test_export()?;
        let db_path = temp_dir.path().join("library.db");
        let mut library = SqliteLibrary::create(&db_path)?;
        commands::import(&mut library, &export_path)?;
        let cache = Cache::new(temp_dir.path().join("cache"), Duration::from_secs(3600));
        let key = tracks_cache_key(&db_path);

        let first = commands::load_tracks(&library, Some((&cache, &key)))?;
        assert_eq!(first.len(), 5);
        assert!(cache.path_for(&key).exists());

        library.delete_tracks(&["5".to_string()])?;
        let cached = commands::load_tracks(&library, Some((&cache, &key)))?;
        assert_eq!(cached, first);

        cache.invalidate(&key)?;
        let fresh = commands::load_tracks(&library, Some((&cache, &key)))?;
        assert_eq!(fresh.len(), 4);
        Ok(())
    }

    #[test]
    fn test_libraries_sharing_a_cache_dir_keep_separate_entries() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache = Cache::new(temp_dir.path().join("cache"), Duration::from_secs(3600));

        let first_path = temp_dir.path().join("first.db");
        let mut first = SqliteLibrary::create(&first_path)?;
        first.upsert_tracks(&[tunedup::Track::new("1", "Song A", "Foo", "X")])?;
        let second_path = temp_dir.path().join("second.db");
        let mut second = SqliteLibrary::create(&second_path)?;
        second.upsert_tracks(&[tunedup::Track::new("1", "Keep Me", "One", "P")])?;

        let first_key = tracks_cache_key(&first_path);
        let second_key = tracks_cache_key(&second_path);
        assert_ne!(first_key, second_key);

        commands::load_tracks(&first, Some((&cache, &first_key)))?;
        let tracks = commands::load_tracks(&second, Some((&cache, &second_key)))?;
        assert_eq!(tracks[0].title, "Keep Me");
        Ok(())
    }

    #[test]
    fn test_dedupe_never_uses_another_librarys_cached_tracks() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        let cache_dir = dir.join("cache");

        let duplicates = dir.join("duplicates.json");
        fs::write(
            &duplicates,
            r#"[{"id": "1", "title": "Song A", "artist": "Foo", "album": "X"},
                {"id": "2", "title": "Song A", "artist": "Foo", "album": "X"}]"#,
        )?;
        let distinct = dir.join("distinct.json");
        fs::write(
            &distinct,
            r#"[{"id": "1", "title": "Keep Me", "artist": "One", "album": "P"},
                {"id": "2", "title": "Unrelated", "artist": "Two", "album": "Q"}]"#,
        )?;

        let run = |library: &str, args: &[&str]| {
            Command::new(env!("CARGO_BIN_EXE_tunedup"))
                .env("TUNEDUP_LIBRARY", dir.join(library))
                .env("TUNEDUP_CACHE_DIR", &cache_dir)
                .env_remove("RUST_LOG")
                .args(args)
                .output()
                .expect("Failed to run tunedup")
        };

        assert!(run("a.db", &["import", duplicates.to_str().unwrap()]).status.success());
        assert!(run("b.db", &["import", distinct.to_str().unwrap()]).status.success());
        assert!(run("a.db", &["describe"]).status.success());

        let output = run("b.db", &["dedupe"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("tracks deleted: 0"));

        let output = run("b.db", &["list", "--refresh"]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Unrelated"));
        assert!(stdout.contains("Total Tracks: 2"));
        Ok(())
    }
}

#[cfg(test)]
mod configuration_tests {
    use tunedup::config::{get_cache_dir, get_db_path, RuntimeConfig, DEFAULT_THRESHOLD};

    #[test]
    fn test_database_path_generation() -> anyhow::Result<()> {
        let db_path = get_db_path()?;
        assert!(db_path.ends_with("tunedup/library.db"));
        Ok(())
    }

    #[test]
    fn test_runtime_config_creation() -> anyhow::Result<()> {
        let config = RuntimeConfig::new()?;
        assert_eq!(config.db_path, get_db_path()?);
        assert_eq!(config.cache_dir, get_cache_dir()?);
        assert!((0.0..=100.0).contains(&DEFAULT_THRESHOLD));
        Ok(())
    }
}

#[cfg(test)]
mod grouping_integration_tests {
    use tunedup::error::GroupError;
    use tunedup::{group, Track};

    #[test]
    fn test_concrete_scenario() {
        let tracks = vec![
            Track::new("a", "Song A", "Foo", "X"),
            Track::new("b", "song a", "foo", "x"),
            Track::new("c", "Totally Different", "Bar", "Y"),
        ];

        let groups = group(&tracks, 90.0).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].ids(), vec!["a", "b"]);
        assert_eq!(groups[0].similarity, 100.0);
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(group(&[], 80.0).unwrap().is_empty());
        assert_eq!(group(&[], -1.0), Err(GroupError::InvalidThreshold(-1.0)));
        assert_eq!(group(&[], 101.0), Err(GroupError::InvalidThreshold(101.0)));
        assert!(group(&[], 0.0).is_ok());
        assert!(group(&[], 100.0).is_ok());
    }

    #[test]
    fn test_keep_prefers_populated_album() {
        let tracks = vec![
            Track::new("1", "Song", "Artist", ""),
            Track::new("2", "Song", "Artist", "Album"),
        ];

        let groups = group(&tracks, 50.0).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep.id, "2");
        assert_eq!(groups[0].delete_ids(), vec!["1".to_string()]);
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use tunedup::grouper::DuplicateGroup;
    use tunedup::similarity::{Ratio, Scorer, TokenSortRatio};
    use tunedup::{group, Track};

    const TITLES: [&str; 6] = [
        "Song A",
        "song a",
        "Song B",
        "Sunday Morning",
        "Sunday Mornin",
        "Heroin",
    ];
    const ARTISTS: [&str; 3] = ["Foo", "foo!", "The Velvet Underground"];
    const ALBUMS: [&str; 3] = ["X", "", "The Velvet Underground & Nico"];

    /// Small libraries drawn from a tiny vocabulary so duplicates are common.
    fn arbitrary_library() -> impl Strategy<Value = Vec<Track>> {
        prop::collection::vec((0..TITLES.len(), 0..ARTISTS.len(), 0..ALBUMS.len()), 0..10).prop_map(
            |picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, (title, artist, album))| {
                        Track::new(format!("{i:02}"), TITLES[title], ARTISTS[artist], ALBUMS[album])
                    })
                    .collect()
            },
        )
    }

    fn id_sets(groups: &[DuplicateGroup]) -> BTreeSet<BTreeSet<String>> {
        groups
            .iter()
            .map(|group| group.ids().into_iter().map(str::to_string).collect())
            .collect()
    }

    proptest! {
        /// Scores do not depend on argument order
        #[test]
        fn scorers_are_symmetric(a in "[a-z ]{0,12}", b in "[a-z ]{0,12}") {
            prop_assert_eq!(Ratio.score(&a, &b), Ratio.score(&b, &a));
            prop_assert_eq!(TokenSortRatio.score(&a, &b), TokenSortRatio.score(&b, &a));
        }

        /// Reordering the input yields the same groups and survivors
        #[test]
        fn grouping_ignores_input_order(
            (tracks, shuffled) in arbitrary_library()
                .prop_flat_map(|tracks| (Just(tracks.clone()), Just(tracks).prop_shuffle())),
            threshold in 0.0..=100.0f64
        ) {
            let original = group(&tracks, threshold).unwrap();
            let reordered = group(&shuffled, threshold).unwrap();

            prop_assert_eq!(id_sets(&original), id_sets(&reordered));
            prop_assert_eq!(original, reordered);
        }

        /// Grouping twice gives the same answer, and each group regroups to itself
        #[test]
        fn grouping_is_idempotent(tracks in arbitrary_library(), threshold in 0.0..=100.0f64) {
            let groups = group(&tracks, threshold).unwrap();
            prop_assert_eq!(&groups, &group(&tracks, threshold).unwrap());

            for found in &groups {
                let members: Vec<Track> = found.members().cloned().collect();
                let regrouped = group(&members, threshold).unwrap();
                prop_assert_eq!(regrouped.len(), 1);
                prop_assert_eq!(regrouped[0].ids(), found.ids());
            }
        }

        /// Raising the threshold only ever splits groups
        #[test]
        fn higher_threshold_refines_groups(
            tracks in arbitrary_library(),
            low in 0.0..=100.0f64,
            high in 0.0..=100.0f64
        ) {
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            let coarse = id_sets(&group(&tracks, low).unwrap());
            let fine = id_sets(&group(&tracks, high).unwrap());

            for subset in &fine {
                prop_assert!(
                    coarse.iter().any(|superset| subset.is_subset(superset)),
                    "{:?} at {} has no superset at {}", subset, high, low
                );
            }
        }

        /// Every track lands in at most one group, and groups never shrink below two
        #[test]
        fn groups_partition_their_members(tracks in arbitrary_library(), threshold in 0.0..=100.0f64) {
            let groups = group(&tracks, threshold).unwrap();
            let mut seen = BTreeSet::new();

            for found in &groups {
                prop_assert!(found.len() >= 2);
                prop_assert!(!found.delete.iter().any(|track| track.id == found.keep.id));
                for id in found.ids() {
                    prop_assert!(seen.insert(id.to_string()), "{} grouped twice", id);
                }
            }
        }

        /// Copies of one track always collapse into a single group
        #[test]
        fn identical_keys_always_group(copies in 2..6usize, threshold in 0.0..=100.0f64) {
            let tracks: Vec<Track> = (0..copies)
                .map(|i| Track::new(i.to_string(), "Song A", "Foo", "X"))
                .collect();

            let groups = group(&tracks, threshold).unwrap();

            prop_assert_eq!(groups.len(), 1);
            prop_assert_eq!(groups[0].len(), copies);
        }

        /// A lone track never forms a group
        #[test]
        fn singleton_never_groups(title in "[A-Za-z ]{0,16}", threshold in 0.0..=100.0f64) {
            let tracks = vec![Track::new("only", title, "Artist", "Album")];
            prop_assert!(group(&tracks, threshold).unwrap().is_empty());
        }
    }
}
