//! # SQLite Library Backend
//!
//! A [`MusicLibrary`] backed by a local SQLite mirror of the user's library.
//! The mirror is filled from a library export: the JSON array of song objects
//! returned by the cloud service's "all songs" call. Numeric fields in those
//! exports are frequently encoded as strings, so the importer accepts both.
//!
//! ## Schema
//!
//! A single `track` table keyed by the library's track id. Importing the same
//! export twice updates rows in place.

use crate::error::LibraryError;
use crate::library::{MusicLibrary, Result};
use crate::track::Track;
use log::{debug, info, trace, warn};
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS track (
    id                 TEXT    PRIMARY KEY,
    title              TEXT    NOT NULL,
    artist             TEXT    NOT NULL,
    album              TEXT    NOT NULL,
    album_artist       TEXT,
    track_number       INTEGER,
    duration_seconds   REAL,
    play_count         INTEGER NOT NULL DEFAULT 0,
    created_at_micros  INTEGER,
    last_played_micros INTEGER
)";

const SELECT_TRACKS: &str = "SELECT id, title, artist, album, album_artist, track_number,
    duration_seconds, play_count, created_at_micros, last_played_micros
    FROM track ORDER BY id";

/// Library stored in a SQLite database file.
#[derive(Debug)]
pub struct SqliteLibrary {
    conn: Connection,
}

impl SqliteLibrary {
    /// Open an existing library database.
    ///
    /// # Errors
    ///
    /// [`LibraryError::ServiceUnavailable`] when the file does not exist or
    /// is not a database.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening library database at {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| {
            LibraryError::ServiceUnavailable(format!(
                "cannot open library database {}: {err}",
                path.display()
            ))
        })?;

        Self::with_connection(conn)
    }

    /// Open the library database, creating the file and schema if needed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or the schema cannot be applied.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("Creating library database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// A throwaway library that lives only as long as the value.
    ///
    /// # Errors
    ///
    /// Fails only if SQLite itself cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, ())?;
        Ok(Self { conn })
    }

    /// Number of tracks in the library.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM track", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Insert or update `tracks` in one transaction. Returns how many rows
    /// were written.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures; nothing is written when one occurs.
    pub fn upsert_tracks(&mut self, tracks: &[Track]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO track (id, title, artist, album, album_artist, track_number,
                    duration_seconds, play_count, created_at_micros, last_played_micros)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    artist = excluded.artist,
                    album = excluded.album,
                    album_artist = excluded.album_artist,
                    track_number = excluded.track_number,
                    duration_seconds = excluded.duration_seconds,
                    play_count = excluded.play_count,
                    created_at_micros = excluded.created_at_micros,
                    last_played_micros = excluded.last_played_micros",
            )?;

            for track in tracks {
                trace!("Upserting track {}", track.id);
                written += stmt.execute(params![
                    track.id,
                    track.title,
                    track.artist,
                    track.album,
                    track.album_artist,
                    track.track_number,
                    track.duration_seconds,
                    track.play_count,
                    track.created_at_micros,
                    track.last_played_micros,
                ])?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    /// Load a library export (JSON array of songs) into the database.
    ///
    /// # Errors
    ///
    /// [`LibraryError::Io`] if the file cannot be read,
    /// [`LibraryError::Parse`] if it is not a valid export.
    pub fn import_export(&mut self, export_path: &Path) -> Result<usize> {
        info!("Importing library export {}", export_path.display());
        let raw = fs::read_to_string(export_path)?;
        let tracks = parse_export(&raw)?;
        self.upsert_tracks(&tracks)
    }
}

impl MusicLibrary for SqliteLibrary {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self.conn.prepare(SELECT_TRACKS)?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Fetched {} tracks from library database", tracks.len());
        Ok(tracks)
    }

    fn delete_tracks(&mut self, ids: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        let mut deleted = 0;

        {
            let mut stmt = tx.prepare("DELETE FROM track WHERE id = ?1")?;
            for id in ids {
                deleted += stmt.execute([id])?;
            }
        }

        tx.commit()?;

        if deleted < ids.len() {
            warn!(
                "Asked to delete {} tracks but only {} existed",
                ids.len(),
                deleted
            );
        }
        info!("Deleted {deleted} tracks");
        Ok(())
    }

    fn increment_play_count(
        &mut self,
        id: &str,
        plays: u32,
        last_played_micros: Option<i64>,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE track SET
                play_count = MIN(play_count + ?2, 4294967295),
                last_played_micros = MAX(COALESCE(last_played_micros, ?3), COALESCE(?3, last_played_micros))
             WHERE id = ?1",
            params![id, plays, last_played_micros],
        )?;

        if updated == 0 {
            warn!("Cannot add plays to unknown track {id}");
        }
        Ok(())
    }
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        album: row.get(3)?,
        album_artist: row.get(4)?,
        track_number: row.get(5)?,
        duration_seconds: row.get(6)?,
        play_count: row.get(7)?,
        created_at_micros: row.get(8)?,
        last_played_micros: row.get(9)?,
    })
}

/// Decode a library export into tracks.
///
/// # Errors
///
/// Returns the JSON error when `raw` is not an array of song objects.
pub fn parse_export(raw: &str) -> Result<Vec<Track>> {
    let songs: Vec<ExportedSong> = serde_json::from_str(raw)?;
    Ok(songs.into_iter().map(Track::from).collect())
}

/// One song object as it appears in a library export.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportedSong {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    album_artist: Option<String>,
    #[serde(default, deserialize_with = "lenient_integer")]
    track_number: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    duration_millis: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    play_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    recent_timestamp: Option<i64>,
}

impl From<ExportedSong> for Track {
    fn from(song: ExportedSong) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let duration_seconds = song
            .duration_millis
            .filter(|millis| *millis > 0)
            .map(|millis| millis as f64 / 1000.0);

        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            album: song.album,
            duration_seconds,
            album_artist: song.album_artist.filter(|artist| !artist.trim().is_empty()),
            track_number: song
                .track_number
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0),
            play_count: song
                .play_count
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_default(),
            created_at_micros: song.creation_timestamp,
            last_played_micros: song.recent_timestamp,
        }
    }
}

/// Accept integers encoded as JSON numbers or strings; anything unparsable
/// becomes `None`.
fn lenient_integer<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum Lenient {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde_json::Value),
    }

    #[allow(clippy::cast_possible_truncation)]
    let value = match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Int(n)) => Some(n),
        Some(Lenient::Float(f)) if f.is_finite() => Some(f as i64),
        Some(Lenient::Text(text)) => text.trim().parse().ok(),
        Some(Lenient::Float(_) | Lenient::Other(_)) | None => None,
    };
    Ok(value)
}
