//! The music library client seam.
//!
//! Grouping never talks to a library; the driver fetches tracks through a
//! [`MusicLibrary`] handle, groups them, and hands the ids to delete back to
//! the same handle. The handle is created once in `main` and passed down
//! explicitly.

use crate::error::LibraryError;
use crate::track::Track;

pub type Result<T> = std::result::Result<T, LibraryError>;

/// Operations the deduplicator needs from a music library.
pub trait MusicLibrary {
    /// Fetch every uploaded track.
    ///
    /// Fails with [`LibraryError::ServiceUnavailable`] or
    /// [`LibraryError::Authentication`]; callers treat both as fatal.
    fn fetch_all_tracks(&self) -> Result<Vec<Track>>;

    /// Delete the given tracks. Best-effort: ids the library does not know
    /// are ignored.
    fn delete_tracks(&mut self, ids: &[String]) -> Result<()>;

    /// Add `plays` to a track's play count and move its last-played time
    /// forward to `last_played_micros` when that is later.
    fn increment_play_count(
        &mut self,
        id: &str,
        plays: u32,
        last_played_micros: Option<i64>,
    ) -> Result<()>;
}

/// In-memory library, handy for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    tracks: Vec<Track>,
}

impl MemoryLibrary {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

impl MusicLibrary for MemoryLibrary {
    fn fetch_all_tracks(&self) -> Result<Vec<Track>> {
        Ok(self.tracks.clone())
    }

    fn delete_tracks(&mut self, ids: &[String]) -> Result<()> {
        self.tracks.retain(|track| !ids.contains(&track.id));
        Ok(())
    }

    fn increment_play_count(
        &mut self,
        id: &str,
        plays: u32,
        last_played_micros: Option<i64>,
    ) -> Result<()> {
        if let Some(track) = self.tracks.iter_mut().find(|track| track.id == id) {
            track.play_count = track.play_count.saturating_add(plays);
            track.last_played_micros = track.last_played_micros.max(last_played_micros);
        }
        Ok(())
    }
}
