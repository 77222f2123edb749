//! # Track Model
//!
//! A [`Track`] is a read-only snapshot of one uploaded song as reported by the
//! music library. Only `title`, `artist` and `album` take part in duplicate
//! detection; `duration_seconds` is an optional secondary signal. The other
//! fields are carried along for reporting and for play-count merging.

use serde::{Deserialize, Serialize};

/// One uploaded song.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque identifier assigned by the library. Required for deletion.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds, when the library knows it.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub play_count: u32,
    /// Upload time, microseconds since the Unix epoch.
    #[serde(default)]
    pub created_at_micros: Option<i64>,
    /// Last play time, microseconds since the Unix epoch.
    #[serde(default)]
    pub last_played_micros: Option<i64>,
}

impl Track {
    /// Create a track from the fields that matter for grouping.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_play_count(mut self, plays: u32) -> Self {
        self.play_count = plays;
        self
    }

    /// How complete the comparable metadata is, as
    /// `(non-empty fields, total characters)`.
    ///
    /// Whitespace-only fields count as empty. Larger is more complete, so the
    /// tuple can be compared directly when choosing which copy to keep.
    #[must_use]
    pub fn completeness(&self) -> (usize, usize) {
        [&self.title, &self.artist, &self.album]
            .iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .fold((0, 0), |(fields, chars), field| {
                (fields + 1, chars + field.chars().count())
            })
    }

    /// One-line human readable description.
    ///
    /// ```
    /// use tunedup::track::Track;
    ///
    /// let track = Track {
    ///     track_number: Some(6),
    ///     duration_seconds: Some(418.0),
    ///     play_count: 7,
    ///     ..Track::new("5924d75a", "Haxprocess", "Opeth", "Heritage")
    /// };
    /// assert_eq!(
    ///     track.summary(),
    ///     "6 - Opeth - Heritage - Haxprocess [00:06:58] (7 plays)"
    /// );
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        let track_number = self
            .track_number
            .map_or_else(|| "?".to_string(), |n| n.to_string());

        format!(
            "{} - {} - {} - {} [{}] ({} plays)",
            track_number,
            self.artist,
            self.album,
            self.title,
            format_duration(self.duration_seconds),
            self.play_count
        )
    }
}

/// Render seconds as `HH:MM:SS`, or `??:??:??` when unknown.
#[must_use]
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(secs) if secs.is_finite() && secs >= 0.0 => {
            let total = secs.round() as u64;
            let (minutes, seconds) = (total / 60, total % 60);
            let (hours, minutes) = (minutes / 60, minutes % 60);
            format!("{hours:02}:{minutes:02}:{seconds:02}")
        }
        _ => "??:??:??".to_string(),
    }
}
