//! Key normalization and fuzzy similarity scoring.
//!
//! Every scorer returns a value in `0.0..=100.0`, is symmetric
//! (`score(a, b) == score(b, a)`) and reflexive (`score(a, a) == 100.0`).
//! The grouper relies on nothing else, so any implementation honouring that
//! contract can be swapped in, including a plain closure.

use crate::track::Track;
use clap::ValueEnum;
use std::fmt;

/// Score reported for identical keys.
pub const PERFECT_SCORE: f64 = 100.0;

/// Lower-case `text`, drop punctuation and collapse whitespace runs.
///
/// Total over any input; the empty string normalizes to itself.
///
/// ```
/// use tunedup::similarity::normalize_text;
///
/// assert_eq!(normalize_text("  Don't Stop   (Remastered) "), "dont stop remastered");
/// assert_eq!(normalize_text(""), "");
/// ```
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The comparable key of a track: title, artist and album, normalized as one
/// string.
#[must_use]
pub fn normalize_key(track: &Track) -> String {
    normalize_text(&format!("{} {} {}", track.title, track.artist, track.album))
}

/// A symmetric, reflexive similarity function over normalized keys.
pub trait Scorer {
    /// Similarity of `a` and `b` on a 0–100 scale.
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Edit-distance ratio: normalized Levenshtein similarity scaled to 0–100.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ratio;

impl Scorer for Ratio {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return PERFECT_SCORE;
        }
        strsim::normalized_levenshtein(a, b) * PERFECT_SCORE
    }
}

/// Ratio of the keys after sorting their words, so that reordered metadata
/// ("Artist Title" vs "Title Artist") still scores high.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl TokenSortRatio {
    fn sorted_tokens(text: &str) -> String {
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
}

impl Scorer for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        Ratio.score(&Self::sorted_tokens(a), &Self::sorted_tokens(b))
    }
}

/// Scorers selectable from the command line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ScorerKind {
    /// Edit-distance ratio over the whole key
    #[default]
    Ratio,
    /// Edit-distance ratio after sorting words
    TokenSort,
}

impl ScorerKind {
    #[must_use]
    pub fn scorer(self) -> Box<dyn Scorer> {
        match self {
            Self::Ratio => Box::new(Ratio),
            Self::TokenSort => Box::new(TokenSortRatio),
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio => write!(f, "ratio"),
            Self::TokenSort => write!(f, "token-sort"),
        }
    }
}
