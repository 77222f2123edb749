//! # Duplicate Grouping
//!
//! Clusters a flat list of tracks into groups that represent the same
//! underlying song, then picks one survivor per group.
//!
//! ## Algorithm
//!
//! 1. Each track gets a normalized key (see [`crate::similarity::normalize_key`]).
//! 2. Every unordered pair not already in the same cluster is scored.
//! 3. Pairs scoring above the threshold are linked; identical keys are always
//!    linked. Clusters are the connected components of those links, so a
//!    group of three or more is transitive rather than all-pairs.
//! 4. Within a cluster the track with the most complete metadata is kept,
//!    with the lowest id as the final tie-break.
//!
//! The pass is quadratic in the number of tracks.
//!
//! ```
//! use tunedup::grouper::group;
//! use tunedup::track::Track;
//!
//! let tracks = vec![
//!     Track::new("a", "Song A", "Foo", "X"),
//!     Track::new("b", "song a", "foo", "x"),
//!     Track::new("c", "Totally Different", "Bar", "Y"),
//! ];
//!
//! let groups = group(&tracks, 90.0)?;
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].ids(), vec!["a", "b"]);
//! # Ok::<(), tunedup::error::GroupError>(())
//! ```

use crate::error::GroupError;
use crate::similarity::{normalize_key, Ratio, Scorer, PERFECT_SCORE};
use crate::track::Track;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Two or more tracks considered the same song.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    /// The survivor.
    pub keep: Track,
    /// Everything else in the group, sorted by id.
    pub delete: Vec<Track>,
    /// Mean pairwise score over all members, 0–100.
    pub similarity: f64,
}

impl DuplicateGroup {
    /// Number of tracks in the group, survivor included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delete.len() + 1
    }

    /// Always false: a group holds at least two tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All members, survivor first.
    pub fn members(&self) -> impl Iterator<Item = &Track> {
        std::iter::once(&self.keep).chain(self.delete.iter())
    }

    /// Ids of all members in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.members().map(|track| track.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of the tracks to delete.
    #[must_use]
    pub fn delete_ids(&self) -> Vec<String> {
        self.delete.iter().map(|track| track.id.clone()).collect()
    }
}

/// Configurable duplicate grouper.
///
/// [`group`] covers the common case; build a `DuplicateGrouper` to pick a
/// different scorer or to gate links on track duration.
pub struct DuplicateGrouper {
    scorer: Box<dyn Scorer>,
    duration_tolerance: Option<f64>,
}

impl Default for DuplicateGrouper {
    fn default() -> Self {
        Self {
            scorer: Box::new(Ratio),
            duration_tolerance: None,
        }
    }
}

impl std::fmt::Debug for DuplicateGrouper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateGrouper")
            .field("duration_tolerance", &self.duration_tolerance)
            .finish_non_exhaustive()
    }
}

impl DuplicateGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `scorer` instead of the default edit-distance ratio.
    #[must_use]
    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    #[must_use]
    pub fn with_boxed_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Never link two tracks whose known durations differ by more than
    /// `seconds`. Tracks without a duration are not affected.
    #[must_use]
    pub fn with_duration_tolerance(mut self, seconds: f64) -> Self {
        self.duration_tolerance = Some(seconds.abs());
        self
    }

    /// Group `tracks` into duplicate clusters.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::InvalidThreshold`] when `similarity_threshold`
    /// is NaN or outside `0..=100`. The check happens before any scoring.
    pub fn group(
        &self,
        tracks: &[Track],
        similarity_threshold: f64,
    ) -> Result<Vec<DuplicateGroup>, GroupError> {
        validate_threshold(similarity_threshold)?;

        let keys: Vec<String> = tracks.iter().map(normalize_key).collect();
        let mut clusters = DisjointSet::new(tracks.len());
        let mut comparisons = 0usize;

        // TODO: split the outer loop across a rayon pool once libraries of
        // tens of thousands of tracks make this pass the bottleneck.
        for i in 0..tracks.len() {
            for j in (i + 1)..tracks.len() {
                if clusters.find(i) == clusters.find(j) {
                    continue;
                }
                comparisons += 1;

                if self.linked(&tracks[i], &tracks[j], &keys[i], &keys[j], similarity_threshold) {
                    trace!("Linking `{}' and `{}'", tracks[i].id, tracks[j].id);
                    clusters.union(i, j);
                }
            }
        }

        let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for index in 0..tracks.len() {
            components.entry(clusters.find(index)).or_default().push(index);
        }

        let mut groups: Vec<DuplicateGroup> = components
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| self.build_group(tracks, &keys, members))
            .collect();
        groups.sort_by(|a, b| a.ids()[0].cmp(&b.ids()[0]));

        debug!(
            "Grouped {} tracks into {} duplicate groups ({} comparisons)",
            tracks.len(),
            groups.len(),
            comparisons
        );

        Ok(groups)
    }

    fn linked(&self, a: &Track, b: &Track, key_a: &str, key_b: &str, threshold: f64) -> bool {
        if let (Some(tolerance), Some(da), Some(db)) =
            (self.duration_tolerance, a.duration_seconds, b.duration_seconds)
        {
            if (da - db).abs() > tolerance {
                return false;
            }
        }

        if key_a == key_b {
            return true;
        }

        let score = self.scorer.score(key_a, key_b);
        score > threshold || score >= PERFECT_SCORE
    }

    fn build_group(&self, tracks: &[Track], keys: &[String], mut members: Vec<usize>) -> DuplicateGroup {
        members.sort_by(|&a, &b| tracks[a].id.cmp(&tracks[b].id));

        let mut pair_total = 0.0;
        let mut pairs = 0usize;
        for (offset, &a) in members.iter().enumerate() {
            for &b in &members[offset + 1..] {
                pair_total += self.scorer.score(&keys[a], &keys[b]);
                pairs += 1;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let similarity = pair_total / pairs as f64;

        let keep_index = members
            .iter()
            .copied()
            .min_by(|&a, &b| keep_order(&tracks[a], &tracks[b]))
            .unwrap_or(members[0]);

        DuplicateGroup {
            keep: tracks[keep_index].clone(),
            delete: members
                .iter()
                .filter(|&&index| index != keep_index)
                .map(|&index| tracks[index].clone())
                .collect(),
            similarity,
        }
    }
}

/// Group `tracks` with the default scorer and no duration gate.
///
/// # Errors
///
/// Returns [`GroupError::InvalidThreshold`] when `similarity_threshold` is
/// NaN or outside `0..=100`.
pub fn group(tracks: &[Track], similarity_threshold: f64) -> Result<Vec<DuplicateGroup>, GroupError> {
    DuplicateGrouper::default().group(tracks, similarity_threshold)
}

/// Reject thresholds outside `0..=100`.
///
/// # Errors
///
/// Returns [`GroupError::InvalidThreshold`] for NaN or out-of-range values.
pub fn validate_threshold(threshold: f64) -> Result<(), GroupError> {
    if (0.0..=PERFECT_SCORE).contains(&threshold) {
        Ok(())
    } else {
        Err(GroupError::InvalidThreshold(threshold))
    }
}

/// Survivor ordering: most complete metadata first, then lowest id.
fn keep_order(a: &Track, b: &Track) -> Ordering {
    b.completeness()
        .cmp(&a.completeness())
        .then_with(|| a.id.cmp(&b.id))
}

/// Union-find over track indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = index;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            Ordering::Less => self.parent[root_a] = root_b,
            Ordering::Greater => self.parent[root_b] = root_a,
            Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }
}
