//! Human-readable descriptions of duplicate groups.

use crate::grouper::DuplicateGroup;
use std::io::{self, Write};

/// Groups ordered by similarity, most certain first. Ties keep their
/// original order.
#[must_use]
pub fn sorted_by_similarity(groups: &[DuplicateGroup]) -> Vec<&DuplicateGroup> {
    let mut sorted: Vec<&DuplicateGroup> = groups.iter().collect();
    sorted.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    sorted
}

/// Write one group: size, members, and similarity.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_group(out: &mut impl Write, group: &DuplicateGroup) -> io::Result<()> {
    writeln!(out, "Group Size: {}", group.len())?;
    writeln!(out, " - keep   {}", group.keep.summary())?;
    for track in &group.delete {
        writeln!(out, " - delete {}", track.summary())?;
    }
    writeln!(out, "{}", "-".repeat(32))?;
    writeln!(out, "Group similarity: {:05.2}%", group.similarity)?;
    writeln!(out, "{}", "=".repeat(32))
}

/// Write every group, most similar first, followed by the group count.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_groups(out: &mut impl Write, groups: &[DuplicateGroup]) -> io::Result<()> {
    for group in sorted_by_similarity(groups) {
        write_group(out, group)?;
    }
    writeln!(out, "Total Groups: {}", groups.len())
}

/// The keep/delete decision for a group, as shown before asking for
/// confirmation.
#[must_use]
pub fn decision(group: &DuplicateGroup) -> String {
    let mut text = format!("Keep:\n - {}\nDelete:\n", group.keep.summary());
    for track in &group.delete {
        text.push_str(&format!(" - {}\n", track.summary()));
    }
    text
}
