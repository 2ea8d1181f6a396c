//! Entry matching
//!
//! The two systems never share an identifier, so "already synchronized" is
//! decided on content: same trimmed description, same calendar day, and
//! durations within a small tolerance that absorbs each service's own
//! rounding.

use crate::models::TimeEntry;

/// Durations must differ by strictly less than this many seconds
pub const DURATION_TOLERANCE_SECS: u64 = 60;

/// Whether `a` and `b` describe the same real-world entry
///
/// Symmetric. A heuristic, not an identity: in pathological data several
/// entries on one side may match the same entry on the other.
pub fn are_similar(a: &TimeEntry, b: &TimeEntry) -> bool {
    a.description.trim() == b.description.trim()
        && a.day() == b.day()
        && a.duration_in_seconds.abs_diff(b.duration_in_seconds) < DURATION_TOLERANCE_SECS
}

/// Whether any entry of `candidates` matches `entry`
pub fn has_counterpart(entry: &TimeEntry, candidates: &[TimeEntry]) -> bool {
    candidates.iter().any(|candidate| are_similar(entry, candidate))
}
