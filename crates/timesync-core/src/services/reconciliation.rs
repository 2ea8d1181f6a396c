//! Reconciliation of source and target entry sets
//!
//! Pure computations over the two fetched lists. The controller turns them
//! into default selections after every fetch.

use serde::Serialize;

use super::matcher::has_counterpart;
use crate::models::{SelectionSet, TimeEntry};

/// Ids of source entries without a similar entry on the target
pub fn source_not_yet_synced(source: &[TimeEntry], target: &[TimeEntry]) -> Vec<String> {
    source
        .iter()
        .filter(|entry| !has_counterpart(entry, target))
        .map(|entry| entry.id.clone())
        .collect()
}

/// Ids of target entries without a similar entry in the source
pub fn target_not_in_source(target: &[TimeEntry], source: &[TimeEntry]) -> Vec<String> {
    target
        .iter()
        .filter(|entry| !has_counterpart(entry, source))
        .map(|entry| entry.id.clone())
        .collect()
}

/// Default selections for both sides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Differences {
    /// Source entries to offer for creation
    pub to_create: SelectionSet,
    /// Target entries to offer for deletion
    pub to_delete: SelectionSet,
}

impl Differences {
    /// Compute default selections from whatever each side has loaded
    ///
    /// Nothing is selected unless both sides hold a fetched list: comparing
    /// against a side that never loaded would flag every entry. In particular
    /// an unloaded target leaves the source selection empty rather than
    /// selecting every source entry for creation.
    pub fn compute(source: Option<&[TimeEntry]>, target: Option<&[TimeEntry]>) -> Self {
        match (source, target) {
            (Some(source), Some(target)) => Self {
                to_create: source_not_yet_synced(source, target).into_iter().collect(),
                to_delete: target_not_in_source(target, source).into_iter().collect(),
            },
            _ => Self::default(),
        }
    }
}
