//! Data models for timesync

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, Utc, DateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Error, Result};

// ============================================================================
// Entries, projects and tasks
// ============================================================================

/// A single time-tracking record as fetched from one system
///
/// `id` is only meaningful inside the system it came from; the same
/// real-world entry carries different ids on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub task_id: String,
    pub description: String,
    /// Wall-clock start, already normalized to local time by the adapter
    pub date: NaiveDateTime,
    pub duration_in_seconds: u64,
}

impl TimeEntry {
    pub fn new(
        id: impl Into<String>,
        task_id: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDateTime,
        duration_in_seconds: u64,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            description: description.into(),
            date,
            duration_in_seconds,
        }
    }

    /// Calendar day the entry belongs to
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    /// Copy of this entry attributed to another task
    pub fn with_task(&self, task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

// ============================================================================
// Date range
// ============================================================================

/// Inclusive range of calendar days driving both fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::validation(format!(
                "Date range start {} is after its end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Range covering a single day
    pub fn single_day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// Default range relative to `today`
    ///
    /// During the first ten days of a month the previous month is still
    /// being booked, so it is offered instead of the current one.
    pub fn default_for(today: NaiveDate) -> Self {
        let (first, last) = month_bounds(today);
        if today.day() <= 10 {
            let previous = first.pred_opt().unwrap_or(first);
            let (from, to) = month_bounds(previous);
            Self { from, to }
        } else {
            Self { from: first, to: last }
        }
    }

    /// Default range for the local current date
    pub fn current() -> Self {
        Self::default_for(Local::now().date_naive())
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

/// First and last day of the month containing `date`
fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date
        .checked_sub_days(Days::new(u64::from(date.day0())))
        .unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (first, last)
}

// ============================================================================
// Selection
// ============================================================================

/// Ids of the entries currently marked for the next submit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet(BTreeSet<String>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Keep only the entries of `entries` whose id is selected, in list order
    pub fn pick<'a>(&self, entries: &'a [TimeEntry]) -> Vec<&'a TimeEntry> {
        entries.iter().filter(|e| self.contains(&e.id)).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// A single create/delete that did not go through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub entry: TimeEntry,
    pub error: Error,
}

/// Aggregated outcome of one transaction execution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub created: Vec<TimeEntry>,
    pub failed_to_create: Vec<ItemFailure>,
    pub deleted: Vec<TimeEntry>,
    pub failed_to_delete: Vec<ItemFailure>,
}

impl TransactionResult {
    /// True when every queued item went through
    pub fn is_complete_success(&self) -> bool {
        self.failed_to_create.is_empty() && self.failed_to_delete.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.created.len()
            + self.failed_to_create.len()
            + self.deleted.len()
            + self.failed_to_delete.len()
    }
}

/// Persisted summary of an executed transaction
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncRun {
    pub id: String,
    pub target: String,
    pub created: i64,
    pub failed_to_create: i64,
    pub deleted: i64,
    pub failed_to_delete: i64,
    pub executed_at: DateTime<Utc>,
}

// ============================================================================
// Alerts and credentials
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing, dismissible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }
}

/// Opaque key/value credentials handed to an adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Fetch a required key or fail with an authentication error
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::auth(format!("Missing credential: {}", key)))
    }
}
