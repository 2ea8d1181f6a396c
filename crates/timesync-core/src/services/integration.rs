//! Integration controller
//!
//! Root object of a sync session between one source and one target.
//!
//! ```text
//!               ┌──────────────────────────────┐
//!               │         Integration          │
//!               │  date range · refresh · submit│
//!               └──────┬─────────────────┬─────┘
//!                      │                 │
//!              ┌───────▼──────┐   ┌──────▼───────┐
//!              │  SourceSide  │   │  TargetSide  │
//!              │ EntryReader  │   │ EntryWriter  │
//!              └──────────────┘   └──────────────┘
//!                      │                 │
//!                      └──► Differences ◄┘ ──► SyncTransaction
//! ```
//!
//! Fetches on both sides run concurrently; default selections are
//! recomputed from whatever each side holds after every fetch.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::adapters::{EntryReader, EntryWriter};
use super::alert::AlertChannel;
use super::async_op::{AsyncOperation, AsyncState, Outcome};
use super::reconciliation::Differences;
use super::side::{SideSnapshot, SourceSide};
use super::storage::SettingsStore;
use super::target::{TargetSide, TargetSnapshot};
use super::transaction::SyncTransaction;
use crate::error::{Error, Result};
use crate::models::{Alert, Credentials, DateRange, SelectionSet, TransactionResult};
use crate::utils::lock;

/// Serializable view of the whole session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSnapshot {
    pub date_range: DateRange,
    pub source: SideSnapshot,
    pub target: TargetSnapshot,
    pub is_submitable: bool,
    pub refresh: AsyncState<()>,
    pub submission: AsyncState<TransactionResult>,
    pub alert: Option<Alert>,
}

pub struct Integration {
    source: Arc<SourceSide>,
    target: Arc<TargetSide>,
    alerts: AlertChannel,
    date_range: Mutex<DateRange>,
    refresh: AsyncOperation<()>,
    submission: AsyncOperation<TransactionResult>,
}

impl Integration {
    /// Build a session over `source` and `target`, starting on the default range
    pub fn new(
        source: Arc<dyn EntryReader>,
        target: Arc<dyn EntryWriter>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let alerts = AlertChannel::new();
        Self {
            source: Arc::new(SourceSide::new(source, store.clone(), alerts.clone())),
            target: Arc::new(TargetSide::new(target, store, alerts.clone())),
            refresh: AsyncOperation::with_alerts("refresh", alerts.clone()),
            submission: AsyncOperation::with_alerts("submission", alerts.clone()),
            alerts,
            date_range: Mutex::new(DateRange::current()),
        }
    }

    /// Start on `range` instead of the default
    pub fn with_date_range(self, range: DateRange) -> Self {
        *lock(&self.date_range) = range;
        self
    }

    pub fn source(&self) -> &SourceSide {
        &self.source
    }

    pub fn target(&self) -> &TargetSide {
        &self.target
    }

    pub fn alerts(&self) -> &AlertChannel {
        &self.alerts
    }

    pub fn date_range(&self) -> DateRange {
        *lock(&self.date_range)
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Authenticate the source and fetch its entries
    pub async fn authenticate_source(&self, credentials: Credentials) -> Outcome<()> {
        let outcome = self.source.authenticate(credentials).await;
        if outcome.is_success() {
            self.fetch_source().await;
        }
        outcome
    }

    /// Authenticate the target, load its catalog and fetch its entries once
    /// a task is selected
    pub async fn authenticate_target(&self, credentials: Credentials) -> Outcome<()> {
        let outcome = self.target.authenticate(credentials).await;
        if outcome.is_success() && self.target.selected_task().is_some() {
            self.fetch_target().await;
        }
        outcome
    }

    /// Re-authenticate both sides from persisted credentials
    pub async fn load_stored_credentials(&self) {
        let source = async {
            if let Some(credentials) = self.source.stored_credentials().await {
                log::info!("[integration] restoring {} session", self.source.name());
                self.authenticate_source(credentials).await;
            }
        };
        let target = async {
            if let Some(credentials) = self.target.stored_credentials().await {
                log::info!("[integration] restoring {} session", self.target.name());
                self.authenticate_target(credentials).await;
            }
        };
        tokio::join!(source, target);
    }

    pub async fn forget_source_credentials(&self) {
        self.source.forget_credentials().await;
        self.select_differences();
    }

    pub async fn forget_target_credentials(&self) {
        self.target.forget_credentials().await;
        self.select_differences();
    }

    /// Switch the target project; fetches entries if a stored task was restored
    pub async fn select_project(&self, project_id: &str) {
        if self.target.select_project(project_id).await {
            self.select_differences();
            if self.target.selected_task().is_some() {
                self.fetch_target().await;
            }
        }
    }

    pub async fn select_task(&self, task_id: &str) {
        if self.target.select_task(task_id).await {
            self.fetch_target().await;
        }
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Replace the date range and re-fetch every side that can fetch
    pub async fn set_date_range(&self, range: DateRange) {
        *lock(&self.date_range) = range;
        log::info!("[integration] date range set to {}", range);

        let target = async {
            if self.target.is_authenticated() && self.target.selected_task().is_some() {
                self.fetch_target().await;
            }
        };
        let source = async {
            if self.source.is_authenticated() {
                self.fetch_source().await;
            }
        };
        tokio::join!(target, source);
    }

    /// Fetch both sides for the current range, then recompute selections once
    pub async fn refresh(&self) -> Outcome<()> {
        let range = self.date_range();
        let outcome = self
            .refresh
            .run(async {
                tokio::join!(
                    self.source.fetch_entries(range, None),
                    self.target.fetch_entries(range)
                );
                Ok(())
            })
            .await;
        if outcome.is_success() {
            self.select_differences();
        }
        outcome
    }

    pub async fn fetch_source(&self) -> Outcome<()> {
        let outcome = self.source.fetch_entries(self.date_range(), None).await;
        self.settle_fetch(outcome)
    }

    pub async fn fetch_target(&self) -> Outcome<()> {
        let outcome = self.target.fetch_entries(self.date_range()).await;
        self.settle_fetch(outcome)
    }

    fn settle_fetch<T>(&self, outcome: Outcome<T>) -> Outcome<()> {
        match outcome {
            Outcome::Succeeded(_) => {
                self.select_differences();
                Outcome::Succeeded(())
            }
            Outcome::Failed(err) => Outcome::Failed(err),
            Outcome::Superseded => Outcome::Superseded,
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Reset both selections to the computed defaults
    pub fn select_differences(&self) -> Differences {
        let source = self.source.entries();
        let target = self.target.entries();
        let differences = Differences::compute(source.as_deref(), target.as_deref());

        log::debug!(
            "[integration] selected {} to create, {} to delete",
            differences.to_create.len(),
            differences.to_delete.len()
        );
        self.source.set_selection(differences.to_create.clone());
        self.target.set_selection(differences.to_delete.clone());
        differences
    }

    pub fn set_source_selection(&self, selection: SelectionSet) {
        self.source.set_selection(selection);
    }

    pub fn set_target_selection(&self, selection: SelectionSet) {
        self.target.set_selection(selection);
    }

    /// Flip whether selected target entries are deleted on submit
    pub fn toggle_deletion_allowed(&self) -> bool {
        let allowed = self.target.toggle_deletion_allowed();
        self.select_differences();
        allowed
    }

    pub fn is_submitable(&self) -> bool {
        self.source.is_authenticated()
            && self.target.is_authenticated()
            && self.target.selected_task().is_some()
            && (!self.source.selection().is_empty()
                || (self.target.deletion_allowed() && !self.target.selection().is_empty()))
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Apply the current selections to the target
    ///
    /// The target is re-fetched afterwards whatever the outcome.
    pub async fn submit(&self) -> Outcome<TransactionResult> {
        let outcome = self.submission.run(self.execute_submission()).await;
        if let Outcome::Succeeded(result) = &outcome {
            self.publish_summary(result);
        }

        if self.target.is_authenticated() && self.target.selected_task().is_some() {
            self.fetch_target().await;
        }
        outcome
    }

    pub fn last_result(&self) -> Option<TransactionResult> {
        self.submission.value()
    }

    /// Transaction the next submit would execute
    pub fn plan(&self) -> Result<SyncTransaction> {
        if !self.source.is_authenticated() {
            return Err(Error::precondition(format!(
                "{} hasn't been authenticated yet",
                self.source.name()
            )));
        }
        if !self.target.is_authenticated() {
            return Err(Error::precondition(format!(
                "{} hasn't been authenticated yet",
                self.target.name()
            )));
        }
        let task_id = self.target.selected_task().ok_or_else(|| {
            Error::precondition(format!(
                "Please select the target task in {}.",
                self.target.name()
            ))
        })?;

        let mut transaction = SyncTransaction::new(self.target.adapter());
        if self.target.deletion_allowed() {
            for entry in self.target.selected_entries() {
                transaction.delete(entry);
            }
        }
        for entry in self.source.selected_entries() {
            transaction.create(entry.with_task(task_id.as_str()));
        }
        Ok(transaction)
    }

    async fn execute_submission(&self) -> Result<TransactionResult> {
        let mut transaction = self.plan()?;
        transaction.execute().await
    }

    fn publish_summary(&self, result: &TransactionResult) {
        let target = self.target.name();
        for failure in &result.failed_to_delete {
            log::error!(
                "[integration] failed to delete {} from {}: {}",
                failure.entry.id,
                target,
                failure.error
            );
        }
        for failure in &result.failed_to_create {
            log::error!(
                "[integration] failed to create \"{}\" in {}: {}",
                failure.entry.description,
                target,
                failure.error
            );
        }

        let alert = match (result.failed_to_create.len(), result.failed_to_delete.len()) {
            (0, 0) => Alert::success(format!("Successfully applied all changes to {}", target)),
            (created, 0) => Alert::warning(format!(
                "Failed to create {} entries in {}. See the log for more details.",
                created, target
            )),
            (0, deleted) => Alert::warning(format!(
                "Failed to delete {} entries from {}. See the log for more details.",
                deleted, target
            )),
            (created, deleted) => Alert::warning(format!(
                "Failed to create {}, and delete {} entries from {}. See the log for more details.",
                created, deleted, target
            )),
        };
        log::info!(
            "[integration] applied {} creations and {} deletions to {}",
            result.created.len(),
            result.deleted.len(),
            target
        );
        self.alerts.publish(alert);
    }

    pub fn snapshot(&self) -> IntegrationSnapshot {
        IntegrationSnapshot {
            date_range: self.date_range(),
            source: self.source.snapshot(),
            target: self.target.snapshot(),
            is_submitable: self.is_submitable(),
            refresh: self.refresh.snapshot(),
            submission: self.submission.snapshot(),
            alert: self.alerts.current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertKind, TimeEntry};
    use crate::services::storage::{self, MemoryStore};
    use crate::services::testing::FakeTracker;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn january() -> DateRange {
        DateRange::new(at(1, 0).date(), at(31, 0).date()).unwrap()
    }

    struct Fixture {
        source: Arc<FakeTracker>,
        target: Arc<FakeTracker>,
        store: Arc<MemoryStore>,
        integration: Integration,
    }

    fn fixture(source_entries: Vec<TimeEntry>, target_entries: Vec<TimeEntry>) -> Fixture {
        let source = Arc::new(FakeTracker::new("Toggl").with_entries(source_entries));
        let target = Arc::new(
            FakeTracker::new("Tick")
                .with_task("p1", "task-1")
                .with_entries(target_entries),
        );
        let store = Arc::new(MemoryStore::new());
        let integration = Integration::new(source.clone(), target.clone(), store.clone())
            .with_date_range(january());
        Fixture {
            source,
            target,
            store,
            integration,
        }
    }

    fn ok() -> Credentials {
        Credentials::new().with("token", "ok")
    }

    async fn connect(fixture: &Fixture) {
        let integration = &fixture.integration;
        integration.authenticate_source(ok()).await;
        integration.authenticate_target(ok()).await;
        integration.select_project("p1").await;
        integration.select_task("task-1").await;
    }

    fn ids(selection: SelectionSet) -> Vec<String> {
        selection.iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_connect_selects_differences() {
        let f = fixture(
            vec![
                TimeEntry::new("s1", "", "Standup", at(5, 9), 900),
                TimeEntry::new("s2", "", "Review", at(5, 10), 1800),
            ],
            vec![
                TimeEntry::new("t1", "task-1", "Standup", at(5, 14), 930),
                TimeEntry::new("t2", "task-1", "Old", at(6, 9), 600),
            ],
        );

        connect(&f).await;

        assert_eq!(ids(f.integration.source().selection()), vec!["s2"]);
        assert_eq!(ids(f.integration.target().selection()), vec!["t2"]);
        assert!(f.integration.is_submitable());
    }

    #[tokio::test]
    async fn test_submit_retags_and_skips_deletes_when_disallowed() {
        let f = fixture(
            vec![TimeEntry::new("s1", "toggl-project", "Review", at(5, 10), 1800)],
            vec![TimeEntry::new("t2", "task-1", "Old", at(6, 9), 600)],
        );
        connect(&f).await;

        let result = f.integration.submit().await.ok().unwrap();

        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].task_id, "task-1");
        assert!(result.deleted.is_empty());
        assert_eq!(f.target.calls(), vec!["create:s1"]);
        assert_eq!(
            f.integration.alerts().current(),
            Some(Alert::success("Successfully applied all changes to Tick"))
        );
    }

    #[tokio::test]
    async fn test_submit_deletes_when_allowed() {
        let f = fixture(
            vec![TimeEntry::new("s1", "", "Standup", at(5, 9), 900)],
            vec![
                TimeEntry::new("t1", "task-1", "Standup", at(5, 9), 900),
                TimeEntry::new("t2", "task-1", "Old", at(6, 9), 600),
            ],
        );
        connect(&f).await;
        assert!(!f.integration.is_submitable());

        assert!(f.integration.toggle_deletion_allowed());
        assert_eq!(ids(f.integration.target().selection()), vec!["t2"]);
        assert!(f.integration.is_submitable());

        let result = f.integration.submit().await.ok().unwrap();

        assert_eq!(result.deleted.len(), 1);
        assert_eq!(f.target.calls(), vec!["delete:t2"]);
        assert!(f.integration.target().selection().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_publishes_summary_and_refetches() {
        let f = fixture(
            vec![
                TimeEntry::new("s1", "", "A", at(5, 9), 900),
                TimeEntry::new("s2", "", "B", at(5, 10), 900),
                TimeEntry::new("s3", "", "C", at(5, 11), 900),
            ],
            vec![],
        );
        connect(&f).await;
        f.target.fail_create("s2");
        let fetches = f.target.fetch_count();

        let result = f.integration.submit().await.ok().unwrap();

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.failed_to_create.len(), 1);
        let alert = f.integration.alerts().current().unwrap();
        assert_eq!(alert.kind, AlertKind::Warning);
        assert_eq!(
            alert.message,
            "Failed to create 1 entries in Tick. See the log for more details."
        );
        assert_eq!(f.target.fetch_count(), fetches + 1);
        assert_eq!(ids(f.integration.source().selection()), vec!["s2"]);
        assert_eq!(f.integration.last_result(), Some(result));
    }

    #[tokio::test]
    async fn test_mixed_failures_summary() {
        let f = fixture(
            vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)],
            vec![TimeEntry::new("t1", "task-1", "Old", at(6, 9), 600)],
        );
        connect(&f).await;
        f.integration.toggle_deletion_allowed();
        f.target.fail_create("s1");
        f.target.fail_delete("t1");

        f.integration.submit().await;

        assert_eq!(
            f.integration.alerts().current().unwrap().message,
            "Failed to create 1, and delete 1 entries from Tick. See the log for more details."
        );
    }

    #[tokio::test]
    async fn test_submit_without_task_is_rejected() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        f.integration.authenticate_source(ok()).await;
        f.integration.authenticate_target(ok()).await;

        let outcome = f.integration.submit().await;

        assert!(matches!(outcome, Outcome::Failed(Error::Precondition(_))));
        assert!(f.target.calls().is_empty());
        assert_eq!(f.integration.alerts().current().unwrap().kind, AlertKind::Error);
    }

    #[tokio::test]
    async fn test_selection_needs_both_sides() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        f.integration.authenticate_source(ok()).await;

        assert!(f.integration.source().entries().is_some());
        assert!(f.integration.source().selection().is_empty());
        assert!(!f.integration.is_submitable());
    }

    #[tokio::test]
    async fn test_not_submitable_without_task() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        f.integration.authenticate_source(ok()).await;
        f.integration.authenticate_target(ok()).await;
        f.integration.select_project("p1").await;
        f.integration.set_source_selection(["s1"].into_iter().collect());

        assert!(f.integration.target().selected_task().is_none());
        assert!(!f.integration.is_submitable());
    }

    #[tokio::test]
    async fn test_refresh_fetches_both_sides_once() {
        let f = fixture(vec![], vec![]);
        connect(&f).await;
        let (source_before, target_before) = (f.source.fetch_count(), f.target.fetch_count());
        f.source.set_entries(vec![TimeEntry::new("s9", "", "New", at(8, 9), 600)]);

        assert!(f.integration.refresh().await.is_success());

        assert_eq!(f.source.fetch_count(), source_before + 1);
        assert_eq!(f.target.fetch_count(), target_before + 1);
        assert_eq!(ids(f.integration.source().selection()), vec!["s9"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_selection_inputs() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        connect(&f).await;
        f.source.fail_fetch(Some(Error::network("offline")));

        f.integration.refresh().await;

        assert_eq!(
            f.integration.source().entries_state().error,
            Some(Error::network("offline"))
        );
        assert_eq!(ids(f.integration.source().selection()), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_set_date_range_refetches_authenticated_sides() {
        let f = fixture(
            vec![
                TimeEntry::new("s1", "", "A", at(5, 9), 900),
                TimeEntry::new("s2", "", "B", at(20, 9), 900),
            ],
            vec![],
        );
        connect(&f).await;

        let range = DateRange::new(at(15, 0).date(), at(31, 0).date()).unwrap();
        f.integration.set_date_range(range).await;

        assert_eq!(f.integration.date_range(), range);
        assert_eq!(ids(f.integration.source().selection()), vec!["s2"]);
    }

    #[tokio::test]
    async fn test_overlapping_date_ranges_keep_the_latest() {
        let f = fixture(
            vec![
                TimeEntry::new("s1", "", "A", at(5, 9), 900),
                TimeEntry::new("s2", "", "B", at(20, 9), 900),
            ],
            vec![],
        );
        connect(&f).await;
        let early = DateRange::new(at(1, 0).date(), at(14, 0).date()).unwrap();
        let late = DateRange::new(at(15, 0).date(), at(31, 0).date()).unwrap();
        f.source.delay_next_fetch(5);

        tokio::join!(
            f.integration.set_date_range(early),
            f.integration.set_date_range(late)
        );

        assert_eq!(f.integration.date_range(), late);
        let held: Vec<String> = f
            .integration
            .source()
            .entries()
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(held, vec!["s2"]);
        assert_eq!(ids(f.integration.source().selection()), vec!["s2"]);
        assert!(!f.integration.source().entries_state().pending);
    }

    #[tokio::test]
    async fn test_select_differences_is_idempotent() {
        let f = fixture(
            vec![
                TimeEntry::new("s1", "", "Standup", at(5, 9), 900),
                TimeEntry::new("s2", "", "Review", at(5, 10), 1800),
            ],
            vec![
                TimeEntry::new("t1", "task-1", "Standup", at(5, 14), 930),
                TimeEntry::new("t2", "task-1", "Offsite", at(8, 9), 7200),
            ],
        );
        connect(&f).await;

        let first = f.integration.select_differences();
        let source_first = f.integration.source().selection();
        let target_first = f.integration.target().selection();
        let second = f.integration.select_differences();

        assert_eq!(first, second);
        assert_eq!(f.integration.source().selection(), source_first);
        assert_eq!(f.integration.target().selection(), target_first);
        assert_eq!(ids(source_first), vec!["s2"]);
        assert_eq!(ids(target_first), vec!["t2"]);
    }

    #[tokio::test]
    async fn test_set_date_range_skips_target_without_task() {
        let f = fixture(vec![], vec![]);
        f.integration.authenticate_target(ok()).await;
        let fetches = f.target.fetch_count();

        f.integration.set_date_range(january()).await;

        assert_eq!(f.target.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn test_load_stored_credentials_restores_sessions() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        storage::save(f.store.as_ref(), "Toggl", &ok()).await.unwrap();
        storage::save(f.store.as_ref(), "Tick", &ok()).await.unwrap();
        storage::save(f.store.as_ref(), "Tick_selectedProject", &"p1").await.unwrap();
        storage::save(f.store.as_ref(), "Tick_selectedTask", &"task-1").await.unwrap();

        f.integration.load_stored_credentials().await;

        assert!(f.integration.source().is_authenticated());
        assert!(f.integration.target().is_authenticated());
        assert_eq!(f.integration.target().selected_task().as_deref(), Some("task-1"));
        assert_eq!(ids(f.integration.source().selection()), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_forget_target_clears_selection() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        connect(&f).await;

        f.integration.forget_target_credentials().await;

        assert!(f.integration.source().selection().is_empty());
        assert!(!f.integration.is_submitable());
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let f = fixture(vec![TimeEntry::new("s1", "", "A", at(5, 9), 900)], vec![]);
        connect(&f).await;

        let json = serde_json::to_value(f.integration.snapshot()).unwrap();

        assert_eq!(json["isSubmitable"], true);
        assert_eq!(json["target"]["selectedTask"], "task-1");
        assert_eq!(json["source"]["selection"], serde_json::json!(["s1"]));
    }
}
