//! Target system state
//!
//! On top of the shared [`Side`] state the target tracks its project and
//! task catalog, the selected project/task (persisted per platform) and
//! whether deletions are allowed in the next submission.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::adapters::EntryWriter;
use super::alert::AlertChannel;
use super::async_op::{AsyncOperation, AsyncState, Outcome};
use super::side::{forget, persist, Side, SideSnapshot};
use super::storage::{self, SettingsStore};
use crate::error::Error;
use crate::models::{Credentials, DateRange, Project, Task, TimeEntry};
use crate::utils::lock;

pub struct TargetSide {
    side: Side<dyn EntryWriter>,
    projects: AsyncOperation<Vec<Project>>,
    tasks: AsyncOperation<Vec<Task>>,
    selected_project: Mutex<Option<String>>,
    selected_task: Mutex<Option<String>>,
    deletion_allowed: AtomicBool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSnapshot {
    #[serde(flatten)]
    pub side: SideSnapshot,
    pub projects: AsyncState<Vec<Project>>,
    pub tasks: AsyncState<Vec<Task>>,
    pub selected_project: Option<String>,
    pub selected_task: Option<String>,
    pub deletion_allowed: bool,
}

impl Deref for TargetSide {
    type Target = Side<dyn EntryWriter>;

    fn deref(&self) -> &Self::Target {
        &self.side
    }
}

impl TargetSide {
    pub fn new(
        adapter: Arc<dyn EntryWriter>,
        store: Arc<dyn SettingsStore>,
        alerts: AlertChannel,
    ) -> Self {
        Self {
            side: Side::new(adapter, store, alerts.clone()),
            projects: AsyncOperation::with_alerts("projects", alerts.clone()),
            tasks: AsyncOperation::with_alerts("tasks", alerts),
            selected_project: Mutex::new(None),
            selected_task: Mutex::new(None),
            deletion_allowed: AtomicBool::new(false),
        }
    }

    /// Authenticate, then load the catalog and restore the stored selection
    pub async fn authenticate(&self, credentials: Credentials) -> Outcome<()> {
        let outcome = self.side.authenticate(credentials).await;
        if outcome.is_success() {
            if self.selected_task().is_none() {
                self.flag_task_not_selected();
            }
            self.load_projects().await;
        }
        outcome
    }

    /// Drop the session together with the persisted project/task choice
    pub async fn forget_credentials(&self) {
        self.side.forget_credentials().await;
        forget(self.store(), &storage::selected_project_key(self.name())).await;
        forget(self.store(), &storage::selected_task_key(self.name())).await;
        self.projects.reset();
        self.tasks.reset();
        *lock(&self.selected_project) = None;
        *lock(&self.selected_task) = None;
        self.deletion_allowed.store(false, Ordering::SeqCst);
    }

    /// Load the project catalog
    ///
    /// Without a current choice the persisted project is restored when it
    /// still exists, and its tasks are loaded.
    pub async fn load_projects(&self) -> Outcome<Vec<Project>> {
        let outcome = self.projects.run(self.adapter().list_projects()).await;
        let Outcome::Succeeded(projects) = &outcome else {
            return outcome;
        };

        if self.selected_project().is_none() {
            let key = storage::selected_project_key(self.name());
            if let Some(stored) = self.load_stored(&key).await {
                if projects.iter().any(|project| project.id == stored) {
                    log::info!("[{}] restored project {}", self.name(), stored);
                    *lock(&self.selected_project) = Some(stored);
                } else {
                    forget(self.store(), &key).await;
                }
            }
        }

        if let Some(project_id) = self.selected_project() {
            self.load_tasks(&project_id).await;
        }
        outcome
    }

    /// Load the tasks of `project_id`, restoring the persisted task if valid
    pub async fn load_tasks(&self, project_id: &str) -> Outcome<Vec<Task>> {
        let outcome = self.tasks.run(self.adapter().list_tasks(project_id)).await;
        let Outcome::Succeeded(tasks) = &outcome else {
            return outcome;
        };

        if self.selected_task().is_none() {
            let key = storage::selected_task_key(self.name());
            if let Some(stored) = self.load_stored(&key).await {
                if tasks.iter().any(|task| task.id == stored) {
                    log::info!("[{}] restored task {}", self.name(), stored);
                    *lock(&self.selected_task) = Some(stored);
                } else {
                    forget(self.store(), &key).await;
                }
            }
        }
        outcome
    }

    pub fn projects(&self) -> Option<Vec<Project>> {
        self.projects.value()
    }

    pub fn tasks(&self) -> Option<Vec<Task>> {
        self.tasks.value()
    }

    pub fn selected_project(&self) -> Option<String> {
        lock(&self.selected_project).clone()
    }

    pub fn selected_task(&self) -> Option<String> {
        lock(&self.selected_task).clone()
    }

    /// Switch to `project_id`
    ///
    /// Clears the task, the target entries and the deletion flag, then
    /// loads the new project's tasks. Returns `false` when nothing changed.
    pub async fn select_project(&self, project_id: &str) -> bool {
        if self.selected_project().as_deref() == Some(project_id) {
            return false;
        }

        *lock(&self.selected_project) = Some(project_id.to_string());
        *lock(&self.selected_task) = None;
        self.deletion_allowed.store(false, Ordering::SeqCst);
        self.tasks.reset();
        self.reset_entries();
        self.clear_selection();
        persist(self.store(), &storage::selected_project_key(self.name()), &project_id).await;
        self.flag_task_not_selected();

        self.load_tasks(project_id).await;
        true
    }

    /// Switch to `task_id`; returns `false` when nothing changed
    pub async fn select_task(&self, task_id: &str) -> bool {
        if self.selected_task().as_deref() == Some(task_id) {
            return false;
        }

        *lock(&self.selected_task) = Some(task_id.to_string());
        self.clear_selection();
        persist(self.store(), &storage::selected_task_key(self.name()), &task_id).await;
        true
    }

    /// Fetch the entries booked on the selected task
    pub async fn fetch_entries(&self, range: DateRange) -> Outcome<Vec<TimeEntry>> {
        match self.selected_task() {
            Some(task_id) => self.side.fetch_entries(range, Some(&task_id)).await,
            None => Outcome::Failed(self.flag_task_not_selected()),
        }
    }

    pub fn deletion_allowed(&self) -> bool {
        self.deletion_allowed.load(Ordering::SeqCst)
    }

    /// Flip the deletion flag and drop the current target selection
    pub fn toggle_deletion_allowed(&self) -> bool {
        self.clear_selection();
        !self.deletion_allowed.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            side: self.side.snapshot(),
            projects: self.projects.snapshot(),
            tasks: self.tasks.snapshot(),
            selected_project: self.selected_project(),
            selected_task: self.selected_task(),
            deletion_allowed: self.deletion_allowed(),
        }
    }

    fn flag_task_not_selected(&self) -> Error {
        let err = Error::precondition(format!("Please select the target task in {}.", self.name()));
        self.flag_entries_error(err.clone());
        err
    }

    async fn load_stored(&self, key: &str) -> Option<String> {
        match storage::load::<String>(self.store(), key).await {
            Ok(value) => value,
            Err(err) => {
                log::warn!("[{}] cannot read {}: {}", self.name(), key, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;
    use crate::services::testing::FakeTracker;
    use chrono::NaiveDate;

    fn at(day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn january() -> DateRange {
        DateRange::new(at(1).date(), at(31).date()).unwrap()
    }

    fn tracker() -> Arc<FakeTracker> {
        Arc::new(
            FakeTracker::new("Tick")
                .with_task("p1", "t1")
                .with_task("p1", "t2")
                .with_task("p2", "t3")
                .with_entries(vec![
                    TimeEntry::new("1", "t1", "Standup", at(5), 900),
                    TimeEntry::new("2", "t2", "Review", at(5), 900),
                ]),
        )
    }

    fn target(tracker: Arc<FakeTracker>, store: Arc<MemoryStore>) -> TargetSide {
        TargetSide::new(tracker, store, AlertChannel::new())
    }

    fn ok() -> Credentials {
        Credentials::new().with("token", "ok")
    }

    #[tokio::test]
    async fn test_authenticate_without_task_flags_entries() {
        let target = target(tracker(), Arc::new(MemoryStore::new()));

        assert!(target.authenticate(ok()).await.is_success());

        assert_eq!(target.projects().unwrap().len(), 2);
        assert_eq!(
            target.entries_state().error,
            Some(Error::precondition("Please select the target task in Tick."))
        );
        assert!(target.tasks().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_restores_stored_selection() {
        let store = Arc::new(MemoryStore::new());
        storage::save(store.as_ref(), "Tick_selectedProject", &"p1").await.unwrap();
        storage::save(store.as_ref(), "Tick_selectedTask", &"t2").await.unwrap();
        let target = target(tracker(), store);

        target.authenticate(ok()).await;

        assert_eq!(target.selected_project().as_deref(), Some("p1"));
        assert_eq!(target.selected_task().as_deref(), Some("t2"));
        assert_eq!(target.tasks().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_stored_selection_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        storage::save(store.as_ref(), "Tick_selectedProject", &"p1").await.unwrap();
        storage::save(store.as_ref(), "Tick_selectedTask", &"gone").await.unwrap();
        let target = target(tracker(), store.clone());

        target.authenticate(ok()).await;

        assert!(target.selected_task().is_none());
        assert!(!store.keys().contains(&"Tick_selectedTask".to_string()));
    }

    #[tokio::test]
    async fn test_select_project_resets_dependent_state() {
        let store = Arc::new(MemoryStore::new());
        let target = target(tracker(), store.clone());
        target.authenticate(ok()).await;
        target.select_project("p1").await;
        target.select_task("t1").await;
        target.fetch_entries(january()).await;
        target.toggle_deletion_allowed();

        assert!(target.select_project("p2").await);

        assert!(target.selected_task().is_none());
        assert!(!target.deletion_allowed());
        assert!(target.entries().is_none());
        assert_eq!(target.tasks().unwrap()[0].id, "t3");
        assert_eq!(
            storage::load::<String>(store.as_ref(), "Tick_selectedProject").await.unwrap(),
            Some("p2".to_string())
        );
    }

    #[tokio::test]
    async fn test_reselecting_same_project_is_noop() {
        let target = target(tracker(), Arc::new(MemoryStore::new()));
        target.authenticate(ok()).await;
        assert!(target.select_project("p1").await);
        target.select_task("t1").await;

        assert!(!target.select_project("p1").await);
        assert_eq!(target.selected_task().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_fetch_requires_selected_task() {
        let target = target(tracker(), Arc::new(MemoryStore::new()));
        target.authenticate(ok()).await;

        let outcome = target.fetch_entries(january()).await;

        assert!(matches!(outcome, Outcome::Failed(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn test_fetch_keeps_selected_task_entries_only() {
        let target = target(tracker(), Arc::new(MemoryStore::new()));
        target.authenticate(ok()).await;
        target.select_project("p1").await;
        target.select_task("t2").await;

        let entries = target.fetch_entries(january()).await.ok().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "2");
    }

    #[test]
    fn test_toggle_deletion_clears_selection() {
        let target = target(tracker(), Arc::new(MemoryStore::new()));
        target.set_selection(["1"].into_iter().collect());

        assert!(target.toggle_deletion_allowed());
        assert!(target.selection().is_empty());
        assert!(!target.toggle_deletion_allowed());
    }

    #[tokio::test]
    async fn test_forget_credentials_drops_selection_keys() {
        let store = Arc::new(MemoryStore::new());
        let target = target(tracker(), store.clone());
        target.authenticate(ok()).await;
        target.select_project("p1").await;
        target.select_task("t1").await;

        target.forget_credentials().await;

        assert!(store.keys().is_empty());
        assert!(target.selected_project().is_none());
        assert!(target.projects().is_none());
        assert!(!target.is_authenticated());
    }
}
