//! In-memory tracker used by unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::adapters::{EntryReader, EntryWriter};
use crate::error::{Error, Result};
use crate::models::{Credentials, DateRange, Project, Task, TimeEntry};
use crate::utils::lock;

/// Fake time-tracking service usable as source or target
pub struct FakeTracker {
    name: String,
    credentials: Mutex<Option<Credentials>>,
    entries: Mutex<Vec<TimeEntry>>,
    projects: Mutex<Vec<Project>>,
    tasks: Mutex<Vec<Task>>,
    failing_creates: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    fetch_error: Mutex<Option<Error>>,
    calls: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    fetch_delay: AtomicUsize,
    created: AtomicUsize,
}

impl FakeTracker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            credentials: Mutex::new(None),
            entries: Mutex::new(Vec::new()),
            projects: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            failing_creates: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            fetch_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fetch_delay: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        }
    }

    pub fn authenticated(name: &str) -> Self {
        let tracker = Self::new(name);
        *lock(&tracker.credentials) = Some(Credentials::new().with("token", "valid"));
        tracker
    }

    pub fn with_entries(self, entries: Vec<TimeEntry>) -> Self {
        *lock(&self.entries) = entries;
        self
    }

    pub fn with_task(self, project_id: &str, task_id: &str) -> Self {
        lock(&self.projects).push(Project {
            id: project_id.to_string(),
            name: format!("Project {}", project_id),
        });
        lock(&self.tasks).push(Task {
            id: task_id.to_string(),
            project_id: project_id.to_string(),
            name: format!("Task {}", task_id),
        });
        self
    }

    pub fn set_entries(&self, entries: Vec<TimeEntry>) {
        *lock(&self.entries) = entries;
    }

    pub fn entries(&self) -> Vec<TimeEntry> {
        lock(&self.entries).clone()
    }

    pub fn fail_create(&self, id: &str) {
        lock(&self.failing_creates).insert(id.to_string());
    }

    pub fn fail_delete(&self, id: &str) {
        lock(&self.failing_deletes).insert(id.to_string());
    }

    pub fn fail_fetch(&self, error: Option<Error>) {
        *lock(&self.fetch_error) = error;
    }

    /// Hold the next fetch back for `yields` extra scheduler turns
    pub fn delay_next_fetch(&self, yields: usize) {
        self.fetch_delay.store(yields, Ordering::SeqCst);
    }

    /// Mutations in the order they were attempted
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryReader for FakeTracker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        if credentials.get("token") == Some("bad") {
            return Err(Error::auth("Invalid token"));
        }
        *lock(&self.credentials) = Some(credentials.clone());
        Ok(())
    }

    fn credentials(&self) -> Option<Credentials> {
        lock(&self.credentials).clone()
    }

    fn sign_out(&self) {
        *lock(&self.credentials) = None;
    }

    async fn fetch_entries(&self, range: &DateRange) -> Result<Vec<TimeEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.fetch_delay.swap(0, Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        if let Some(err) = lock(&self.fetch_error).clone() {
            return Err(err);
        }
        Ok(lock(&self.entries)
            .iter()
            .filter(|entry| range.contains(entry.day()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EntryWriter for FakeTracker {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(lock(&self.projects).clone())
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        Ok(lock(&self.tasks)
            .iter()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_entry(&self, entry: &TimeEntry) -> Result<()> {
        lock(&self.calls).push(format!("create:{}", entry.id));
        if lock(&self.failing_creates).contains(&entry.id) {
            return Err(Error::network("HTTP 500"));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        lock(&self.entries).push(TimeEntry {
            id: format!("created-{}", n),
            ..entry.clone()
        });
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        lock(&self.calls).push(format!("delete:{}", id));
        if lock(&self.failing_deletes).contains(id) {
            return Err(Error::network("HTTP 500"));
        }
        lock(&self.entries).retain(|entry| entry.id != id);
        Ok(())
    }
}
