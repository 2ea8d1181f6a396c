//! JSON ledger adapter
//!
//! A local JSON document standing in for a time-tracking service. It
//! implements both capability contracts, so it can serve as source or
//! target. The document is located by the `path` credential.
//!
//! ```json
//! {
//!   "projects": [{ "id": "p1", "name": "Internal" }],
//!   "tasks": [{ "id": "t1", "projectId": "p1", "name": "Meetings" }],
//!   "entries": [{ "id": "e1", "taskId": "t1", "description": "Standup",
//!                 "date": "2024-01-05T09:00:00", "durationInSeconds": 900 }]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntryReader, EntryWriter};
use crate::error::{Error, Result};
use crate::models::{Credentials, DateRange, Project, Task, TimeEntry};
use crate::utils::{expand_path, lock};

/// Credential key holding the ledger file location
pub const PATH_CREDENTIAL: &str = "path";

/// On-disk content of a ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub entries: Vec<TimeEntry>,
}

impl LedgerDocument {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Session {
    credentials: Credentials,
    path: PathBuf,
}

/// Time-tracking "service" backed by a [`LedgerDocument`] file
pub struct LedgerAdapter {
    name: String,
    session: Mutex<Option<Session>>,
    // Serializes read-modify-write cycles on the file
    write_lock: tokio::sync::Mutex<()>,
}

impl LedgerAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Credentials pointing a ledger adapter at `path`
    pub fn credentials_for(path: impl Into<String>) -> Credentials {
        Credentials::new().with(PATH_CREDENTIAL, path)
    }

    fn session_path(&self) -> Result<PathBuf> {
        lock(&self.session)
            .as_ref()
            .map(|session| session.path.clone())
            .ok_or_else(|| Error::auth(format!("{} hasn't been authenticated yet", self.name)))
    }

    async fn load(&self) -> Result<LedgerDocument> {
        let path = self.session_path()?;
        LedgerDocument::load(&path).await.map_err(|err| match err {
            Error::NotFound(_) => Error::network(format!("Ledger {} is unreachable", path.display())),
            other => other,
        })
    }
}

#[async_trait]
impl EntryReader for LedgerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let path = PathBuf::from(expand_path(credentials.require(PATH_CREDENTIAL)?));

        let document = LedgerDocument::load(&path).await.map_err(|err| {
            Error::auth(format!("Cannot open ledger {}: {}", path.display(), err))
        })?;
        log::info!(
            "[ledger:{}] opened {} ({} entries)",
            self.name,
            path.display(),
            document.entries.len()
        );

        *lock(&self.session) = Some(Session {
            credentials: credentials.clone(),
            path,
        });
        Ok(())
    }

    fn credentials(&self) -> Option<Credentials> {
        lock(&self.session).as_ref().map(|session| session.credentials.clone())
    }

    fn sign_out(&self) {
        *lock(&self.session) = None;
    }

    async fn fetch_entries(&self, range: &DateRange) -> Result<Vec<TimeEntry>> {
        let document = self.load().await?;
        Ok(document
            .entries
            .into_iter()
            .filter(|entry| range.contains(entry.day()))
            .collect())
    }
}

#[async_trait]
impl EntryWriter for LedgerAdapter {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.load().await?.projects)
    }

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .load()
            .await?
            .tasks
            .into_iter()
            .filter(|task| task.project_id == project_id)
            .collect())
    }

    async fn create_entry(&self, entry: &TimeEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.session_path()?;
        let mut document = self.load().await?;

        if !document.tasks.iter().any(|task| task.id == entry.task_id) {
            return Err(Error::not_found(format!("task {}", entry.task_id)));
        }

        let created = TimeEntry {
            id: Uuid::new_v4().to_string(),
            ..entry.clone()
        };
        log::debug!("[ledger:{}] creating {} from {}", self.name, created.id, entry.id);
        document.entries.push(created);
        document.save(&path).await
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.session_path()?;
        let mut document = self.load().await?;

        let position = document
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| Error::not_found(format!("entry {}", id)))?;
        document.entries.remove(position);
        log::debug!("[ledger:{}] deleted {}", self.name, id);
        document.save(&path).await
    }
}
