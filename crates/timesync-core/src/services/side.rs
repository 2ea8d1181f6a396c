//! Per-system state
//!
//! A [`Side`] owns everything the controller tracks about one system: the
//! adapter session, the fetched entries and the current selection. Sides
//! never call back into the controller; it sequences them explicitly.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::adapters::EntryReader;
use super::alert::AlertChannel;
use super::async_op::{AsyncOperation, AsyncState, Outcome};
use super::storage::{self, SettingsStore};
use crate::error::Error;
use crate::models::{Alert, Credentials, DateRange, SelectionSet, TimeEntry};
use crate::utils::lock;

/// The read-only source system
pub type SourceSide = Side<dyn EntryReader>;

pub struct Side<A: ?Sized> {
    adapter: Arc<A>,
    store: Arc<dyn SettingsStore>,
    alerts: AlertChannel,
    auth: AsyncOperation<()>,
    entries: AsyncOperation<Vec<TimeEntry>>,
    selection: Mutex<SelectionSet>,
}

/// Serializable view of one side
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSnapshot {
    pub name: String,
    pub authenticated: bool,
    pub auth: AsyncState<()>,
    pub entries: AsyncState<Vec<TimeEntry>>,
    pub selection: SelectionSet,
}

impl<A: EntryReader + ?Sized> Side<A> {
    pub fn new(adapter: Arc<A>, store: Arc<dyn SettingsStore>, alerts: AlertChannel) -> Self {
        Self {
            adapter,
            store,
            auth: AsyncOperation::with_alerts("auth", alerts.clone()),
            entries: AsyncOperation::with_alerts("entries", alerts.clone()),
            alerts,
            selection: Mutex::new(SelectionSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn adapter(&self) -> Arc<A> {
        self.adapter.clone()
    }

    pub(crate) fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.adapter.is_authenticated()
    }

    /// Start an adapter session with `credentials`
    ///
    /// Successful credentials are persisted under the platform name; failed
    /// ones are removed from storage.
    pub async fn authenticate(&self, credentials: Credentials) -> Outcome<()> {
        let outcome = self.auth.run(self.adapter.authenticate(&credentials)).await;

        match &outcome {
            Outcome::Succeeded(()) => {
                log::info!("[{}] authenticated", self.name());
                self.alerts.publish(Alert::success("Successfully authenticated!"));
                let session = self.adapter.credentials().unwrap_or(credentials);
                persist(self.store(), self.name(), &session).await;
            }
            Outcome::Failed(_) => forget(self.store(), self.name()).await,
            Outcome::Superseded => {}
        }
        outcome
    }

    /// Credentials persisted by a previous successful authentication
    pub async fn stored_credentials(&self) -> Option<Credentials> {
        match storage::load(self.store(), self.name()).await {
            Ok(credentials) => credentials,
            Err(err) => {
                log::warn!("[{}] cannot read stored credentials: {}", self.name(), err);
                None
            }
        }
    }

    /// Drop the session, the persisted credentials and all fetched state
    pub async fn forget_credentials(&self) {
        forget(self.store(), self.name()).await;
        self.adapter.sign_out();
        self.auth.reset();
        self.entries.reset();
        self.clear_selection();
    }

    /// Fetch the entries of `range`, keeping only `task_id` when given
    pub async fn fetch_entries(
        &self,
        range: DateRange,
        task_id: Option<&str>,
    ) -> Outcome<Vec<TimeEntry>> {
        self.entries
            .run(async {
                if !self.adapter.is_authenticated() {
                    return Err(Error::auth(format!(
                        "{} hasn't been authenticated yet",
                        self.name()
                    )));
                }
                let mut entries = self.adapter.fetch_entries(&range).await?;
                if let Some(task_id) = task_id {
                    entries.retain(|entry| entry.task_id == task_id);
                }
                log::debug!("[{}] fetched {} entries for {}", self.name(), entries.len(), range);
                Ok(entries)
            })
            .await
    }

    /// Currently held entries (kept across failed fetches)
    pub fn entries(&self) -> Option<Vec<TimeEntry>> {
        self.entries.value()
    }

    pub fn entries_state(&self) -> AsyncState<Vec<TimeEntry>> {
        self.entries.snapshot()
    }

    /// Record an entries error without publishing it
    pub(crate) fn flag_entries_error(&self, error: Error) {
        self.entries.set_error(error);
    }

    pub(crate) fn reset_entries(&self) {
        self.entries.reset();
    }

    pub fn selection(&self) -> SelectionSet {
        lock(&self.selection).clone()
    }

    pub fn set_selection(&self, selection: SelectionSet) {
        *lock(&self.selection) = selection;
    }

    pub fn clear_selection(&self) {
        self.set_selection(SelectionSet::new());
    }

    /// Selected entries in fetch order
    pub fn selected_entries(&self) -> Vec<TimeEntry> {
        let entries = self.entries().unwrap_or_default();
        self.selection().pick(&entries).into_iter().cloned().collect()
    }

    pub fn snapshot(&self) -> SideSnapshot {
        SideSnapshot {
            name: self.name().to_string(),
            authenticated: self.is_authenticated(),
            auth: self.auth.snapshot(),
            entries: self.entries.snapshot(),
            selection: self.selection(),
        }
    }
}

/// Persist `value`; storage failures are logged and otherwise ignored
pub(crate) async fn persist<T: Serialize + Sync>(store: &dyn SettingsStore, key: &str, value: &T) {
    if let Err(err) = storage::save(store, key, value).await {
        log::warn!("[settings] cannot persist {}: {}", key, err);
    }
}

/// Remove `key`; storage failures are logged and otherwise ignored
pub(crate) async fn forget(store: &dyn SettingsStore, key: &str) {
    if let Err(err) = store.reset(key).await {
        log::warn!("[settings] cannot reset {}: {}", key, err);
    }
}
