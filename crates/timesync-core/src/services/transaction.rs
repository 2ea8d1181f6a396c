//! Single-use batch of target mutations
//!
//! Deletions run first, then creations, one item at a time. A failing item
//! is recorded and the batch carries on; partial success is a normal
//! result, not an error.

use std::sync::Arc;

use super::adapters::EntryWriter;
use crate::error::{Error, Result};
use crate::models::{ItemFailure, TimeEntry, TransactionResult};

pub struct SyncTransaction {
    target: Arc<dyn EntryWriter>,
    to_delete: Vec<TimeEntry>,
    to_create: Vec<TimeEntry>,
    executed: bool,
}

impl SyncTransaction {
    pub fn new(target: Arc<dyn EntryWriter>) -> Self {
        Self {
            target,
            to_delete: Vec::new(),
            to_create: Vec::new(),
            executed: false,
        }
    }

    /// Queue a target entry for deletion
    pub fn delete(&mut self, entry: TimeEntry) {
        self.to_delete.push(entry);
    }

    /// Queue an entry for creation; its `task_id` must name the target task
    pub fn create(&mut self, entry: TimeEntry) {
        self.to_create.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }

    pub fn pending_creates(&self) -> &[TimeEntry] {
        &self.to_create
    }

    pub fn pending_deletes(&self) -> &[TimeEntry] {
        &self.to_delete
    }

    /// Apply every queued item against the target
    ///
    /// # Errors
    /// Returns a precondition error, before touching the target, when the
    /// target is not authenticated or this transaction already ran.
    pub async fn execute(&mut self) -> Result<TransactionResult> {
        if !self.target.is_authenticated() {
            return Err(Error::precondition(format!(
                "{} hasn't been authenticated yet",
                self.target.name()
            )));
        }
        if self.executed {
            return Err(Error::precondition("Transaction was already executed"));
        }
        self.executed = true;

        log::info!(
            "[transaction] applying {} deletions and {} creations to {}",
            self.to_delete.len(),
            self.to_create.len(),
            self.target.name()
        );

        let mut result = TransactionResult::default();

        for entry in &self.to_delete {
            match self.target.delete_entry(&entry.id).await {
                Ok(()) => result.deleted.push(entry.clone()),
                Err(err) => {
                    log::warn!("[transaction] failed to delete {}: {}", entry.id, err);
                    result.failed_to_delete.push(ItemFailure {
                        entry: entry.clone(),
                        error: Error::item(format!("Failed to delete {}: {}", entry.id, err)),
                    });
                }
            }
        }

        for entry in &self.to_create {
            match self.target.create_entry(entry).await {
                Ok(()) => result.created.push(entry.clone()),
                Err(err) => {
                    log::warn!("[transaction] failed to create {}: {}", entry.id, err);
                    result.failed_to_create.push(ItemFailure {
                        entry: entry.clone(),
                        error: Error::item(format!("Failed to create {}: {}", entry.id, err)),
                    });
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::services::testing::FakeTracker;
    use chrono::NaiveDate;

    fn entry(id: &str) -> TimeEntry {
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        TimeEntry::new(id, "task-1", format!("Entry {}", id), at, 600)
    }

    #[tokio::test]
    async fn test_failed_create_does_not_stop_batch() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        target.fail_create("c2");
        let mut tx = SyncTransaction::new(target.clone());
        for id in ["c1", "c2", "c3"] {
            tx.create(entry(id));
        }

        let result = tx.execute().await.unwrap();

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.failed_to_create.len(), 1);
        assert_eq!(result.failed_to_create[0].entry.id, "c2");
        assert_eq!(target.calls(), vec!["create:c1", "create:c2", "create:c3"]);
    }

    #[tokio::test]
    async fn test_deletes_run_before_creates() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        let mut tx = SyncTransaction::new(target.clone());
        tx.create(entry("c1"));
        tx.delete(entry("d1"));
        tx.create(entry("c2"));
        tx.delete(entry("d2"));

        let result = tx.execute().await.unwrap();

        assert_eq!(
            target.calls(),
            vec!["delete:d1", "delete:d2", "create:c1", "create:c2"]
        );
        assert!(result.is_complete_success());
        assert_eq!(result.attempted(), 4);
    }

    #[tokio::test]
    async fn test_failed_delete_is_recorded() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        target.fail_delete("d1");
        let mut tx = SyncTransaction::new(target.clone());
        tx.delete(entry("d1"));
        tx.delete(entry("d2"));

        let result = tx.execute().await.unwrap();

        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.failed_to_delete.len(), 1);
        assert!(!result.is_complete_success());
    }

    #[tokio::test]
    async fn test_item_failures_are_classified_as_item() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        target.fail_delete("d1");
        target.fail_create("c1");
        let mut tx = SyncTransaction::new(target.clone());
        tx.delete(entry("d1"));
        tx.create(entry("c1"));

        let result = tx.execute().await.unwrap();

        let delete_error = &result.failed_to_delete[0].error;
        assert_eq!(delete_error.category(), ErrorCategory::Item);
        assert!(delete_error.to_string().contains("d1"));
        assert!(delete_error.to_string().contains("HTTP 500"));

        let create_error = &result.failed_to_create[0].error;
        assert_eq!(create_error.category(), ErrorCategory::Item);
        assert!(create_error.to_string().contains("c1"));
        assert!(create_error.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_second_execute_is_rejected() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        let mut tx = SyncTransaction::new(target.clone());
        tx.create(entry("c1"));

        tx.execute().await.unwrap();
        let err = tx.execute().await.unwrap_err();

        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(target.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_target_is_rejected_without_effects() {
        let target = Arc::new(FakeTracker::new("Target"));
        let mut tx = SyncTransaction::new(target.clone());
        tx.create(entry("c1"));

        let err = tx.execute().await.unwrap_err();

        assert!(matches!(err, Error::Precondition(_)));
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_transaction_succeeds() {
        let target = Arc::new(FakeTracker::authenticated("Target"));
        let mut tx = SyncTransaction::new(target);
        assert!(tx.is_empty());

        let result = tx.execute().await.unwrap();
        assert_eq!(result, TransactionResult::default());
    }
}
