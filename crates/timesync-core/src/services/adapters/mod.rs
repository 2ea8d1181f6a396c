//! Capability contracts for the two synchronized systems
//!
//! The core never talks to a third-party API directly. Each system is
//! reached through one of these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Integration                                         │
//! │   source.fetch_entries(range)                       │
//! │   target.fetch_entries(range) / create / delete     │
//! └─────────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────┐      ┌──────────────────────────┐
//! │ trait EntryReader│◄─────│ trait EntryWriter        │
//! │   authenticate   │      │   list_projects          │
//! │   fetch_entries  │      │   list_tasks             │
//! └──────────────────┘      │   create_entry           │
//!                           │   delete_entry           │
//!                           └──────────────────────────┘
//! ```
//!
//! # Adding a New System
//!
//! 1. Create a new module (e.g., `tempo.rs`)
//! 2. Implement `EntryReader` (and `EntryWriter` if it can be a target)
//! 3. Hand an `Arc` of it to `Integration::new`

pub mod ledger;

pub use ledger::{LedgerAdapter, LedgerDocument};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Credentials, DateRange, Project, Task, TimeEntry};

/// Read access to a time-tracking system
#[async_trait]
pub trait EntryReader: Send + Sync {
    /// Platform name used in messages and as the credentials storage key
    fn name(&self) -> &str;

    /// Validate `credentials` and start a session with them
    async fn authenticate(&self, credentials: &Credentials) -> Result<()>;

    /// Credentials of the current session, if authenticated
    fn credentials(&self) -> Option<Credentials>;

    fn is_authenticated(&self) -> bool {
        self.credentials().is_some()
    }

    /// Drop the current session
    fn sign_out(&self);

    /// All entries whose calendar day falls inside `range`
    async fn fetch_entries(&self, range: &DateRange) -> Result<Vec<TimeEntry>>;
}

/// Read-write access, required of the target system
#[async_trait]
pub trait EntryWriter: EntryReader {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>>;

    /// Create `entry` (its `task_id` names the destination task)
    async fn create_entry(&self, entry: &TimeEntry) -> Result<()>;

    async fn delete_entry(&self, id: &str) -> Result<()>;
}
