//! # timesync-core
//!
//! Core logic for Timesync - reconciles time entries between a source
//! tracker and a target tracker and applies the differences.
//!
//! This crate provides:
//! - Database operations (`db` module)
//! - Data models (`models` module)
//! - Matching, reconciliation and the sync controller (`services` module)
//! - Unified error handling (`error` module)

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports for convenience
pub use db::Database;
pub use error::{Error, ErrorCategory, Result};

pub use models::{
    Alert, AlertKind, Credentials, DateRange, ItemFailure, Project, SelectionSet, SyncRun, Task,
    TimeEntry, TransactionResult,
};

pub use services::{
    are_similar, AlertChannel, Differences, EntryReader, EntryWriter, Integration,
    IntegrationSnapshot, LedgerAdapter, MemoryStore, Outcome, SettingsStore, SyncTransaction,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_version_format() {
        let v = version();
        // Should be semver format: x.y.z
        let parts: Vec<&str> = v.split('.').collect();
        assert_eq!(parts.len(), 3, "Version should be in x.y.z format");
    }
}
