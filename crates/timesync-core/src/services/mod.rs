//! Services module

pub mod adapters;
pub mod alert;
pub mod async_op;
pub mod integration;
pub mod matcher;
pub mod reconciliation;
pub mod side;
pub mod storage;
pub mod target;
pub mod transaction;

#[cfg(test)]
pub mod testing;

pub use adapters::{EntryReader, EntryWriter, LedgerAdapter, LedgerDocument};
pub use alert::AlertChannel;
pub use async_op::{AsyncOperation, AsyncState, Outcome};
pub use integration::{Integration, IntegrationSnapshot};
pub use matcher::{are_similar, has_counterpart, DURATION_TOLERANCE_SECS};
pub use reconciliation::{source_not_yet_synced, target_not_in_source, Differences};
pub use side::{Side, SideSnapshot, SourceSide};
pub use storage::{MemoryStore, SettingsStore};
pub use target::{TargetSide, TargetSnapshot};
pub use transaction::SyncTransaction;
