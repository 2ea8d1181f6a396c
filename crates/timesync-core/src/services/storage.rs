//! Settings persistence port
//!
//! Credentials and the selected target project/task survive restarts
//! through a [`SettingsStore`]. [`crate::db::Database`] is the durable
//! implementation; [`MemoryStore`] keeps everything in process.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::utils::lock;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn reset(&self, key: &str) -> Result<()>;
}

/// Read `key` as `T`
///
/// A stored value that no longer deserializes is treated as absent.
pub async fn load<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            log::warn!("[settings] ignoring unreadable value for {}: {}", key, err);
            Ok(None)
        }
    }
}

/// Write `value` under `key`
pub async fn save<T: Serialize + Sync>(store: &dyn SettingsStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}

/// Storage key of the persisted selected project for `platform`
pub fn selected_project_key(platform: &str) -> String {
    format!("{}_selectedProject", platform)
}

/// Storage key of the persisted selected task for `platform`
pub fn selected_task_key(platform: &str) -> String {
    format!("{}_selectedTask", platform)
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.values).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        lock(&self.values).remove(key);
        Ok(())
    }
}
