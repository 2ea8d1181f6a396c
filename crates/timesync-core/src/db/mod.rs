//! Database module - SQLx with SQLite
//!
//! Holds the persisted settings (credentials, selected project/task) and
//! the history of executed sync transactions.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{SyncRun, TransactionResult};
use crate::services::storage::SettingsStore;

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "TIMESYNC_DB_PATH";

/// Database state
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Create a new database connection with default path
    pub async fn new() -> Result<Self> {
        let db_path = get_db_path()?;
        Self::open(db_path).await
    }

    /// Create a new database connection with a specific path
    pub async fn open(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        log::info!("Connecting to database: {}", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        log::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_runs (
                id TEXT PRIMARY KEY,
                target TEXT NOT NULL,
                created INTEGER NOT NULL DEFAULT 0,
                failed_to_create INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                failed_to_delete INTEGER NOT NULL DEFAULT 0,
                executed_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sync_runs_executed_at ON sync_runs(executed_at)",
        )
        .execute(&self.pool)
        .await?;

        log::info!("Database migrations completed");
        Ok(())
    }

    /// Record the outcome of an executed transaction
    pub async fn record_sync_run(&self, target: &str, result: &TransactionResult) -> Result<SyncRun> {
        let run = SyncRun {
            id: Uuid::new_v4().to_string(),
            target: target.to_string(),
            created: result.created.len() as i64,
            failed_to_create: result.failed_to_create.len() as i64,
            deleted: result.deleted.len() as i64,
            failed_to_delete: result.failed_to_delete.len() as i64,
            executed_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO sync_runs (id, target, created, failed_to_create, deleted, failed_to_delete, executed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.target)
        .bind(run.created)
        .bind(run.failed_to_create)
        .bind(run.deleted)
        .bind(run.failed_to_delete)
        .bind(run.executed_at)
        .execute(&self.pool)
        .await?;

        Ok(run)
    }

    /// Most recent sync runs first
    pub async fn list_sync_runs(&self, limit: i64) -> Result<Vec<SyncRun>> {
        let runs: Vec<SyncRun> = sqlx::query_as(
            "SELECT * FROM sync_runs ORDER BY executed_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }
}

#[async_trait]
impl SettingsStore for Database {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(Error::from))
            .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Get the database path
pub fn get_db_path() -> Result<PathBuf> {
    // Check for environment variable override
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default: use app data directory
    let dirs = directories::ProjectDirs::from("com", "timesync", "Timesync")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().join("timesync.db"))
}
