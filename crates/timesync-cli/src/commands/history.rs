//! History command

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use tabled::Tabled;
use timesync_core::SyncRun;

use super::Context;
use crate::output::print_output;

/// Sync run row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct HistoryRow {
    #[tabled(rename = "Executed")]
    pub executed_at: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Created")]
    pub created: i64,
    #[tabled(rename = "Create Failed")]
    pub failed_to_create: i64,
    #[tabled(rename = "Deleted")]
    pub deleted: i64,
    #[tabled(rename = "Delete Failed")]
    pub failed_to_delete: i64,
}

impl From<SyncRun> for HistoryRow {
    fn from(run: SyncRun) -> Self {
        Self {
            executed_at: run
                .executed_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            target: run.target,
            created: run.created,
            failed_to_create: run.failed_to_create,
            deleted: run.deleted,
            failed_to_delete: run.failed_to_delete,
        }
    }
}

pub async fn execute(ctx: &Context, limit: i64) -> Result<()> {
    let runs = ctx.db.list_sync_runs(limit).await?;
    let rows: Vec<HistoryRow> = runs.into_iter().map(HistoryRow::from).collect();
    print_output(&rows, ctx.format)?;
    Ok(())
}
