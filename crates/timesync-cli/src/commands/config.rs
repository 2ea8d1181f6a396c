//! Config commands
//!
//! Commands for inspecting CLI configuration.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use timesync_core::db::{get_db_path, DB_PATH_ENV};
use timesync_core::services::adapters::ledger::PATH_CREDENTIAL;
use timesync_core::services::storage::{self, selected_project_key, selected_task_key};
use timesync_core::Credentials;

use super::Context;
use crate::output::print_output;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl ConfigRow {
    fn new(key: impl Into<String>, value: Option<String>, source: &str) -> Self {
        let source = if value.is_some() { source } else { "n/a" };
        Self {
            key: key.into(),
            value: value.unwrap_or_else(|| "Not set".to_string()),
            source: source.to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let rows = get_all_config(ctx).await?;
    print_output(&rows, ctx.format)?;
    Ok(())
}

async fn get_all_config(ctx: &Context) -> Result<Vec<ConfigRow>> {
    let mut rows = Vec::new();

    // Database path
    let db_path = get_db_path()
        .map(|p| p.to_string_lossy().to_string())
        .ok();
    let db_source = if std::env::var(DB_PATH_ENV).is_ok() { "env" } else { "default" };
    rows.push(ConfigRow::new(DB_PATH_ENV, db_path, db_source));

    rows.push(ConfigRow::new("source_name", Some(ctx.source_name.clone()), "cli"));
    rows.push(ConfigRow::new("target_name", Some(ctx.target_name.clone()), "cli"));

    // Stored session settings
    for name in [&ctx.source_name, &ctx.target_name] {
        let credentials: Option<Credentials> = storage::load(&ctx.db, name).await?;
        let ledger = credentials.and_then(|c| c.get(PATH_CREDENTIAL).map(str::to_string));
        rows.push(ConfigRow::new(format!("{}.ledger", name), ledger, "database"));
    }

    let project: Option<String> = storage::load(&ctx.db, &selected_project_key(&ctx.target_name)).await?;
    rows.push(ConfigRow::new(selected_project_key(&ctx.target_name), project, "database"));

    let task: Option<String> = storage::load(&ctx.db, &selected_task_key(&ctx.target_name)).await?;
    rows.push(ConfigRow::new(selected_task_key(&ctx.target_name), task, "database"));

    Ok(rows)
}
