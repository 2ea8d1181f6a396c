//! Sync command
//!
//! Applies the default selections to the target and records the run.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use timesync_core::{TimeEntry, TransactionResult};

use super::diff::EntryRow;
use super::{ensure_ready, settled, Context, RangeArgs};
use crate::output::{format_duration, print_alert, print_info, print_output};

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Also delete target entries without a source counterpart
    #[arg(long)]
    pub allow_deletion: bool,

    /// Show what would change without touching the target
    #[arg(long)]
    pub dry_run: bool,
}

/// Per-item result row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ResultRow {
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Error")]
    pub error: String,
}

impl ResultRow {
    fn new(action: &str, entry: &TimeEntry, error: Option<String>) -> Self {
        Self {
            action: action.to_string(),
            status: if error.is_some() { "failed" } else { "ok" }.to_string(),
            date: entry.date.format("%Y-%m-%d %H:%M").to_string(),
            duration: format_duration(entry.duration_in_seconds),
            description: entry.description.clone(),
            error: error.unwrap_or_default(),
        }
    }
}

pub async fn execute(ctx: &Context, args: SyncArgs) -> Result<()> {
    let integration = ctx.connect(args.range.resolve()?).await;
    ensure_ready(&integration)?;
    if args.allow_deletion {
        integration.toggle_deletion_allowed();
    }

    let plan = integration.plan()?;
    if plan.is_empty() {
        print_info(
            &format!("Nothing to sync for {}", integration.date_range()),
            ctx.quiet,
        );
        return Ok(());
    }

    if args.dry_run {
        let target = integration.target().name();
        let rows: Vec<EntryRow> = plan
            .pending_deletes()
            .iter()
            .map(|entry| EntryRow::new(target, "delete", entry))
            .chain(
                plan.pending_creates()
                    .iter()
                    .map(|entry| EntryRow::new(target, "create", entry)),
            )
            .collect();
        print_output(&rows, ctx.format)?;
        return Ok(());
    }

    print_info(
        &format!(
            "Applying {} deletion(s) and {} creation(s) to {}...",
            plan.pending_deletes().len(),
            plan.pending_creates().len(),
            integration.target().name()
        ),
        ctx.quiet,
    );
    let outcome = integration.submit().await;
    let result = match settled(outcome) {
        Ok(result) => result,
        Err(err) => {
            if let Some(alert) = integration.alerts().current() {
                print_alert(&alert, ctx.quiet);
            }
            return Err(err);
        }
    };

    let run = ctx
        .db
        .record_sync_run(integration.target().name(), &result)
        .await?;
    log::info!("[sync] recorded run {}", run.id);

    print_output(&result_rows(&result), ctx.format)?;
    if let Some(alert) = integration.alerts().current() {
        print_alert(&alert, ctx.quiet);
    }
    Ok(())
}

fn result_rows(result: &TransactionResult) -> Vec<ResultRow> {
    let deleted = result
        .deleted
        .iter()
        .map(|entry| ResultRow::new("delete", entry, None));
    let failed_deletes = result
        .failed_to_delete
        .iter()
        .map(|failure| ResultRow::new("delete", &failure.entry, Some(failure.error.to_string())));
    let created = result
        .created
        .iter()
        .map(|entry| ResultRow::new("create", entry, None));
    let failed_creates = result
        .failed_to_create
        .iter()
        .map(|failure| ResultRow::new("create", &failure.entry, Some(failure.error.to_string())));

    deleted
        .chain(failed_deletes)
        .chain(created)
        .chain(failed_creates)
        .collect()
}
