//! Diff command
//!
//! Shows every fetched entry on both sides and what the next sync would
//! do with it.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use timesync_core::{Integration, TimeEntry};

use super::{ensure_ready, Context, RangeArgs};
use crate::output::{format_duration, print_info, print_output};

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Treat target entries without a source counterpart as deletions
    #[arg(long)]
    pub allow_deletion: bool,
}

/// Entry row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "Side")]
    pub side: String,
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl EntryRow {
    pub fn new(side: &str, action: &str, entry: &TimeEntry) -> Self {
        Self {
            side: side.to_string(),
            action: action.to_string(),
            id: entry.id.clone(),
            date: entry.date.format("%Y-%m-%d %H:%M").to_string(),
            duration: format_duration(entry.duration_in_seconds),
            description: entry.description.clone(),
        }
    }
}

pub async fn execute(ctx: &Context, args: DiffArgs) -> Result<()> {
    let integration = ctx.connect(args.range.resolve()?).await;
    ensure_ready(&integration)?;
    if args.allow_deletion {
        integration.toggle_deletion_allowed();
    }

    let rows = entry_rows(&integration);
    print_output(&rows, ctx.format)?;

    let to_create = integration.source().selection().len();
    let to_delete = if integration.target().deletion_allowed() {
        integration.target().selection().len()
    } else {
        0
    };
    print_info(
        &format!(
            "{}: {} to create, {} to delete",
            integration.date_range(),
            to_create,
            to_delete
        ),
        ctx.quiet,
    );
    Ok(())
}

/// Rows for both sides, source first, in fetch order
///
/// Unmatched target entries show as `orphan` while deletion is disabled.
pub fn entry_rows(integration: &Integration) -> Vec<EntryRow> {
    let source = integration.source();
    let target = integration.target();
    let source_selection = source.selection();
    let target_selection = target.selection();
    let deletion_allowed = target.deletion_allowed();

    let mut rows = Vec::new();
    for entry in source.entries().unwrap_or_default() {
        let action = if source_selection.contains(&entry.id) {
            "create"
        } else {
            "synced"
        };
        rows.push(EntryRow::new(source.name(), action, &entry));
    }
    for entry in target.entries().unwrap_or_default() {
        let action = match (target_selection.contains(&entry.id), deletion_allowed) {
            (true, true) => "delete",
            (true, false) => "orphan",
            (false, _) => "synced",
        };
        rows.push(EntryRow::new(target.name(), action, &entry));
    }
    rows
}
