//! Auth commands
//!
//! Connect the source and target to their ledgers, forget them again and
//! show the current session.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;
use timesync_core::services::adapters::ledger::PATH_CREDENTIAL;
use timesync_core::{DateRange, EntryReader, LedgerAdapter};

use super::{settled, Context};
use crate::output::{print_alert, print_info, print_output, print_success, yes_no};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Connect the source to a ledger file
    Source {
        /// Path of the ledger JSON file
        path: String,
    },

    /// Connect the target to a ledger file
    Target {
        /// Path of the ledger JSON file
        path: String,
    },

    /// Forget the stored credentials of one side
    Forget {
        #[arg(value_enum)]
        side: SideArg,
    },

    /// Show both connections and the selected project/task
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Source,
    Target,
}

/// Connection row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct StatusRow {
    #[tabled(rename = "Side")]
    pub side: String,
    #[tabled(rename = "Platform")]
    pub platform: String,
    #[tabled(rename = "Connected")]
    pub connected: String,
    #[tabled(rename = "Ledger")]
    pub ledger: String,
    #[tabled(rename = "Project")]
    pub project: String,
    #[tabled(rename = "Task")]
    pub task: String,
}

pub async fn execute(ctx: &Context, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Source { path } => connect_source(ctx, path).await,
        AuthAction::Target { path } => connect_target(ctx, path).await,
        AuthAction::Forget { side } => forget(ctx, side).await,
        AuthAction::Status => show_status(ctx).await,
    }
}

async fn connect_source(ctx: &Context, path: String) -> Result<()> {
    let integration = ctx.integration(DateRange::current());
    let outcome = integration
        .authenticate_source(LedgerAdapter::credentials_for(path))
        .await;
    if let Some(alert) = integration.alerts().current() {
        print_alert(&alert, ctx.quiet);
    }
    settled(outcome)?;

    if let Some(entries) = integration.source().entries() {
        print_info(
            &format!("{} entries in {}", entries.len(), integration.date_range()),
            ctx.quiet,
        );
    }
    Ok(())
}

async fn connect_target(ctx: &Context, path: String) -> Result<()> {
    let integration = ctx.integration(DateRange::current());
    let outcome = integration
        .authenticate_target(LedgerAdapter::credentials_for(path))
        .await;
    if let Some(alert) = integration.alerts().current() {
        print_alert(&alert, ctx.quiet);
    }
    settled(outcome)?;

    let target = integration.target();
    if target.selected_task().is_none() {
        let projects = target.projects().map(|p| p.len()).unwrap_or(0);
        print_info(
            &format!(
                "{} project(s) available. Run `timesync project select <id>` and `timesync task select <id>`.",
                projects
            ),
            ctx.quiet,
        );
    }
    Ok(())
}

async fn forget(ctx: &Context, side: SideArg) -> Result<()> {
    let integration = ctx.connect(DateRange::current()).await;
    let name = match side {
        SideArg::Source => {
            integration.forget_source_credentials().await;
            integration.source().name().to_string()
        }
        SideArg::Target => {
            integration.forget_target_credentials().await;
            integration.target().name().to_string()
        }
    };
    print_success(&format!("Forgot credentials for {}", name), ctx.quiet);
    Ok(())
}

async fn show_status(ctx: &Context) -> Result<()> {
    let integration = ctx.connect(DateRange::current()).await;
    let source = integration.source();
    let target = integration.target();

    let rows = vec![
        StatusRow {
            side: "source".to_string(),
            platform: source.name().to_string(),
            connected: yes_no(source.is_authenticated()),
            ledger: ledger_path(&*source.adapter()),
            project: "-".to_string(),
            task: "-".to_string(),
        },
        StatusRow {
            side: "target".to_string(),
            platform: target.name().to_string(),
            connected: yes_no(target.is_authenticated()),
            ledger: ledger_path(&*target.adapter()),
            project: target.selected_project().unwrap_or_else(|| "-".to_string()),
            task: target.selected_task().unwrap_or_else(|| "-".to_string()),
        },
    ];

    print_output(&rows, ctx.format)?;
    Ok(())
}

fn ledger_path<A: EntryReader + ?Sized>(adapter: &A) -> String {
    adapter
        .credentials()
        .and_then(|credentials| credentials.get(PATH_CREDENTIAL).map(str::to_string))
        .unwrap_or_else(|| "-".to_string())
}
