//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod diff;
pub mod history;
pub mod sync;

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use clap::Args;
use timesync_core::services::Outcome;
use timesync_core::{Database, DateRange, Integration, LedgerAdapter};

use crate::output::OutputFormat;

/// Shared context for all commands
pub struct Context {
    pub db: Database,
    pub format: OutputFormat,
    pub quiet: bool,
    pub source_name: String,
    pub target_name: String,
}

impl Context {
    /// Fresh session over the configured ledgers, nothing authenticated yet
    pub fn integration(&self, range: DateRange) -> Integration {
        Integration::new(
            Arc::new(LedgerAdapter::new(self.source_name.as_str())),
            Arc::new(LedgerAdapter::new(self.target_name.as_str())),
            Arc::new(self.db.clone()),
        )
        .with_date_range(range)
    }

    /// Session restored from the stored credentials and selection
    pub async fn connect(&self, range: DateRange) -> Integration {
        let integration = self.integration(range);
        integration.load_stored_credentials().await;
        integration
    }
}

/// Date range shared by `diff` and `sync`
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// First day (YYYY-MM-DD), defaults to the start of the current period
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), defaults to the end of the current period
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    pub fn resolve(&self) -> Result<DateRange> {
        let default = DateRange::current();
        let from = self.from.unwrap_or(default.from());
        let to = self.to.unwrap_or(default.to());
        Ok(DateRange::new(from, to)?)
    }
}

/// Turn an engine outcome into a CLI result
pub fn settled<T>(outcome: Outcome<T>) -> Result<T> {
    match outcome {
        Outcome::Succeeded(value) => Ok(value),
        Outcome::Failed(err) => Err(err.into()),
        Outcome::Superseded => Err(anyhow!("operation was superseded by a newer one")),
    }
}

/// Fail unless both sides are connected, a task is chosen and both fetched
pub fn ensure_ready(integration: &Integration) -> Result<()> {
    let source = integration.source();
    let target = integration.target();

    if !source.is_authenticated() {
        bail!(
            "{} is not connected. Run `timesync auth source <ledger>` first.",
            source.name()
        );
    }
    if !target.is_authenticated() {
        bail!(
            "{} is not connected. Run `timesync auth target <ledger>` first.",
            target.name()
        );
    }
    if target.selected_task().is_none() {
        bail!(
            "Please select the target task in {}. See `timesync project list` and `timesync task list`.",
            target.name()
        );
    }
    if let Some(err) = source.entries_state().error {
        bail!("Cannot load {} entries: {}", source.name(), err);
    }
    if let Some(err) = target.entries_state().error {
        bail!("Cannot load {} entries: {}", target.name(), err);
    }
    Ok(())
}
