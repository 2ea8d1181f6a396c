//! Project and task commands
//!
//! Browse the target's catalog and choose where synced entries are booked.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use timesync_core::{DateRange, Integration};

use super::Context;
use crate::output::{print_output, print_success};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// List the target's projects
    List,

    /// Select the project whose tasks receive synced entries
    Select {
        /// Project ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// List the tasks of the selected project
    List,

    /// Select the task synced entries are booked on
    Select {
        /// Task ID
        id: String,
    },
}

/// Project or task row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct CatalogRow {
    #[tabled(rename = "")]
    pub selected: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
}

pub async fn execute_project(ctx: &Context, action: ProjectAction) -> Result<()> {
    let integration = connected_target(ctx).await?;
    match action {
        ProjectAction::List => list_projects(ctx, &integration),
        ProjectAction::Select { id } => select_project(ctx, &integration, id).await,
    }
}

pub async fn execute_task(ctx: &Context, action: TaskAction) -> Result<()> {
    let integration = connected_target(ctx).await?;
    if integration.target().selected_project().is_none() {
        bail!("No project selected. Run `timesync project select <id>` first.");
    }
    match action {
        TaskAction::List => list_tasks(ctx, &integration),
        TaskAction::Select { id } => select_task(ctx, &integration, id).await,
    }
}

async fn connected_target(ctx: &Context) -> Result<Integration> {
    let integration = ctx.connect(DateRange::current()).await;
    let target = integration.target();
    if !target.is_authenticated() {
        bail!(
            "{} is not connected. Run `timesync auth target <ledger>` first.",
            target.name()
        );
    }
    if let Some(err) = target.snapshot().projects.error {
        bail!("Cannot load projects from {}: {}", target.name(), err);
    }
    Ok(integration)
}

fn list_projects(ctx: &Context, integration: &Integration) -> Result<()> {
    let target = integration.target();
    let selected = target.selected_project();
    let rows: Vec<CatalogRow> = target
        .projects()
        .unwrap_or_default()
        .into_iter()
        .map(|project| CatalogRow {
            selected: marker(selected.as_deref() == Some(project.id.as_str())),
            id: project.id,
            name: project.name,
        })
        .collect();

    print_output(&rows, ctx.format)?;
    Ok(())
}

async fn select_project(ctx: &Context, integration: &Integration, id: String) -> Result<()> {
    let target = integration.target();
    let Some(project) = target
        .projects()
        .unwrap_or_default()
        .into_iter()
        .find(|project| project.id == id)
    else {
        bail!("Unknown project {} in {}", id, target.name());
    };

    integration.select_project(&project.id).await;
    print_success(&format!("Selected project {} ({})", project.name, project.id), ctx.quiet);
    Ok(())
}

fn list_tasks(ctx: &Context, integration: &Integration) -> Result<()> {
    let target = integration.target();
    let selected = target.selected_task();
    let rows: Vec<CatalogRow> = target
        .tasks()
        .unwrap_or_default()
        .into_iter()
        .map(|task| CatalogRow {
            selected: marker(selected.as_deref() == Some(task.id.as_str())),
            id: task.id,
            name: task.name,
        })
        .collect();

    print_output(&rows, ctx.format)?;
    Ok(())
}

async fn select_task(ctx: &Context, integration: &Integration, id: String) -> Result<()> {
    let target = integration.target();
    let Some(task) = target
        .tasks()
        .unwrap_or_default()
        .into_iter()
        .find(|task| task.id == id)
    else {
        bail!("Unknown task {} in {}", id, target.name());
    };

    integration.select_task(&task.id).await;
    print_success(&format!("Selected task {} ({})", task.name, task.id), ctx.quiet);
    Ok(())
}

fn marker(selected: bool) -> String {
    if selected { "*" } else { "" }.to_string()
}
