//! Timesync CLI - Reconcile and sync time entries
//!
//! A command-line interface for connecting a source and a target tracker,
//! reviewing their differences and applying them to the target.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "timesync")]
#[command(author, version, about = "Time entry reconciliation and sync CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log engine activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Override database path (or set TIMESYNC_DB_PATH env var)
    #[arg(long, env = "TIMESYNC_DB_PATH", global = true)]
    db: Option<String>,

    /// Platform name of the source system
    #[arg(long, env = "TIMESYNC_SOURCE_NAME", global = true, default_value = "source")]
    source_name: String,

    /// Platform name of the target system
    #[arg(long, env = "TIMESYNC_TARGET_NAME", global = true, default_value = "target")]
    target_name: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, disconnect and inspect the two systems
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },

    /// List and select target projects
    Project {
        #[command(subcommand)]
        action: commands::catalog::ProjectAction,
    },

    /// List and select target tasks
    Task {
        #[command(subcommand)]
        action: commands::catalog::TaskAction,
    },

    /// Show the entries the next sync would create or delete
    Diff(commands::diff::DiffArgs),

    /// Apply the differences to the target
    Sync(commands::sync::SyncArgs),

    /// Show previous sync runs
    History {
        /// Number of runs to show
        #[arg(long, short, default_value = "20")]
        limit: i64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Set up database path if provided
    if let Some(db_path) = &cli.db {
        std::env::set_var(timesync_core::db::DB_PATH_ENV, db_path);
    }

    // Initialize database
    let db = timesync_core::Database::new().await?;

    // Create context for commands
    let ctx = commands::Context {
        db,
        format: cli.format,
        quiet: cli.quiet,
        source_name: cli.source_name,
        target_name: cli.target_name,
    };

    // Execute command
    match cli.command {
        Commands::Auth { action } => commands::auth::execute(&ctx, action).await,
        Commands::Project { action } => commands::catalog::execute_project(&ctx, action).await,
        Commands::Task { action } => commands::catalog::execute_task(&ctx, action).await,
        Commands::Diff(args) => commands::diff::execute(&ctx, args).await,
        Commands::Sync(args) => commands::sync::execute(&ctx, args).await,
        Commands::History { limit } => commands::history::execute(&ctx, limit).await,
        Commands::Config { action } => commands::config::execute(&ctx, action).await,
    }
}
