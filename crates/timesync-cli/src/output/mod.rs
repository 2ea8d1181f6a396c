//! Output formatting module
//!
//! Provides table and JSON output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Display;
use tabled::{Table, Tabled};
use timesync_core::{Alert, AlertKind};

/// Output format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use 'table' or 'json'", s)),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Print data in the specified format
pub fn print_output<T>(data: &[T], format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("No items found.");
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Print a success message (respects quiet mode)
pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message.green());
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Print an info message (respects quiet mode)
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}

/// Print an alert raised by the sync engine
///
/// Errors are always shown; everything else respects quiet mode.
pub fn print_alert(alert: &Alert, quiet: bool) {
    match alert.kind {
        AlertKind::Success => print_success(&alert.message, quiet),
        AlertKind::Info => print_info(&alert.message, quiet),
        AlertKind::Warning => {
            if !quiet {
                println!("{}", alert.message.yellow());
            }
        }
        AlertKind::Error => print_error(&alert.message),
    }
}

/// Format seconds as `H:MM:SS`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}:{:02}", seconds / 3600, seconds % 3600 / 60, seconds % 60)
}

/// Yes/no marker for table cells
pub fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}
