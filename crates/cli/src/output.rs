//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use met_core::MetClass;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or nothing but a notice when empty
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Color confidence relative to the gate threshold
pub fn color_confidence(confidence: f32, threshold: f32) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= threshold {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a class by intensity
pub fn color_class(met_class: MetClass) -> String {
    let label = met_class.label();
    match met_class {
        MetClass::Sedentary => label.dimmed().to_string(),
        MetClass::Light => label.cyan().to_string(),
        MetClass::Moderate => label.yellow().to_string(),
        MetClass::Vigorous => label.red().bold().to_string(),
    }
}
