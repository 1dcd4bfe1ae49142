//! Colored console output for scan results.

use crate::scanner::{ScanProgress, ScanSummary};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Console output handler with colors and formatting.
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool) -> Self {
        Self { verbose, json_mode }
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, library_name: &str, source: &str) {
        if self.json_mode {
            return;
        }

        println!(
            "{} Looking for repositories using {} ({})",
            "[*]".bright_blue(),
            library_name.bright_white(),
            source.dimmed()
        );
    }

    /// Create a spinner reporting how many dependents were found so far.
    pub fn create_spinner(&self) -> Option<ProgressBar> {
        if self.json_mode {
            return None;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        Some(spinner)
    }

    /// Refresh the spinner message from the live progress.
    pub fn update_spinner(&self, spinner: &ProgressBar, progress: &ScanProgress) {
        spinner.set_message(format!("{} dependent repositories found", progress.len()));
    }

    /// Print the sorted list of dependents and the scan statistics.
    pub fn print_summary(&self, library_name: &str, repositories: &[String], summary: &ScanSummary) {
        if self.json_mode {
            return;
        }

        let mut sorted = repositories.to_vec();
        sorted.sort();

        println!();
        println!("{}", "=== Scan Summary ===".bright_cyan());
        if sorted.is_empty() {
            println!(
                "  {}",
                format!("No repositories found using {} dependencies.", library_name).yellow()
            );
        } else {
            println!(
                "  {}",
                format!("The following repositories use {} dependencies:", library_name).green()
            );
            for repo in &sorted {
                println!("    - {}", repo.bright_white());
            }
        }

        if self.verbose {
            println!();
            println!("  From cache: {}", summary.cached_dependents);
            println!("  Scanned:    {}", summary.scanned);
            println!("  Duration:   {:.2}s", summary.duration_ms as f64 / 1000.0);
        }
        println!();
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false)
    }
}
