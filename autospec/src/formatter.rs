//! Console output for batches and workbook listings

use anyhow::Result;
use autospec_core::reader::SheetInfo;
use autospec_core::{BatchObserver, BatchSummary, MatchedInvoice, Scenario, ScenarioResult};
use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Prints one status line per invoice as the batch runs
pub struct Progress<W: Write> {
    out: W,
}

impl<W: Write> Progress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> BatchObserver for Progress<W> {
    fn started(&mut self, invoice: &MatchedInvoice) {
        let line = format!("[IN PROGRESS] Invoice {}", invoice.number);
        // A closed console must not abort the batch
        let _ = writeln!(self.out, "{}", line.yellow());
    }

    fn finished(&mut self, invoice: &MatchedInvoice, result: &ScenarioResult) {
        let line = match result {
            ScenarioResult::Success { count: Some(deleted) } => {
                format!("[DONE] Invoice {} ({} deleted)", invoice.number, deleted).green()
            }
            ScenarioResult::Success { count: None } => {
                format!("[DONE] Invoice {}", invoice.number).green()
            }
            ScenarioResult::Failure { cause } => {
                format!("[ERROR] Invoice {}: {}", invoice.number, cause).red()
            }
        };
        let _ = writeln!(self.out, "{}", line);
    }
}

/// Closing lines of a batch
pub fn write_summary<W: Write>(out: &mut W, summary: &BatchSummary) -> io::Result<()> {
    writeln!(out)?;
    let done = format!(
        "Done! Processed invoices: {} of {}",
        summary.processed, summary.matched
    );
    writeln!(out, "{}", done.green().bold())?;

    if summary.scenario == Scenario::DeleteCopies {
        writeln!(out, "{}", format!("Deleted files: {}", summary.deleted).green())?;
    }

    if !summary.is_success() {
        let failed: Vec<String> = summary.failures.iter().map(|f| f.number.to_string()).collect();
        writeln!(
            out,
            "{}",
            format!("Failed invoices: {}", failed.join(", ")).red().bold()
        )?;
    }

    Ok(())
}

/// Print a batch summary as JSON
pub fn print_json(summary: &BatchSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{}", json);
    Ok(())
}

#[derive(Serialize)]
struct SheetReport<'a> {
    file: &'a Path,
    sheets: &'a [SheetInfo],
}

/// Print worksheet names and visibility, one per line
pub fn print_sheets_human(file_path: &Path, sheets: &[SheetInfo]) {
    println!("{}", format!("Workbook: {}", file_path.display()).bold());
    println!();

    let width = sheets.iter().map(|s| s.name.chars().count()).max().unwrap_or(0);
    for sheet in sheets {
        let state = sheet.state.to_string();
        let state = if sheet.state.is_visible() {
            state.green()
        } else {
            state.dimmed()
        };
        println!("  {:<width$}  {}", sheet.name.cyan(), state, width = width);
    }

    println!();
    let visible = sheets.iter().filter(|s| s.state.is_visible()).count();
    println!(
        "{} worksheet(s), {} visible",
        sheets.len().to_string().bold(),
        visible.to_string().bold()
    );
}

pub fn print_sheets_json(file_path: &Path, sheets: &[SheetInfo]) -> Result<()> {
    let report = SheetReport {
        file: file_path,
        sheets,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
