//! autospec-core: invoice selection and specification copies
//!
//! Invoice folders live under one base directory and are named after their
//! invoice number (`5 Acme`, `6 Globex`, ...). A range expression picks the
//! invoices, and one scenario runs per folder: a redacted `.xlsx` copy of the
//! invoice workbook, a redacted `.xls` copy made through a spreadsheet
//! application, or the removal of earlier copies.

pub mod batch;
pub mod config;
pub mod error;
pub mod matcher;
pub mod office;
pub mod range;
pub mod reader;
pub mod scenario;
pub mod writer;

use std::path::{Path, PathBuf};

pub use batch::{BatchObserver, BatchRunner, BatchSummary, Silent};
pub use config::AppConfig;
pub use error::{AutoSpecError, Result};
pub use matcher::{MatchedInvoice, extract_number, find_matches};
pub use range::{InvoiceSet, format_ranges, parse_ranges};
pub use scenario::{Scenario, ScenarioExecutor, ScenarioResult};

use office::SpreadsheetLauncher;

/// Entry point for running scenarios over a base directory
pub struct InvoiceProcessor {
    base_dir: PathBuf,
    executor: ScenarioExecutor,
}

impl InvoiceProcessor {
    pub fn new(base_dir: impl Into<PathBuf>, launcher: Box<dyn SpreadsheetLauncher>) -> Self {
        Self {
            base_dir: base_dir.into(),
            executor: ScenarioExecutor::new(launcher),
        }
    }

    /// Build a processor for the configured base directory
    pub fn from_config(config: &AppConfig, launcher: Box<dyn SpreadsheetLauncher>) -> Result<Self> {
        Ok(Self::new(config.base_dir()?, launcher))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Invoice folders for the wanted numbers (`None` means any number).
    ///
    /// An empty selection is a `NoMatch` error.
    pub fn select(&self, wanted: Option<&InvoiceSet>) -> Result<Vec<MatchedInvoice>> {
        let matches = find_matches(&self.base_dir, wanted)?;
        if matches.is_empty() {
            let requested = match wanted {
                Some(set) if !set.is_empty() => format!("invoices {}", format_ranges(set)),
                Some(_) => "an empty selection".to_string(),
                None => "any invoice number".to_string(),
            };
            return Err(AutoSpecError::NoMatch { requested });
        }
        Ok(matches)
    }

    /// Select the invoices and run the scenario on each of them
    pub fn run(
        &self,
        scenario: Scenario,
        wanted: Option<&InvoiceSet>,
        observer: &mut dyn BatchObserver,
    ) -> Result<BatchSummary> {
        let invoices = self.select(wanted)?;
        Ok(self.run_selected(scenario, invoices, observer))
    }

    /// Run the scenario on an already selected list of invoices
    pub fn run_selected(
        &self,
        scenario: Scenario,
        invoices: Vec<MatchedInvoice>,
        observer: &mut dyn BatchObserver,
    ) -> BatchSummary {
        BatchRunner::new(scenario).run(invoices, observer, |invoice| {
            self.executor.execute(scenario, invoice)
        })
    }
}
