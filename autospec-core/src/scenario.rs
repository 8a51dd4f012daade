//! The three per-invoice scenarios and the file naming they rely on

use crate::error::{AutoSpecError, Result};
use crate::matcher::MatchedInvoice;
use crate::office::{AppSession, FileFormat, SpreadsheetApp, SpreadsheetLauncher, WorkbookId};
use crate::writer;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The only worksheet left visible in a specification copy
pub const SPEC_SHEET_NAME: &str = "Specification";

/// Base-name suffix that marks generated copies
pub const GENERATED_SUFFIX: &str = "fcs";

/// A batch operation applied to each selected invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Copy the workbook as `.xlsx` with only the specification visible
    RedactXlsx,
    /// Save the workbook as legacy `.xls` with only the specification visible
    RedactXls,
    /// Remove previously generated copies
    DeleteCopies,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Scenario::RedactXlsx => "specification copy (XLSX)",
            Scenario::RedactXls => "specification copy (XLS)",
            Scenario::DeleteCopies => "delete generated copies",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of one scenario run on one invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioResult {
    /// `count` is the number of files deleted, for the deletion scenario
    Success { count: Option<usize> },
    Failure { cause: String },
}

impl ScenarioResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ScenarioResult::Success { .. })
    }
}

/// `Invoice {number}.xlsx` inside the invoice folder
pub fn source_workbook(folder: &Path, number: u64) -> PathBuf {
    folder.join(format!("Invoice {}.xlsx", number))
}

/// `Invoice {number} fcs.{ext}` inside the invoice folder
pub fn specification_copy(folder: &Path, number: u64, format: FileFormat) -> PathBuf {
    folder.join(format!(
        "Invoice {} {}.{}",
        number,
        GENERATED_SUFFIX,
        format.extension()
    ))
}

/// Whether a file name looks like a generated copy: an xlsx/xls file whose
/// base name ends in `fcs`, compared case-insensitively
pub fn is_generated_copy(path: &Path) -> bool {
    if FileFormat::from_path(path).is_none() {
        return false;
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.to_lowercase().ends_with(GENERATED_SUFFIX))
}

/// Copy the source workbook to `Invoice {n} fcs.xlsx` showing only the
/// specification sheet. The source is never modified; nothing is written when
/// the specification sheet is missing.
pub fn redact_same_format(folder: &Path, number: u64) -> Result<PathBuf> {
    let source = require_source(folder, number)?;
    let target = specification_copy(folder, number, FileFormat::Xlsx);

    debug!(source = %source.display(), target = %target.display(), "redacting workbook");
    writer::show_only_sheet(source.as_path(), target.as_path(), SPEC_SHEET_NAME)?;
    Ok(target)
}

/// Save the source workbook as `Invoice {n} fcs.xls` through the application,
/// then reopen the copy and leave only the specification sheet visible. When
/// any step after the save fails, the copy is removed again so no unredacted
/// file is left under the generated name.
pub fn redact_with_conversion(app: &mut dyn SpreadsheetApp, folder: &Path, number: u64) -> Result<PathBuf> {
    let source = require_source(folder, number)?;
    let target = specification_copy(folder, number, FileFormat::Xls);

    let workbook = app.open(&source)?;
    if let Err(e) = convert_and_redact(app, workbook, &source, &target) {
        discard_copy(&target);
        return Err(e);
    }

    Ok(target)
}

fn convert_and_redact(
    app: &mut dyn SpreadsheetApp,
    workbook: WorkbookId,
    source: &Path,
    target: &Path,
) -> Result<()> {
    app.save_as(workbook, target, FileFormat::Xls)?;
    app.close(workbook, false)?;

    let workbook = app.open(target)?;
    let names = app.sheet_names(workbook)?;
    if !names.iter().any(|name| name == SPEC_SHEET_NAME) {
        app.close(workbook, false)?;
        return Err(AutoSpecError::MissingSheet {
            sheet: SPEC_SHEET_NAME.to_string(),
            path: source.to_path_buf(),
        });
    }

    // The kept sheet goes first so the workbook always has a visible sheet
    app.set_sheet_visible(workbook, SPEC_SHEET_NAME, true)?;
    for name in names.iter().filter(|name| *name != SPEC_SHEET_NAME) {
        app.set_sheet_visible(workbook, name, false)?;
    }
    app.save(workbook)?;
    app.close(workbook, false)
}

fn discard_copy(target: &Path) {
    if !target.exists() {
        return;
    }
    match fs::remove_file(target) {
        Ok(()) => debug!(file = %target.display(), "removed incomplete copy"),
        Err(e) => warn!(file = %target.display(), error = %e, "could not remove incomplete copy"),
    }
}

/// Delete generated copies directly inside the folder, returning how many.
///
/// A copy that cannot be removed does not stop the others; the error then
/// reports how many were deleted and which files remain.
pub fn delete_generated_copies(folder: &Path) -> Result<usize> {
    delete_copies_with(folder, |path| fs::remove_file(path))
}

fn delete_copies_with<F>(folder: &Path, mut remove: F) -> Result<usize>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut deleted = 0;
    let mut failed = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() || !is_generated_copy(&path) {
            continue;
        }

        match remove(&path) {
            Ok(()) => {
                debug!(file = %path.display(), "deleted generated copy");
                deleted += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not delete generated copy");
                failed.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    if failed.is_empty() {
        Ok(deleted)
    } else {
        Err(AutoSpecError::DeleteIncomplete { deleted, failed })
    }
}

fn require_source(folder: &Path, number: u64) -> Result<PathBuf> {
    let source = source_workbook(folder, number);
    if source.is_file() {
        Ok(source)
    } else {
        Err(AutoSpecError::SourceMissing(source))
    }
}

/// Runs scenarios on single invoices
pub struct ScenarioExecutor {
    launcher: Box<dyn SpreadsheetLauncher>,
}

impl ScenarioExecutor {
    pub fn new(launcher: Box<dyn SpreadsheetLauncher>) -> Self {
        Self { launcher }
    }

    /// Run one scenario, turning any error into a failure result
    pub fn execute(&self, scenario: Scenario, invoice: &MatchedInvoice) -> ScenarioResult {
        let outcome = match scenario {
            Scenario::RedactXlsx => redact_same_format(&invoice.folder, invoice.number).map(|_| None),
            Scenario::RedactXls => self.convert(invoice).map(|_| None),
            Scenario::DeleteCopies => delete_generated_copies(&invoice.folder).map(Some),
        };

        match outcome {
            Ok(count) => {
                info!(number = invoice.number, %scenario, ?count, "invoice processed");
                ScenarioResult::Success { count }
            }
            Err(e) => {
                debug!(number = invoice.number, %scenario, error = %e, "scenario failed");
                ScenarioResult::Failure {
                    cause: e.to_string(),
                }
            }
        }
    }

    /// One application instance per invoice, quit whether or not the
    /// conversion succeeds
    fn convert(&self, invoice: &MatchedInvoice) -> Result<PathBuf> {
        require_source(&invoice.folder, invoice.number)?;

        let mut session = AppSession::start(self.launcher.as_ref())?;
        let target = redact_with_conversion(session.app(), &invoice.folder, invoice.number)?;
        session.finish()?;
        Ok(target)
    }
}
