//! LibreOffice (`soffice --headless`) as the spreadsheet application
//!
//! Open workbooks are staged as xlsx copies in a private temporary directory.
//! Visibility changes are applied to the staged copy with the xlsx writer and
//! format conversions go through `soffice --convert-to`.

use super::{FileFormat, SpreadsheetApp, SpreadsheetLauncher, WorkbookId};
use crate::error::{AutoSpecError, Result};
use crate::reader::SheetState;
use crate::writer;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

/// Starts [`SofficeApp`] instances from a LibreOffice executable
#[derive(Debug, Clone)]
pub struct SofficeLauncher {
    binary: PathBuf,
}

impl SofficeLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for SofficeLauncher {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl SpreadsheetLauncher for SofficeLauncher {
    fn launch(&self) -> Result<Box<dyn SpreadsheetApp>> {
        Ok(Box::new(SofficeApp::start(&self.binary)?))
    }
}

#[derive(Debug)]
struct StagedWorkbook {
    /// File the workbook saves to
    path: PathBuf,
    format: FileFormat,
    /// Working xlsx copy
    staged: PathBuf,
    pending: HashMap<String, SheetState>,
}

#[derive(Debug)]
pub struct SofficeApp {
    binary: PathBuf,
    staging: Option<TempDir>,
    workbooks: HashMap<WorkbookId, StagedWorkbook>,
    next_id: usize,
}

impl SofficeApp {
    /// Check that the executable runs and create the staging directory
    pub fn start(binary: &Path) -> Result<Self> {
        let unavailable = |reason: String| AutoSpecError::AppUnavailable {
            command: binary.display().to_string(),
            reason,
        };

        let output = Command::new(binary)
            .arg("--version")
            .output()
            .map_err(|e| unavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let staging = tempfile::Builder::new().prefix("autospec-").tempdir()?;
        debug!(binary = %binary.display(), staging = %staging.path().display(), "started soffice session");

        Ok(Self {
            binary: binary.to_path_buf(),
            staging: Some(staging),
            workbooks: HashMap::new(),
            next_id: 0,
        })
    }

    fn staging_dir(&self) -> Result<&Path> {
        self.staging
            .as_ref()
            .map(|dir| dir.path())
            .ok_or_else(|| AutoSpecError::App("application instance has quit".to_string()))
    }

    fn workbook(&self, id: WorkbookId) -> Result<&StagedWorkbook> {
        self.workbooks
            .get(&id)
            .ok_or_else(|| AutoSpecError::App(format!("unknown workbook handle {}", id.0)))
    }

    fn workbook_mut(&mut self, id: WorkbookId) -> Result<&mut StagedWorkbook> {
        self.workbooks
            .get_mut(&id)
            .ok_or_else(|| AutoSpecError::App(format!("unknown workbook handle {}", id.0)))
    }

    /// Convert `input` with `soffice --convert-to` and place the result at `target`
    fn convert(&self, input: &Path, format: FileFormat, target: &Path) -> Result<()> {
        let out_dir = self.staging_dir()?.join("out");
        fs::create_dir_all(&out_dir)?;

        let filter = match format {
            FileFormat::Xlsx => "xlsx:Calc MS Excel 2007 XML",
            FileFormat::Xls => "xls:MS Excel 97",
        };

        debug!(input = %input.display(), target = %target.display(), filter, "converting workbook");
        let output = Command::new(&self.binary)
            .args(["--headless", "--norestore", "--convert-to", filter, "--outdir"])
            .arg(&out_dir)
            .arg(input)
            .output()
            .map_err(|e| AutoSpecError::App(format!("failed to run {}: {}", self.binary.display(), e)))?;

        let mut produced_name: OsString = input.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        produced_name.push(".");
        produced_name.push(format.extension());
        let produced = out_dir.join(produced_name);

        // soffice may exit with 0 without writing anything
        if !output.status.success() || !produced.is_file() {
            return Err(AutoSpecError::App(format!(
                "conversion of {} to {} failed: {}",
                input.display(),
                format.extension(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        fs::copy(&produced, target)?;
        fs::remove_file(&produced)?;
        Ok(())
    }

    fn flush(&mut self, id: WorkbookId) -> Result<()> {
        let workbook = self.workbook_mut(id)?;
        if !workbook.pending.is_empty() {
            writer::set_sheet_states_in_place(&workbook.staged, &workbook.pending)?;
            workbook.pending.clear();
        }
        Ok(())
    }

    fn export(&self, id: WorkbookId, target: &Path, format: FileFormat) -> Result<()> {
        let staged = &self.workbook(id)?.staged;
        match format {
            FileFormat::Xlsx => {
                fs::copy(staged, target)?;
            }
            FileFormat::Xls => self.convert(staged, FileFormat::Xls, target)?,
        }
        Ok(())
    }
}

impl SpreadsheetApp for SofficeApp {
    fn open(&mut self, path: &Path) -> Result<WorkbookId> {
        let format = FileFormat::from_path(path)
            .ok_or_else(|| AutoSpecError::UnsupportedFormat(path.to_path_buf()))?;
        if !path.is_file() {
            return Err(AutoSpecError::SourceMissing(path.to_path_buf()));
        }

        let id = WorkbookId(self.next_id);
        let staged = self.staging_dir()?.join(format!("wb{}.xlsx", id.0));
        match format {
            FileFormat::Xlsx => {
                fs::copy(path, &staged)?;
            }
            FileFormat::Xls => self.convert(path, FileFormat::Xlsx, &staged)?,
        }

        self.next_id += 1;
        self.workbooks.insert(
            id,
            StagedWorkbook {
                path: path.to_path_buf(),
                format,
                staged,
                pending: HashMap::new(),
            },
        );
        Ok(id)
    }

    fn sheet_names(&mut self, workbook: WorkbookId) -> Result<Vec<String>> {
        let sheets = writer::read_sheet_states(&self.workbook(workbook)?.staged)?;
        Ok(sheets.into_iter().map(|s| s.name).collect())
    }

    fn set_sheet_visible(&mut self, workbook: WorkbookId, sheet: &str, visible: bool) -> Result<()> {
        if !self.sheet_names(workbook)?.iter().any(|name| name == sheet) {
            return Err(AutoSpecError::App(format!("no worksheet named \"{}\"", sheet)));
        }

        let state = if visible {
            SheetState::Visible
        } else {
            SheetState::Hidden
        };
        self.workbook_mut(workbook)?
            .pending
            .insert(sheet.to_string(), state);
        Ok(())
    }

    fn save(&mut self, workbook: WorkbookId) -> Result<()> {
        self.flush(workbook)?;
        let (path, format) = {
            let wb = self.workbook(workbook)?;
            (wb.path.clone(), wb.format)
        };
        self.export(workbook, &path, format)
    }

    fn save_as(&mut self, workbook: WorkbookId, path: &Path, format: FileFormat) -> Result<()> {
        self.flush(workbook)?;
        self.export(workbook, path, format)?;

        let wb = self.workbook_mut(workbook)?;
        wb.path = path.to_path_buf();
        wb.format = format;
        Ok(())
    }

    fn close(&mut self, workbook: WorkbookId, save_changes: bool) -> Result<()> {
        if save_changes {
            self.save(workbook)?;
        }

        if let Some(wb) = self.workbooks.remove(&workbook) {
            fs::remove_file(&wb.staged)?;
        }
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.workbooks.clear();
        if let Some(staging) = self.staging.take() {
            staging.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = SofficeLauncher::new(dir.path().join("no-such-soffice"));

        match launcher.launch() {
            Err(AutoSpecError::AppUnavailable { command, .. }) => {
                assert!(command.contains("no-such-soffice"));
            }
            Err(other) => panic!("expected AppUnavailable, got {:?}", other),
            Ok(_) => panic!("launch should fail"),
        }
    }

    #[test]
    fn test_default_binary() {
        assert_eq!(SofficeLauncher::default().binary(), Path::new("soffice"));
    }
}
