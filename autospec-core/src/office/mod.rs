//! Spreadsheet application automation
//!
//! The conversion scenario needs an application that can open a workbook,
//! save it in another format and toggle sheet visibility. [`SpreadsheetApp`]
//! is that capability surface; [`AppSession`] owns one running instance and
//! quits it on every exit path.

pub mod soffice;

use crate::error::Result;
use std::path::Path;
use tracing::warn;

pub use soffice::{SofficeApp, SofficeLauncher};

/// Workbook file formats the application is asked to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Office Open XML workbook (`.xlsx`)
    Xlsx,
    /// Legacy Excel 97-2003 binary workbook (`.xls`)
    Xls,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Xlsx => "xlsx",
            FileFormat::Xls => "xls",
        }
    }

    /// Format implied by a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(FileFormat::Xlsx),
            "xls" => Some(FileFormat::Xls),
            _ => None,
        }
    }
}

/// Handle of a workbook opened in a [`SpreadsheetApp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkbookId(pub usize);

/// Operations the conversion scenario needs from a spreadsheet application
pub trait SpreadsheetApp {
    fn open(&mut self, path: &Path) -> Result<WorkbookId>;

    /// Worksheet names in tab order
    fn sheet_names(&mut self, workbook: WorkbookId) -> Result<Vec<String>>;

    fn set_sheet_visible(&mut self, workbook: WorkbookId, sheet: &str, visible: bool) -> Result<()>;

    /// Save to the file the workbook currently refers to
    fn save(&mut self, workbook: WorkbookId) -> Result<()>;

    /// Save under a new path and format; the workbook then refers to that file
    fn save_as(&mut self, workbook: WorkbookId, path: &Path, format: FileFormat) -> Result<()>;

    fn close(&mut self, workbook: WorkbookId, save_changes: bool) -> Result<()>;

    /// Release the application instance
    fn quit(&mut self) -> Result<()>;
}

/// Starts application instances
pub trait SpreadsheetLauncher {
    fn launch(&self) -> Result<Box<dyn SpreadsheetApp>>;
}

/// A running application instance that is quit when the session ends
pub struct AppSession {
    app: Box<dyn SpreadsheetApp>,
    finished: bool,
}

impl AppSession {
    pub fn start(launcher: &dyn SpreadsheetLauncher) -> Result<Self> {
        Ok(Self {
            app: launcher.launch()?,
            finished: false,
        })
    }

    pub fn app(&mut self) -> &mut dyn SpreadsheetApp {
        self.app.as_mut()
    }

    /// Quit the instance, reporting a failure to do so
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.app.quit()
    }
}

impl Drop for AppSession {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.app.quit() {
                warn!(error = %e, "failed to quit spreadsheet application");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct CountingApp(Rc<RefCell<usize>>);

    impl SpreadsheetApp for CountingApp {
        fn open(&mut self, _path: &Path) -> Result<WorkbookId> {
            Ok(WorkbookId(0))
        }
        fn sheet_names(&mut self, _workbook: WorkbookId) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn set_sheet_visible(&mut self, _: WorkbookId, _: &str, _: bool) -> Result<()> {
            Ok(())
        }
        fn save(&mut self, _workbook: WorkbookId) -> Result<()> {
            Ok(())
        }
        fn save_as(&mut self, _: WorkbookId, _: &Path, _: FileFormat) -> Result<()> {
            Ok(())
        }
        fn close(&mut self, _: WorkbookId, _: bool) -> Result<()> {
            Ok(())
        }
        fn quit(&mut self) -> Result<()> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    struct CountingLauncher(Rc<RefCell<usize>>);

    impl SpreadsheetLauncher for CountingLauncher {
        fn launch(&self) -> Result<Box<dyn SpreadsheetApp>> {
            Ok(Box::new(CountingApp(self.0.clone())))
        }
    }

    #[test]
    fn test_session_quits_once_on_finish() {
        let quits = Rc::new(RefCell::new(0));
        let session = AppSession::start(&CountingLauncher(quits.clone())).unwrap();
        session.finish().unwrap();
        assert_eq!(*quits.borrow(), 1);
    }

    #[test]
    fn test_session_quits_on_drop() {
        let quits = Rc::new(RefCell::new(0));
        {
            let mut session = AppSession::start(&CountingLauncher(quits.clone())).unwrap();
            session.app().open(Path::new("a.xlsx")).unwrap();
        }
        assert_eq!(*quits.borrow(), 1);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(&PathBuf::from("a.XLS")), Some(FileFormat::Xls));
        assert_eq!(FileFormat::from_path(&PathBuf::from("a.xlsx")), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_path(&PathBuf::from("a.ods")), None);
    }
}
