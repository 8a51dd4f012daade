//! Worksheet listing for xlsx and legacy xls files using calamine

use crate::error::Result;
use calamine::{Reader, SheetVisible, open_workbook_auto};
use std::path::Path;

pub mod workbook;

pub use workbook::{SheetInfo, SheetState};

/// List worksheets with their visibility, in tab order
pub fn list_sheets<P: AsRef<Path>>(path: P) -> Result<Vec<SheetInfo>> {
    let workbook = open_workbook_auto(path.as_ref())?;

    let sheets = workbook
        .sheets_metadata()
        .iter()
        .map(|sheet| {
            let state = match sheet.visible {
                SheetVisible::Visible => SheetState::Visible,
                SheetVisible::Hidden => SheetState::Hidden,
                SheetVisible::VeryHidden => SheetState::VeryHidden,
            };
            SheetInfo::new(sheet.name.clone(), state)
        })
        .collect();

    Ok(sheets)
}
