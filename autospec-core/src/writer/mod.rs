//! Worksheet visibility changes for workbook files

mod xlsx_writer;

pub use xlsx_writer::{apply_sheet_states_xlsx, read_sheet_states_xlsx};

use crate::error::{AutoSpecError, Result};
use crate::reader::{SheetInfo, SheetState};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a copy of a workbook with the given sheet states applied
pub fn set_sheet_states<P: AsRef<Path>>(
    input_path: P,
    output_path: P,
    states: &HashMap<String, SheetState>,
) -> Result<()> {
    let input = input_path.as_ref();

    match extension(input).as_deref() {
        Some("xlsx") => apply_sheet_states_xlsx(input, output_path.as_ref(), states),
        _ => Err(AutoSpecError::UnsupportedFormat(input.to_path_buf())),
    }
}

/// Apply sheet states to a workbook, replacing the file
pub fn set_sheet_states_in_place<P: AsRef<Path>>(
    path: P,
    states: &HashMap<String, SheetState>,
) -> Result<()> {
    let path = path.as_ref();
    let staging = staging_path(path);

    set_sheet_states(path, staging.as_path(), states)?;
    fs::rename(&staging, path)?;
    Ok(())
}

/// Write a copy of a workbook where only `sheet` is visible.
///
/// Fails with `MissingSheet` before anything is written when the workbook has
/// no sheet of that exact name.
pub fn show_only_sheet<P: AsRef<Path>>(input_path: P, output_path: P, sheet: &str) -> Result<()> {
    let input = input_path.as_ref();
    let states = visibility_plan(input, &read_sheet_states(input)?, sheet)?;
    set_sheet_states(input, output_path.as_ref(), &states)
}

/// List sheets of an xlsx workbook from its own package metadata
pub fn read_sheet_states<P: AsRef<Path>>(path: P) -> Result<Vec<SheetInfo>> {
    let path = path.as_ref();

    match extension(path).as_deref() {
        Some("xlsx") => read_sheet_states_xlsx(path),
        _ => Err(AutoSpecError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// States that leave `keep` as the only visible sheet
pub fn visibility_plan(
    path: &Path,
    sheets: &[SheetInfo],
    keep: &str,
) -> Result<HashMap<String, SheetState>> {
    if !sheets.iter().any(|s| s.name == keep) {
        return Err(AutoSpecError::MissingSheet {
            sheet: keep.to_string(),
            path: path.to_path_buf(),
        });
    }

    Ok(sheets
        .iter()
        .map(|s| {
            let state = if s.name == keep {
                SheetState::Visible
            } else {
                SheetState::Hidden
            };
            (s.name.clone(), state)
        })
        .collect())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial.xlsx");
    path.with_file_name(name)
}
