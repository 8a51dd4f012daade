// ! XLSX writer functionality for changing worksheet visibility

use crate::error::{AutoSpecError, Result};
use crate::reader::{SheetInfo, SheetState};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// A `<sheet>` entry of workbook.xml
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    state: SheetState,
    rel_id: Option<String>,
}

/// Read worksheet names and visibility straight from workbook.xml
pub fn read_sheet_states_xlsx(path: &Path) -> Result<Vec<SheetInfo>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let workbook_xml = read_file_from_zip(&mut archive, WORKBOOK_PART)?;

    Ok(parse_sheet_entries(&workbook_xml)?
        .into_iter()
        .map(|entry| SheetInfo::new(entry.name, entry.state))
        .collect())
}

/// Copy an XLSX file to `output_path`, giving the named sheets a new state.
///
/// Sheets missing from `states` keep their state. Parts other than the
/// workbook and the affected worksheets are copied without recompression. The
/// workbook view is moved to a visible sheet when its active tab gets hidden.
pub fn apply_sheet_states_xlsx(
    input_path: &Path,
    output_path: &Path,
    states: &HashMap<String, SheetState>,
) -> Result<()> {
    let file = File::open(input_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let workbook_xml = read_file_from_zip(&mut archive, WORKBOOK_PART)?;
    let sheets = parse_sheet_entries(&workbook_xml)?;

    let final_states: Vec<SheetState> = sheets
        .iter()
        .map(|sheet| states.get(&sheet.name).copied().unwrap_or(sheet.state))
        .collect();

    let first_visible = final_states
        .iter()
        .position(|state| state.is_visible())
        .ok_or_else(|| AutoSpecError::NoVisibleSheet(input_path.to_path_buf()))?;

    let active = parse_active_tab(&workbook_xml)?;
    let new_active = if final_states.get(active).is_some_and(|s| s.is_visible()) {
        active
    } else {
        first_visible
    };

    // Worksheet part -> desired tabSelected flag
    let rels = match read_optional_file_from_zip(&mut archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let mut tab_selection: HashMap<String, bool> = HashMap::new();
    for (index, (sheet, state)) in sheets.iter().zip(&final_states).enumerate() {
        let Some(part) = sheet
            .rel_id
            .as_ref()
            .and_then(|id| rels.get(id))
            .map(|target| resolve_part(target))
        else {
            continue;
        };

        if !state.is_visible() {
            tab_selection.insert(part, false);
        } else if index == new_active && new_active != active {
            tab_selection.insert(part, true);
        }
    }

    let workbook_content = rewrite_workbook_xml(&workbook_xml, &final_states, active, new_active)?;

    debug!(
        input = %input_path.display(),
        output = %output_path.display(),
        active_tab = new_active,
        "writing workbook with new sheet states"
    );

    let output_file = File::create(output_path)?;
    let written = write_archive(&mut archive, output_file, &workbook_content, &tab_selection);
    if written.is_err() {
        let _ = fs::remove_file(output_path);
    }
    written
}

fn write_archive<R: Read + Seek, W: Write + Seek>(
    archive: &mut ZipArchive<R>,
    output: W,
    workbook_content: &[u8],
    tab_selection: &HashMap<String, bool>,
) -> Result<()> {
    let mut zip_writer = ZipWriter::new(output);

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        if name == WORKBOOK_PART {
            zip_writer.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip_writer.write_all(workbook_content)?;
        } else if let Some(&selected) = tab_selection.get(&name) {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            let modified_content = set_tab_selected(&content, selected)?;
            zip_writer.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip_writer.write_all(&modified_content)?;
        } else {
            // Copy compressed bytes as is
            zip_writer.raw_copy_file(file)?;
        }
    }

    zip_writer.finish()?;
    Ok(())
}

// Helper functions

fn read_file_from_zip<R: Read + Seek>(archive: &mut ZipArchive<R>, filename: &str) -> Result<String> {
    let mut file = archive.by_name(filename)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn read_optional_file_from_zip<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    filename: &str,
) -> Result<Option<String>> {
    match read_file_from_zip(archive, filename) {
        Ok(content) => Ok(Some(content)),
        Err(AutoSpecError::Zip(zip::result::ZipError::FileNotFound)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_sheet_entries(workbook_xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut entry = SheetEntry {
                    name: String::new(),
                    state: SheetState::Visible,
                    rel_id: None,
                };

                for attr in e.attributes() {
                    let attr = attr?;
                    match (attr.key.prefix().is_some(), attr.key.local_name().as_ref()) {
                        (false, b"name") => entry.name = attr.unescape_value()?.into_owned(),
                        (false, b"state") => {
                            entry.state = SheetState::from_attr(&attr.unescape_value()?)
                        }
                        (true, b"id") => entry.rel_id = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }

                sheets.push(entry);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

fn parse_active_tab(workbook_xml: &str) -> Result<usize> {
    let mut reader = Reader::from_str(workbook_xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"workbookView" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"activeTab" {
                        return Ok(attr.unescape_value()?.trim().parse().unwrap_or(0));
                    }
                }
                return Ok(0);
            }
            Event::Eof => return Ok(0),
            _ => {}
        }
    }
}

fn parse_relationships(rels_xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Zip entry name of a workbook relationship target
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn rewrite_workbook_xml(
    xml: &str,
    states: &[SheetState],
    active: usize,
    new_active: usize,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut sheet_index = 0;

    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let state = states.get(sheet_index).copied().unwrap_or(SheetState::Visible);
                sheet_index += 1;
                let elem = replace_attributes(&e, &[("state", state.as_attr().map(String::from))])?;
                writer.write_event(Event::Empty(elem))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheet" => {
                let state = states.get(sheet_index).copied().unwrap_or(SheetState::Visible);
                sheet_index += 1;
                let elem = replace_attributes(&e, &[("state", state.as_attr().map(String::from))])?;
                writer.write_event(Event::Start(elem))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"workbookView" && active != new_active => {
                let elem = view_on_tab(&e, new_active)?;
                writer.write_event(Event::Empty(elem))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"workbookView" && active != new_active => {
                let elem = view_on_tab(&e, new_active)?;
                writer.write_event(Event::Start(elem))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(writer.into_inner().into_inner())
}

fn view_on_tab(e: &BytesStart, tab: usize) -> Result<BytesStart<'static>> {
    let mut first_sheet = None;
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"firstSheet" {
            first_sheet = attr.unescape_value()?.trim().parse::<usize>().ok();
        }
    }

    // Keep the active tab inside the scrolled tab strip
    let first_sheet = first_sheet.map(|first| first.min(tab).to_string());

    replace_attributes(
        e,
        &[
            ("activeTab", Some(tab.to_string())),
            ("firstSheet", first_sheet),
        ],
    )
}

fn set_tab_selected(xml: &str, selected: bool) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let value = selected.then(|| "1".to_string());

    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.local_name().as_ref() == b"sheetView" => {
                let elem = replace_attributes(&e, &[("tabSelected", value.clone())])?;
                writer.write_event(Event::Empty(elem))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheetView" => {
                let elem = replace_attributes(&e, &[("tabSelected", value.clone())])?;
                writer.write_event(Event::Start(elem))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(writer.into_inner().into_inner())
}

/// Copy an element, dropping the given attributes and re-adding those with a value
fn replace_attributes(
    e: &BytesStart,
    replacements: &[(&str, Option<String>)],
) -> Result<BytesStart<'static>> {
    let mut elem = e.to_owned();
    elem.clear_attributes();

    for attr in e.attributes() {
        let attr = attr?;
        if !replacements.iter().any(|(key, _)| attr.key.as_ref() == key.as_bytes()) {
            elem.push_attribute(attr);
        }
    }

    for (key, value) in replacements {
        if let Some(value) = value {
            elem.push_attribute((*key, value.as_str()));
        }
    }

    Ok(elem)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView xWindow="0" yWindow="0" firstSheet="1" activeTab="1"/></bookViews><sheets><sheet name="Invoice" sheetId="1" r:id="rId1"/><sheet name="Specification" sheetId="2" state="hidden" r:id="rId2"/><sheet name="R&amp;D" sheetId="3" r:id="rId3"/></sheets></workbook>"#;

    #[test]
    fn test_parse_sheet_entries() {
        let sheets = parse_sheet_entries(WORKBOOK).unwrap();
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[0].name, "Invoice");
        assert_eq!(sheets[0].rel_id.as_deref(), Some("rId1"));
        assert_eq!(sheets[1].state, SheetState::Hidden);
        assert_eq!(sheets[2].name, "R&D");
    }

    #[test]
    fn test_parse_active_tab() {
        assert_eq!(parse_active_tab(WORKBOOK).unwrap(), 1);
        assert_eq!(parse_active_tab("<workbook><sheets/></workbook>").unwrap(), 0);
    }

    #[test]
    fn test_rewrite_states_and_view() {
        let states = [SheetState::Hidden, SheetState::Visible, SheetState::Hidden];
        let xml = rewrite_workbook_xml(WORKBOOK, &states, 1, 1).unwrap();
        let sheets = parse_sheet_entries(std::str::from_utf8(&xml).unwrap()).unwrap();

        let result: Vec<SheetState> = sheets.iter().map(|s| s.state).collect();
        assert_eq!(result, states);
        assert_eq!(sheets[2].name, "R&D");
        assert_eq!(sheets[1].rel_id.as_deref(), Some("rId2"));
    }

    #[test]
    fn test_rewrite_moves_active_tab() {
        let states = [SheetState::Visible, SheetState::Hidden, SheetState::Hidden];
        let xml = rewrite_workbook_xml(WORKBOOK, &states, 1, 0).unwrap();
        let text = String::from_utf8(xml).unwrap();

        assert_eq!(parse_active_tab(&text).unwrap(), 0);
        assert!(text.contains(r#"firstSheet="0""#));
        assert!(text.contains(r#"xWindow="0""#));
    }

    #[test]
    fn test_set_tab_selected() {
        let sheet = r#"<worksheet><sheetViews><sheetView tabSelected="1" workbookViewId="0"/></sheetViews><sheetData/></worksheet>"#;

        let cleared = String::from_utf8(set_tab_selected(sheet, false).unwrap()).unwrap();
        assert!(!cleared.contains("tabSelected"));
        assert!(cleared.contains(r#"workbookViewId="0""#));

        let selected = String::from_utf8(set_tab_selected(&cleared, true).unwrap()).unwrap();
        assert!(selected.contains(r#"tabSelected="1""#));
    }

    #[test]
    fn test_resolve_part() {
        assert_eq!(resolve_part("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }
}
