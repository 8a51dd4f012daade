//! Error types shared by every AutoSpec module

use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutoSpecError {
    // Selection
    #[error("invalid range token '{token}': {source}")]
    InvalidRange {
        token: String,
        #[source]
        source: ParseIntError,
    },

    #[error("no invoice folders found for {requested}")]
    NoMatch { requested: String },

    // Workbook content
    #[error("worksheet \"{sheet}\" not found in {}", path.display())]
    MissingSheet { sheet: String, path: PathBuf },

    #[error("source workbook not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("workbook {} would have no visible worksheet", .0.display())]
    NoVisibleSheet(PathBuf),

    #[error("unsupported spreadsheet format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("deleted {deleted} generated copies, could not delete {}", .failed.join("; "))]
    DeleteIncomplete { deleted: usize, failed: Vec<String> },

    // Configuration
    #[error("invoice directory is not set")]
    BaseDirUnset,

    #[error("not a directory: {}", .0.display())]
    InvalidBaseDir(PathBuf),

    // External spreadsheet application
    #[error("spreadsheet application '{command}' is not available: {reason}")]
    AppUnavailable { command: String, reason: String },

    #[error("spreadsheet application failed: {0}")]
    App(String),

    // Wrapped library errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("failed to read workbook: {0}")]
    Calamine(#[from] calamine::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AutoSpecError>;
