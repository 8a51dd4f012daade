//! Worksheet listing data structures

use serde::Serialize;
use std::fmt;

/// Visibility of a worksheet tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetState {
    Visible,
    Hidden,
    /// Hidden and not listed in the "Unhide" dialog
    VeryHidden,
}

impl SheetState {
    /// Parse the SpreadsheetML `state` attribute (absent means visible)
    pub fn from_attr(value: &str) -> Self {
        match value {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }

    /// Value of the `state` attribute, `None` for the implicit visible state
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            SheetState::Visible => None,
            SheetState::Hidden => Some("hidden"),
            SheetState::VeryHidden => Some("veryHidden"),
        }
    }

    pub fn is_visible(self) -> bool {
        self == SheetState::Visible
    }
}

impl fmt::Display for SheetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "very hidden",
        };
        write!(f, "{}", label)
    }
}

/// A worksheet and its visibility, in workbook tab order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub state: SheetState,
}

impl SheetInfo {
    pub fn new(name: impl Into<String>, state: SheetState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}
