//! Matching invoice folders against requested numbers

use crate::error::Result;
use crate::range::InvoiceSet;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// An invoice folder selected for processing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MatchedInvoice {
    pub number: u64,
    pub folder: PathBuf,
}

impl MatchedInvoice {
    pub fn new(number: u64, folder: impl Into<PathBuf>) -> Self {
        Self {
            number,
            folder: folder.into(),
        }
    }

    /// Folder name as shown to the user
    pub fn folder_name(&self) -> String {
        self.folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.folder.display().to_string())
    }
}

/// Invoice number from the leading decimal digits of a folder name
pub fn extract_number(folder_name: &str) -> Option<u64> {
    static LEADING_DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = LEADING_DIGITS.get_or_init(|| Regex::new(r"^[0-9]+").unwrap());

    re.find(folder_name)?.as_str().parse().ok()
}

/// List the invoice folders directly under `base_dir` whose number is wanted.
///
/// `None` selects every folder that carries a number. The result is sorted by
/// number, then by path, so folders sharing a number keep a stable order.
pub fn find_matches(base_dir: &Path, wanted: Option<&InvoiceSet>) -> Result<Vec<MatchedInvoice>> {
    let mut matches = Vec::new();

    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(number) = extract_number(&name.to_string_lossy()) else {
            debug!(folder = %entry.path().display(), "skipping folder without invoice number");
            continue;
        };

        if wanted.is_none_or(|set| set.contains(&number)) {
            matches.push(MatchedInvoice::new(number, entry.path()));
        }
    }

    matches.sort();
    warn_duplicates(&matches);

    Ok(matches)
}

fn warn_duplicates(matches: &[MatchedInvoice]) {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for invoice in matches {
        *counts.entry(invoice.number).or_default() += 1;
    }

    for invoice in matches {
        if counts.get(&invoice.number).copied().unwrap_or(0) > 1 {
            warn!(
                number = invoice.number,
                folder = %invoice.folder.display(),
                "invoice number shared by several folders"
            );
        }
    }
}
