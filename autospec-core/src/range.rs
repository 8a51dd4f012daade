//! Invoice range expressions such as `5,7-9,12`

use crate::error::{AutoSpecError, Result};
use std::collections::BTreeSet;
use tracing::warn;

/// Set of requested invoice numbers
pub type InvoiceSet = BTreeSet<u64>;

/// Parse a range expression into a set of invoice numbers.
///
/// Whitespace is ignored, `;` works like `,`, and empty tokens are skipped.
/// A token with a hyphen is an inclusive span split on its first `-`; an
/// inverted span (`9-5`) contributes nothing. Spans are materialized, so memory
/// grows with the width of a span rather than with the number of tokens.
pub fn parse_ranges(input: &str) -> Result<InvoiceSet> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ';' { ',' } else { c })
        .collect();

    let mut result = InvoiceSet::new();

    for token in cleaned.split(',').filter(|t| !t.is_empty()) {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                if start > end {
                    warn!(token, "inverted range selects nothing");
                    continue;
                }
                result.extend(start..=end);
            }
            None => {
                result.insert(parse_number(token)?);
            }
        }
    }

    Ok(result)
}

/// Render a set back into the shortest range expression, e.g. `5,7-9,12`
pub fn format_ranges(numbers: &InvoiceSet) -> String {
    let mut spans: Vec<(u64, u64)> = Vec::new();

    for &n in numbers {
        match spans.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(n) => *end = n,
            _ => spans.push((n, n)),
        }
    }

    spans
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_number(token: &str) -> Result<u64> {
    token
        .parse::<u64>()
        .map_err(|source| AutoSpecError::InvalidRange {
            token: token.to_string(),
            source,
        })
}
