//! Canonical line-item signatures and their mean encoding.
//!
//! A project's line items form a multiset. Its signature lists every distinct
//! category once as `<count><category>`, sorted by category label and joined
//! with `_`:
//!
//! ```text
//! paint, trim, paint, stucco  ->  "2paint_1stucco_1trim"
//! ```
//!
//! Ticket order and slot order never change the signature. A project with no
//! line items has the empty signature.

use std::collections::BTreeMap;

use crate::lookup::LookupStore;
use crate::models::{LineItemEncoding, TicketRecord};

pub const SIGNATURE_SEPARATOR: &str = "_";

/// Every non-sentinel line item across all tickets, in ticket order.
pub fn flatten_line_items<'a>(
    tickets: impl IntoIterator<Item = &'a TicketRecord>,
) -> Vec<&'a str> {
    tickets
        .into_iter()
        .flat_map(|t| t.categories())
        .collect()
}

/// Canonical signature of a line-item multiset.
pub fn signature<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(category, count)| format!("{count}{category}"))
        .collect::<Vec<_>>()
        .join(SIGNATURE_SEPARATOR)
}

/// Resolve a signature against the lookup store, falling back to the median
/// of all known encodings for a combination never seen in training.
pub fn resolve(signature: &str, lookup: &LookupStore) -> LineItemEncoding {
    match lookup.signature_encoding(signature) {
        Some(value) => LineItemEncoding {
            value,
            fallback: false,
        },
        None => {
            let value = lookup.signature_median();
            tracing::debug!(signature, value, "Unseen line-item signature, using median");
            LineItemEncoding {
                value,
                fallback: true,
            }
        }
    }
}

/// Mean-encoded value of the project's line-item combination.
pub fn encode<'a>(tickets: impl IntoIterator<Item = &'a TicketRecord>, lookup: &LookupStore) -> f64 {
    resolve(&signature(flatten_line_items(tickets)), lookup).value
}
