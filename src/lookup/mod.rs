//! Frozen lookup tables produced by offline training.
//!
//! Four numeric mappings are loaded once at startup and never mutated:
//!
//! | file                         | key                 | value                     |
//! |------------------------------|---------------------|---------------------------|
//! | `client_reliability.json`    | client identifier   | mean reliability score    |
//! | `client_mean_cost.json`      | client identifier   | mean cost per ticket      |
//! | `client_ticket_count.json`   | client identifier   | total ticket count        |
//! | `line_item_encoding.json`    | line-item signature | mean-encoded project cost |
//!
//! plus `line_items.json`, the list of selectable line-item categories.
//!
//! Every client mapping must carry the [`NO_CLIENT`] key. Loading fails
//! outright on a missing or malformed artifact; there is no partial store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::LineItem;

/// Client identifier meaning "no client selected".
pub const NO_CLIENT: &str = "No client";

pub const RELIABILITY_FILE: &str = "client_reliability.json";
pub const MEAN_COST_FILE: &str = "client_mean_cost.json";
pub const TICKET_COUNT_FILE: &str = "client_ticket_count.json";
pub const SIGNATURE_FILE: &str = "line_item_encoding.json";
pub const LINE_ITEMS_FILE: &str = "line_items.json";

/// A client-keyed or signature-keyed numeric mapping.
pub type Mapping = BTreeMap<String, f64>;

/// Startup data errors. Any of these aborts initialization.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{mapping} mapping has no \"No client\" entry")]
    MissingNoClient { mapping: &'static str },

    #[error("{mapping} mapping has a non-finite value for {key:?}")]
    NonFinite { mapping: &'static str, key: String },

    #[error("line-item signature mapping is empty")]
    EmptySignatures,

    #[error("line-item catalogue is empty")]
    EmptyCatalog,
}

/// Read-only lookup tables shared by every session.
#[derive(Debug, Clone)]
pub struct LookupStore {
    reliability: Mapping,
    mean_cost: Mapping,
    ticket_count: Mapping,
    signatures: Mapping,
    signature_median: f64,
    line_items: Vec<String>,
    catalog: BTreeSet<String>,
}

impl LookupStore {
    /// Load all lookup artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self, LookupError> {
        let store = Self::from_parts(
            read_json(&dir.join(RELIABILITY_FILE))?,
            read_json(&dir.join(MEAN_COST_FILE))?,
            read_json(&dir.join(TICKET_COUNT_FILE))?,
            read_json(&dir.join(SIGNATURE_FILE))?,
            read_json(&dir.join(LINE_ITEMS_FILE))?,
        )?;

        tracing::info!(
            clients = store.known_clients().len(),
            signatures = store.signatures.len(),
            line_items = store.line_items.len(),
            "Loaded lookup store from {}",
            dir.display()
        );
        Ok(store)
    }

    /// Build a store from in-memory mappings, applying the same validation as [`load`](Self::load).
    pub fn from_parts(
        reliability: Mapping,
        mean_cost: Mapping,
        ticket_count: Mapping,
        signatures: Mapping,
        line_items: Vec<String>,
    ) -> Result<Self, LookupError> {
        for (name, mapping) in [
            ("reliability", &reliability),
            ("mean cost", &mean_cost),
            ("ticket count", &ticket_count),
        ] {
            if !mapping.contains_key(NO_CLIENT) {
                return Err(LookupError::MissingNoClient { mapping: name });
            }
            check_finite(name, mapping)?;
        }
        check_finite("signature", &signatures)?;

        let signature_median =
            median(signatures.values().copied()).ok_or(LookupError::EmptySignatures)?;

        // The sentinel is supplied at runtime, never by the catalogue file.
        let mut catalog = BTreeSet::new();
        let line_items: Vec<String> = line_items
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| LineItem::from(label.as_str()).label().is_some())
            .filter(|label| catalog.insert(label.clone()))
            .collect();
        if line_items.is_empty() {
            return Err(LookupError::EmptyCatalog);
        }

        Ok(Self {
            reliability,
            mean_cost,
            ticket_count,
            signatures,
            signature_median,
            line_items,
            catalog,
        })
    }

    pub fn reliability(&self, client: &str) -> Option<f64> {
        self.reliability.get(client).copied()
    }

    pub fn mean_cost(&self, client: &str) -> Option<f64> {
        self.mean_cost.get(client).copied()
    }

    pub fn ticket_count(&self, client: &str) -> Option<f64> {
        self.ticket_count.get(client).copied()
    }

    /// Mean-encoded cost for an exact line-item signature.
    pub fn signature_encoding(&self, signature: &str) -> Option<f64> {
        self.signatures.get(signature).copied()
    }

    /// Median of all signature encodings, precomputed at load.
    pub fn signature_median(&self) -> f64 {
        self.signature_median
    }

    /// Every client present in any client mapping, sorted, including [`NO_CLIENT`].
    pub fn known_clients(&self) -> Vec<String> {
        self.reliability
            .keys()
            .chain(self.mean_cost.keys())
            .chain(self.ticket_count.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Selectable line items: the "None" sentinel followed by the catalogue in file order.
    pub fn known_line_item_categories(&self) -> Vec<LineItem> {
        std::iter::once(LineItem::None)
            .chain(self.line_items.iter().cloned().map(LineItem::Category))
            .collect()
    }

    /// Category labels accepted on a ticket.
    pub fn line_item_catalog(&self) -> &BTreeSet<String> {
        &self.catalog
    }
}

/// Median of a sample; the mean of the two middle values for an even count.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn check_finite(name: &'static str, mapping: &Mapping) -> Result<(), LookupError> {
    match mapping.iter().find(|(_, v)| !v.is_finite()) {
        Some((key, _)) => Err(LookupError::NonFinite {
            mapping: name,
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LookupError> {
    let content = fs::read_to_string(path).map_err(|source| LookupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LookupError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, f64)]) -> Mapping {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn store() -> LookupStore {
        LookupStore::from_parts(
            mapping(&[("Acme", 4.5), (NO_CLIENT, 3.0)]),
            mapping(&[("Acme", 900.0), ("Borealis", 400.0), (NO_CLIENT, 650.0)]),
            mapping(&[("Acme", 12.0), (NO_CLIENT, 1.0)]),
            mapping(&[("1paint_1trim", 120.0), ("2paint", 80.0)]),
            vec!["paint".into(), "trim".into(), "paint".into(), "None".into()],
        )
        .unwrap()
    }

    #[test]
    fn median_of_even_sample_averages_middle_values() {
        assert_eq!(median([120.0, 80.0]), Some(100.0));
        assert_eq!(median([3.0, 1.0, 4.0, 1.0]), Some(2.0));
    }

    #[test]
    fn median_of_odd_sample_is_middle_value() {
        assert_eq!(median([5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(std::iter::empty::<f64>()), None);
    }

    #[test]
    fn known_clients_is_sorted_union_with_sentinel() {
        assert_eq!(store().known_clients(), vec!["Acme", "Borealis", NO_CLIENT]);
    }

    #[test]
    fn catalogue_drops_sentinel_and_duplicates() {
        let store = store();
        let labels: Vec<String> = store
            .known_line_item_categories()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(labels, vec!["None", "paint", "trim"]);
    }

    #[test]
    fn missing_sentinel_is_rejected() {
        let err = LookupStore::from_parts(
            mapping(&[("Acme", 4.5)]),
            mapping(&[(NO_CLIENT, 1.0)]),
            mapping(&[(NO_CLIENT, 1.0)]),
            mapping(&[("2paint", 80.0)]),
            vec!["paint".into()],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LookupError::MissingNoClient {
                mapping: "reliability"
            }
        ));
    }

    #[test]
    fn empty_signatures_are_rejected() {
        let err = LookupStore::from_parts(
            mapping(&[(NO_CLIENT, 1.0)]),
            mapping(&[(NO_CLIENT, 1.0)]),
            mapping(&[(NO_CLIENT, 1.0)]),
            Mapping::new(),
            vec!["paint".into()],
        )
        .unwrap_err();
        assert!(matches!(err, LookupError::EmptySignatures));
    }
}
