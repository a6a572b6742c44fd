use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of quoted line items on a single ticket.
pub const MAX_LINE_ITEMS: usize = 8;

/// Label of the explicit "no line item" entry in a ticket's line-item slots.
pub const NO_LINE_ITEM: &str = "None";

/// One quoted line-item slot on a ticket.
///
/// Serialized as a plain string: `"None"` (or an empty string) is the sentinel,
/// anything else is a category label. Sentinel slots never take part in
/// aggregation or encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineItem {
    None,
    Category(String),
}

impl LineItem {
    pub fn category(label: impl Into<String>) -> Self {
        Self::from(label.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NO_LINE_ITEM,
            Self::Category(label) => label,
        }
    }

    /// The category label, or `None` for the sentinel.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Category(label) => Some(label),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<String> for LineItem {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == NO_LINE_ITEM {
            Self::None
        } else if trimmed.len() == s.len() {
            Self::Category(s)
        } else {
            Self::Category(trimmed.to_string())
        }
    }
}

impl From<&str> for LineItem {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<LineItem> for String {
    fn from(item: LineItem) -> Self {
        match item {
            LineItem::None => NO_LINE_ITEM.to_string(),
            LineItem::Category(label) => label,
        }
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cost-relevant inputs of one job.
///
/// Records are immutable once created. All numeric fields are finite and
/// non-negative when built through [`TicketInput::parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub crew_max: f64,
    pub crew_min: f64,
    /// Labor hours in the best case.
    pub crew_best_hours: f64,
    /// Labor hours in the worst case.
    pub crew_worst_hours: f64,
    pub sqft: f64,
    /// Exactly [`MAX_LINE_ITEMS`] slots, unused slots hold [`LineItem::None`].
    pub line_items: Vec<LineItem>,
}

impl TicketRecord {
    /// Line items excluding sentinel slots.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.line_items.iter().filter_map(LineItem::label)
    }
}

/// A ticket stored in a project session.
///
/// The record fields are flattened into the JSON response next to the
/// ticket's id and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: TicketRecord,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(record: TicketRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            record,
            created_at: Utc::now(),
        }
    }
}

/// A numeric field as entered by a user: either a JSON number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl Default for RawNumber {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

/// User-correctable problems with a ticket's raw inputs.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be a finite, non-negative number, got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("a ticket holds at most 8 line items, got {0}")]
    TooManyLineItems(usize),

    #[error("unknown line item: {0}")]
    UnknownLineItem(String),

    /// Every ticket is valid on its own but the project sum overflows.
    #[error("project {field} is too large to estimate")]
    TotalOutOfRange { field: &'static str },
}

/// Raw input for adding a ticket to a project.
///
/// Numeric fields default to zero when omitted, matching an untouched form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketInput {
    #[serde(default)]
    pub crew_max: RawNumber,
    #[serde(default)]
    pub crew_min: RawNumber,
    #[serde(default)]
    pub crew_best_hours: RawNumber,
    #[serde(default)]
    pub crew_worst_hours: RawNumber,
    #[serde(default)]
    pub sqft: RawNumber,
    /// Up to [`MAX_LINE_ITEMS`] labels; `"None"` marks an empty slot.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl TicketInput {
    /// Validate the raw fields into a [`TicketRecord`].
    ///
    /// Every category must appear in `catalog`. Missing slots are padded with
    /// [`LineItem::None`].
    pub fn parse(&self, catalog: &BTreeSet<String>) -> Result<TicketRecord, InputError> {
        if self.line_items.len() > MAX_LINE_ITEMS {
            return Err(InputError::TooManyLineItems(self.line_items.len()));
        }

        let mut line_items = Vec::with_capacity(MAX_LINE_ITEMS);
        for item in &self.line_items {
            if let Some(label) = item.label() {
                if !catalog.contains(label) {
                    return Err(InputError::UnknownLineItem(label.to_string()));
                }
            }
            line_items.push(item.clone());
        }
        line_items.resize(MAX_LINE_ITEMS, LineItem::None);

        Ok(TicketRecord {
            crew_max: parse_field("crew_max", &self.crew_max)?,
            crew_min: parse_field("crew_min", &self.crew_min)?,
            crew_best_hours: parse_field("crew_best_hours", &self.crew_best_hours)?,
            crew_worst_hours: parse_field("crew_worst_hours", &self.crew_worst_hours)?,
            sqft: parse_field("sqft", &self.sqft)?,
            line_items,
        })
    }
}

fn parse_field(field: &'static str, raw: &RawNumber) -> Result<f64, InputError> {
    let value = match raw {
        RawNumber::Number(n) => *n,
        RawNumber::Text(text) => text.trim().parse::<f64>().map_err(|_| InputError::NotANumber {
            field,
            value: text.clone(),
        })?,
    };

    if !value.is_finite() || value < 0.0 {
        return Err(InputError::OutOfRange { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> BTreeSet<String> {
        ["paint", "trim", "stucco"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn input() -> TicketInput {
        TicketInput {
            crew_max: 5.0.into(),
            crew_min: "3".into(),
            crew_best_hours: " 10.5 ".into(),
            crew_worst_hours: 20.0.into(),
            sqft: "100".into(),
            line_items: vec!["paint".into(), "None".into(), "trim".into()],
        }
    }

    #[test]
    fn parses_numbers_and_text() {
        let record = input().parse(&catalog()).unwrap();
        assert_eq!(record.crew_max, 5.0);
        assert_eq!(record.crew_min, 3.0);
        assert_eq!(record.crew_best_hours, 10.5);
        assert_eq!(record.sqft, 100.0);
    }

    #[test]
    fn pads_line_items_to_eight_slots() {
        let record = input().parse(&catalog()).unwrap();
        assert_eq!(record.line_items.len(), MAX_LINE_ITEMS);
        let categories: Vec<_> = record.categories().collect();
        assert_eq!(categories, vec!["paint", "trim"]);
    }

    #[test]
    fn rejects_text_that_is_not_a_number() {
        let mut raw = input();
        raw.sqft = "twelve".into();
        assert_eq!(
            raw.parse(&catalog()),
            Err(InputError::NotANumber {
                field: "sqft",
                value: "twelve".to_string()
            })
        );
    }

    #[test]
    fn rejects_negative_values() {
        let mut raw = input();
        raw.crew_min = (-1.0).into();
        assert!(matches!(
            raw.parse(&catalog()),
            Err(InputError::OutOfRange { field: "crew_min", .. })
        ));
    }

    #[test]
    fn rejects_unknown_line_item() {
        let mut raw = input();
        raw.line_items = vec!["gold leaf".into()];
        assert_eq!(
            raw.parse(&catalog()),
            Err(InputError::UnknownLineItem("gold leaf".to_string()))
        );
    }

    #[test]
    fn rejects_more_than_eight_line_items() {
        let mut raw = input();
        raw.line_items = vec![LineItem::None; 9];
        assert_eq!(raw.parse(&catalog()), Err(InputError::TooManyLineItems(9)));
    }

    #[test]
    fn line_item_sentinel_round_trips_as_string() {
        let items: Vec<LineItem> = serde_json::from_str(r#"["paint", "None", ""]"#).unwrap();
        assert_eq!(
            items,
            vec![LineItem::category("paint"), LineItem::None, LineItem::None]
        );
        let json = serde_json::to_string(&items).unwrap();
        assert_eq!(json, r#"["paint","None","None"]"#);
    }
}
