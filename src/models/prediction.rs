use serde::{Deserialize, Serialize};

use super::ticket::TicketInput;
use crate::estimator::{ClientFeatures, FeatureVector, ProjectTotals};
use crate::lookup::NO_CLIENT;

/// The predicted project cost and every intermediate value behind it.
///
/// `predicted_cost` is the raw model output. Rounding for display happens in
/// [`crate::report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub client: String,
    pub ticket_count: usize,
    pub totals: ProjectTotals,
    /// Non-sentinel line items across all tickets, in ticket order.
    pub line_items: Vec<String>,
    /// Canonical signature of the line-item multiset.
    pub signature: String,
    pub line_item_encoding: LineItemEncoding,
    pub client_features: ClientFeatures,
    pub features: FeatureVector,
    pub predicted_cost: f64,
}

/// How the line-item signature was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineItemEncoding {
    pub value: f64,
    /// True when the signature was not seen in training and the median was used.
    pub fallback: bool,
}

/// Input for a stateless prediction over a whole project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictInput {
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default)]
    pub tickets: Vec<TicketInput>,
}

fn default_client() -> String {
    NO_CLIENT.to_string()
}
