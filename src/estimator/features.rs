use serde::{Deserialize, Serialize};

use super::aggregate::ProjectTotals;

/// Feature names in the exact order the model was trained on.
///
/// This is a hard contract with the frozen model: a reordered or renamed
/// schema produces wrong predictions without any runtime error. Models are
/// checked against it at load time.
pub const FEATURE_NAMES: [&str; 10] = [
    "total_cr_max",
    "mean_crew",
    "line_item_mean_enc",
    "total_cr_min",
    "total_crew_best",
    "total_crew_worst",
    "total_sqft",
    "mean_client_rscore_per_ticket",
    "mean_client_cost_per_ticket",
    "total_client_tix_count",
];

/// Per-client features resolved from the lookup store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientFeatures {
    pub mean_reliability_score: f64,
    pub mean_cost: f64,
    pub ticket_count: f64,
}

/// One model input row.
///
/// Field declaration order matches [`FEATURE_NAMES`], so the serialized form
/// lists features in schema order too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub total_cr_max: f64,
    pub mean_crew: f64,
    pub line_item_mean_enc: f64,
    pub total_cr_min: f64,
    pub total_crew_best: f64,
    pub total_crew_worst: f64,
    pub total_sqft: f64,
    pub mean_client_rscore_per_ticket: f64,
    pub mean_client_cost_per_ticket: f64,
    pub total_client_tix_count: f64,
}

impl FeatureVector {
    pub fn build(totals: &ProjectTotals, line_item_encoding: f64, client: &ClientFeatures) -> Self {
        Self {
            total_cr_max: totals.total_crew_max,
            mean_crew: totals.mean_crew,
            line_item_mean_enc: line_item_encoding,
            total_cr_min: totals.total_crew_min,
            total_crew_best: totals.total_crew_best_hours,
            total_crew_worst: totals.total_crew_worst_hours,
            total_sqft: totals.total_sqft,
            mean_client_rscore_per_ticket: client.mean_reliability_score,
            mean_client_cost_per_ticket: client.mean_cost,
            total_client_tix_count: client.ticket_count,
        }
    }

    pub fn names() -> [&'static str; 10] {
        FEATURE_NAMES
    }

    /// Values in schema order.
    pub fn values(&self) -> [f64; 10] {
        [
            self.total_cr_max,
            self.mean_crew,
            self.line_item_mean_enc,
            self.total_cr_min,
            self.total_crew_best,
            self.total_crew_worst,
            self.total_sqft,
            self.mean_client_rscore_per_ticket,
            self.mean_client_cost_per_ticket,
            self.total_client_tix_count,
        ]
    }

    /// `(name, value)` pairs in schema order.
    pub fn named(&self) -> [(&'static str, f64); 10] {
        let values = self.values();
        std::array::from_fn(|i| (FEATURE_NAMES[i], values[i]))
    }
}
