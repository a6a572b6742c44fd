//! Feature pipeline from ticket records to a predicted project cost.
//!
//! ## Pipeline
//!
//! ```text
//! tickets ──┬─> aggregate ──────────────> ProjectTotals ─┐
//!           └─> flatten -> signature -> resolve ─────────┼─> FeatureVector -> model -> cost
//! client ─────> lookup (reliability, cost, count) ───────┘
//! ```
//!
//! Every request recomputes the whole pipeline from the session's tickets;
//! nothing is cached between requests. The lookup store and model are
//! read-only after startup and shared by all sessions.

mod aggregate;
mod encode;
mod features;

pub use aggregate::{aggregate, ProjectTotals};
pub use encode::{encode, flatten_line_items, resolve, signature, SIGNATURE_SEPARATOR};
pub use features::{ClientFeatures, FeatureVector, FEATURE_NAMES};

use std::path::Path;

use thiserror::Error;

use crate::gbt::{GbtModel, ModelError, PredictionError, Regressor, MODEL_FILE};
use crate::lookup::{LookupError, LookupStore};
use crate::models::{
    InputError, LineItem, PredictInput, PredictionReport, ProjectSession, TicketInput,
    TicketRecord,
};

/// Failure to load the startup artifacts. Fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Per-request pipeline failures.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The selected client has no entry in the client lookups. User-correctable.
    #[error("select a valid client: {0:?} is not a known client")]
    UnknownClient(String),

    /// A ticket's raw inputs did not validate. User-correctable.
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictionError),
}

impl EstimateError {
    /// Whether the user can fix this by changing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::UnknownClient(_) | Self::Input(_))
    }
}

/// Resolve the three per-client features.
///
/// The client must be present in every client mapping. The "No client"
/// sentinel always is, by construction of the [`LookupStore`].
pub fn client_features(client: &str, lookup: &LookupStore) -> Result<ClientFeatures, EstimateError> {
    match (
        lookup.reliability(client),
        lookup.mean_cost(client),
        lookup.ticket_count(client),
    ) {
        (Some(mean_reliability_score), Some(mean_cost), Some(ticket_count)) => Ok(ClientFeatures {
            mean_reliability_score,
            mean_cost,
            ticket_count,
        }),
        _ => {
            tracing::warn!(client, "Unknown client selected");
            Err(EstimateError::UnknownClient(client.to_string()))
        }
    }
}

/// Assemble the model input row for a project.
pub fn build(
    totals: &ProjectTotals,
    line_item_encoding: f64,
    client: &str,
    lookup: &LookupStore,
) -> Result<FeatureVector, EstimateError> {
    let client = client_features(client, lookup)?;
    Ok(FeatureVector::build(totals, line_item_encoding, &client))
}

/// The loaded lookup store and model, ready to serve predictions.
pub struct Estimator {
    lookup: LookupStore,
    model: Box<dyn Regressor>,
}

impl Estimator {
    pub fn new(lookup: LookupStore, model: impl Regressor + 'static) -> Self {
        Self {
            lookup,
            model: Box::new(model),
        }
    }

    /// Load every startup artifact from `dir`, failing on the first bad one.
    pub fn load(dir: &Path) -> Result<Self, StartupError> {
        let lookup = LookupStore::load(dir)?;
        let model = GbtModel::load(&dir.join(MODEL_FILE))?;
        Ok(Self::new(lookup, model))
    }

    pub fn lookup(&self) -> &LookupStore {
        &self.lookup
    }

    pub fn known_clients(&self) -> Vec<String> {
        self.lookup.known_clients()
    }

    pub fn known_line_item_categories(&self) -> Vec<LineItem> {
        self.lookup.known_line_item_categories()
    }

    /// Check that `client` can be used for a prediction.
    pub fn validate_client(&self, client: &str) -> Result<(), EstimateError> {
        client_features(client, &self.lookup).map(|_| ())
    }

    /// Validate raw ticket fields against the line-item catalogue.
    pub fn parse_ticket(&self, input: &TicketInput) -> Result<TicketRecord, InputError> {
        input.parse(self.lookup.line_item_catalog())
    }

    /// Run the full pipeline over a session's tickets.
    pub fn compute_prediction(
        &self,
        session: &ProjectSession,
    ) -> Result<PredictionReport, EstimateError> {
        let records: Vec<&TicketRecord> = session.records().collect();
        self.estimate(&session.client, &records)
    }

    /// Parse a whole project from raw inputs and predict it. Nothing is stored.
    pub fn predict_input(&self, input: &PredictInput) -> Result<PredictionReport, EstimateError> {
        let records = input
            .tickets
            .iter()
            .map(|t| self.parse_ticket(t))
            .collect::<Result<Vec<_>, _>>()?;
        let records: Vec<&TicketRecord> = records.iter().collect();
        self.estimate(&input.client, &records)
    }

    /// Predict the cost of a project of `tickets` for `client`.
    pub fn estimate(
        &self,
        client: &str,
        tickets: &[&TicketRecord],
    ) -> Result<PredictionReport, EstimateError> {
        let client_features = client_features(client, &self.lookup)?;

        let totals = aggregate(tickets.iter().copied());
        if let Some(field) = totals.first_non_finite() {
            return Err(InputError::TotalOutOfRange { field }.into());
        }
        let line_items = flatten_line_items(tickets.iter().copied());
        let signature = signature(line_items.iter().copied());
        let line_item_encoding = resolve(&signature, &self.lookup);

        let features = FeatureVector::build(&totals, line_item_encoding.value, &client_features);
        let predicted_cost = self.model.predict(&features)?;

        tracing::debug!(
            client,
            tickets = tickets.len(),
            signature = %signature,
            predicted_cost,
            "Computed prediction"
        );

        Ok(PredictionReport {
            client: client.to_string(),
            ticket_count: tickets.len(),
            totals,
            line_items: line_items.into_iter().map(String::from).collect(),
            signature,
            line_item_encoding,
            client_features,
            features,
            predicted_cost,
        })
    }
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}
